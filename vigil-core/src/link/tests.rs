// link/tests.rs
#[cfg(test)]
mod tests {
    use crate::link::{
        ConnectivityManager, FallbackLink, ModemStatus, PrimaryLink, PRIMARY_RETRY,
    };
    use crate::types::LinkKind;
    use embedded_hal::delay::DelayNs;
    use heapless::String;

    /// Delay that counts instead of sleeping.
    struct TestDelay {
        slept_ms: u64,
    }

    impl TestDelay {
        fn new() -> Self {
            Self { slept_ms: 0 }
        }
    }

    impl DelayNs for TestDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.slept_ms += u64::from(ns) / 1_000_000;
        }
    }

    struct FakeWifi {
        up: bool,
        connect_attempts: u32,
    }

    impl FakeWifi {
        fn new(up: bool) -> Self {
            Self {
                up,
                connect_attempts: 0,
            }
        }
    }

    impl PrimaryLink for FakeWifi {
        fn begin_connect(&mut self) {
            self.connect_attempts += 1;
        }
        fn is_connected(&mut self) -> bool {
            self.up
        }
        fn address(&self) -> String<40> {
            String::try_from("192.168.4.20").unwrap()
        }
        fn signal_quality(&mut self) -> i16 {
            25
        }
    }

    struct FakeModem {
        status: ModemStatus,
        connect_attempts: u32,
        /// Status codes reported on successive polls before `status` applies.
        warmup: std::vec::Vec<ModemStatus>,
    }

    impl FakeModem {
        fn new(status: ModemStatus) -> Self {
            Self {
                status,
                connect_attempts: 0,
                warmup: std::vec::Vec::new(),
            }
        }
    }

    impl FallbackLink for FakeModem {
        fn begin_connect(&mut self) {
            self.connect_attempts += 1;
        }
        fn status(&mut self) -> ModemStatus {
            if self.warmup.is_empty() {
                self.status
            } else {
                self.warmup.remove(0)
            }
        }
        fn address(&self) -> String<40> {
            String::try_from("10.64.64.64").unwrap()
        }
        fn signal_quality(&mut self) -> i16 {
            19
        }
    }

    #[test]
    fn modem_status_codes_decode() {
        assert_eq!(ModemStatus::from_code(1), ModemStatus::Connected);
        assert_eq!(ModemStatus::from_code(0), ModemStatus::Connecting);
        assert_eq!(ModemStatus::from_code(98), ModemStatus::Initializing);
        assert_eq!(ModemStatus::from_code(89), ModemStatus::PppStarting);
        assert_eq!(ModemStatus::from_code(42), ModemStatus::Fault);
    }

    #[test]
    fn connect_prefers_primary() {
        let mut mgr = ConnectivityManager::new(
            FakeWifi::new(true),
            FakeModem::new(ModemStatus::Connected),
        );
        assert!(mgr.connect(&mut TestDelay::new()));
        assert_eq!(mgr.link.kind, LinkKind::Primary);
        assert_eq!(mgr.link.operator(), "WiFi");
    }

    #[test]
    fn connect_falls_back_when_primary_fails() {
        let mut modem = FakeModem::new(ModemStatus::Connected);
        modem.warmup = vec![
            ModemStatus::Initializing,
            ModemStatus::Connecting,
            ModemStatus::PppStarting,
        ];
        let mut mgr = ConnectivityManager::new(FakeWifi::new(false), modem);
        assert!(mgr.connect(&mut TestDelay::new()));
        assert_eq!(mgr.link.kind, LinkKind::Fallback);
        assert_eq!(mgr.link.signal_quality, 19);
    }

    #[test]
    fn total_failure_leaves_link_down() {
        let mut mgr = ConnectivityManager::new(
            FakeWifi::new(false),
            FakeModem::new(ModemStatus::Connecting),
        );
        assert!(!mgr.connect(&mut TestDelay::new()));
        assert_eq!(mgr.link.kind, LinkKind::None);
    }

    #[test]
    fn modem_fault_aborts_fallback_connect() {
        let mut mgr = ConnectivityManager::new(
            FakeWifi::new(false),
            FakeModem::new(ModemStatus::Fault),
        );
        assert!(!mgr.connect(&mut TestDelay::new()));
        assert_eq!(mgr.link.kind, LinkKind::None);
    }

    #[test]
    fn check_is_idempotent_while_connected() {
        let mut mgr = ConnectivityManager::new(
            FakeWifi::new(true),
            FakeModem::new(ModemStatus::Connecting),
        );
        let mut delay = TestDelay::new();
        assert!(mgr.connect(&mut delay));
        let attempts = mgr.primary.connect_attempts;
        let link = mgr.link.clone();

        for _ in 0..5 {
            assert!(mgr.check_connection(&mut delay));
        }
        assert_eq!(mgr.primary.connect_attempts, attempts);
        assert_eq!(mgr.fallback.connect_attempts, 0);
        assert_eq!(mgr.link, link);
    }

    #[test]
    fn primary_loss_triggers_bounded_retries_then_fallback() {
        let mut mgr = ConnectivityManager::new(
            FakeWifi::new(true),
            FakeModem::new(ModemStatus::Connected),
        );
        let mut delay = TestDelay::new();
        assert!(mgr.connect(&mut delay));
        assert_eq!(mgr.link.kind, LinkKind::Primary);

        mgr.primary.up = false;
        let before = mgr.primary.connect_attempts;
        assert!(mgr.check_connection(&mut delay));
        assert_eq!(mgr.primary.connect_attempts, before + PRIMARY_RETRY);
        assert_eq!(mgr.fallback.connect_attempts, 1);
        assert_eq!(mgr.link.kind, LinkKind::Fallback);
    }

    #[test]
    fn no_opportunistic_failback_to_primary() {
        let mut mgr = ConnectivityManager::new(
            FakeWifi::new(false),
            FakeModem::new(ModemStatus::Connected),
        );
        let mut delay = TestDelay::new();
        assert!(mgr.connect(&mut delay));
        assert_eq!(mgr.link.kind, LinkKind::Fallback);

        // While the fallback carries traffic no primary reconnect is
        // attempted.
        let wifi_attempts = mgr.primary.connect_attempts;
        for _ in 0..3 {
            assert!(mgr.check_connection(&mut delay));
        }
        assert_eq!(mgr.primary.connect_attempts, wifi_attempts);
        assert_eq!(mgr.link.kind, LinkKind::Fallback);
    }

    #[test]
    fn total_loss_during_check_downs_the_link() {
        let mut mgr = ConnectivityManager::new(
            FakeWifi::new(true),
            FakeModem::new(ModemStatus::Connecting),
        );
        let mut delay = TestDelay::new();
        assert!(mgr.connect(&mut delay));

        mgr.primary.up = false;
        assert!(!mgr.check_connection(&mut delay));
        assert_eq!(mgr.link.kind, LinkKind::None);
    }
}
