// clock.rs
use crate::info;
use embedded_hal::delay::DelayNs;

/// Polls to wait for a time sync to complete, at one second each.
pub const SYNC_POLLS: u32 = 10;

/// Time source behind the clock service. On the device this is an RTC with
/// network time sync; in the SITL harness it is plain system time.
pub trait TimeSource {
    /// Issues one network time request. Returns false if the transport
    /// refused outright (no uplink, no server).
    fn start_sync(&mut self) -> bool;
    fn synced(&mut self) -> bool;
    /// Monotonic milliseconds since boot; drives the tick cadence.
    fn monotonic_ms(&mut self) -> u64;
    /// Best-effort wall-clock seconds; used for payload timestamps.
    fn wall_secs(&mut self) -> u64;
}

/// Wraps time sync and exposes a monotonic-adjusted wall-clock reading.
///
/// `sync` is bounded and non-blocking in the large: on timeout the agent
/// proceeds with the unsynchronized local clock rather than stalling boot.
pub struct ClockService<T> {
    source: T,
    synced: bool,
}

impl<T: TimeSource> ClockService<T> {
    pub fn new(source: T) -> Self {
        Self {
            source,
            synced: false,
        }
    }

    /// One sync attempt: request, then up to [`SYNC_POLLS`] one-second
    /// polls. False on timeout; the previous time basis stays intact.
    pub fn sync(&mut self, delay: &mut impl DelayNs) -> bool {
        if !self.source.start_sync() {
            return false;
        }
        for _ in 0..SYNC_POLLS {
            if self.source.synced() {
                info!("clock synced");
                self.synced = true;
                return true;
            }
            delay.delay_ms(1000);
        }
        false
    }

    /// Always available: best-effort wall seconds.
    pub fn now(&mut self) -> u64 {
        self.source.wall_secs()
    }

    pub fn monotonic_ms(&mut self) -> u64 {
        self.source.monotonic_ms()
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRtc {
        /// Polls remaining before the RTC reports synced; None = never.
        syncs_after: Option<u32>,
        refuse: bool,
        now: u64,
    }

    impl TimeSource for FakeRtc {
        fn start_sync(&mut self) -> bool {
            !self.refuse
        }
        fn synced(&mut self) -> bool {
            match self.syncs_after {
                Some(0) => true,
                Some(ref mut n) => {
                    *n -= 1;
                    false
                }
                None => false,
            }
        }
        fn monotonic_ms(&mut self) -> u64 {
            self.now
        }
        fn wall_secs(&mut self) -> u64 {
            self.now / 1000
        }
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn sync_succeeds_within_poll_budget() {
        let mut clock = ClockService::new(FakeRtc {
            syncs_after: Some(3),
            refuse: false,
            now: 5_000,
        });
        assert!(clock.sync(&mut NoDelay));
        assert!(clock.is_synced());
    }

    #[test]
    fn sync_times_out_and_clock_stays_usable() {
        let mut clock = ClockService::new(FakeRtc {
            syncs_after: None,
            refuse: false,
            now: 12_000,
        });
        assert!(!clock.sync(&mut NoDelay));
        assert!(!clock.is_synced());
        assert_eq!(clock.now(), 12);
        assert_eq!(clock.monotonic_ms(), 12_000);
    }

    #[test]
    fn refused_sync_fails_fast() {
        let mut clock = ClockService::new(FakeRtc {
            syncs_after: Some(0),
            refuse: true,
            now: 0,
        });
        assert!(!clock.sync(&mut NoDelay));
    }
}
