// link.rs
//
// Dual-uplink supervision: a short-range primary link and a cellular
// fallback, with bounded retries and failover. Link transports are owned
// resources handed to the manager at construction; the manager only ever
// talks to them through the two traits below.

use crate::types::{LinkKind, LinkState};
use crate::{info, warn};
use embedded_hal::delay::DelayNs;
use heapless::String;

/// One-second polls to wait for the primary link after a connect request.
pub const PRIMARY_CONNECT_POLLS: u32 = 20;
/// Primary reconnect attempts per health check before falling back.
pub const PRIMARY_RETRY: u32 = 3;
/// 500 ms polls to wait for the modem to come up. The modem firmware gives
/// no completion guarantee, so exhaustion is treated as a failed connect.
pub const FALLBACK_CONNECT_POLLS: u32 = 60;

/// Modem bring-up status, decoded from the modem's numeric status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemStatus {
    /// PPP session is up and an address is assigned.
    Connected,
    /// Attaching to the network.
    Connecting,
    /// Modem firmware still starting.
    Initializing,
    /// Registered, PPP negotiation in progress.
    PppStarting,
    /// Anything the modem reports that we do not recognise.
    Fault,
}

impl ModemStatus {
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => ModemStatus::Connected,
            0 => ModemStatus::Connecting,
            98 => ModemStatus::Initializing,
            89 => ModemStatus::PppStarting,
            _ => ModemStatus::Fault,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    Unreachable,
}

/// Short-range wireless uplink (WiFi on the reference hardware).
pub trait PrimaryLink {
    /// Kicks off an association attempt; completion is observed via
    /// [`PrimaryLink::is_connected`].
    fn begin_connect(&mut self);
    fn is_connected(&mut self) -> bool;
    fn address(&self) -> String<40>;
    fn signal_quality(&mut self) -> i16;
}

/// Wide-area cellular uplink (SIM800-class modem with PPP).
pub trait FallbackLink {
    fn begin_connect(&mut self);
    fn status(&mut self) -> ModemStatus;
    fn address(&self) -> String<40>;
    fn signal_quality(&mut self) -> i16;
}

/// Supervises both uplinks and owns the published [`LinkState`].
///
/// Connection loss is never fatal: every routine here reports its outcome
/// through the link state and returns, and the tick loop carries on.
pub struct ConnectivityManager<P, F> {
    primary: P,
    fallback: F,
    pub link: LinkState,
}

impl<P: PrimaryLink, F: FallbackLink> ConnectivityManager<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            link: LinkState::down(),
        }
    }

    /// Initial bring-up: primary first, fallback second. Returns false only
    /// when both fail; the link state then stays down.
    pub fn connect(&mut self, delay: &mut impl DelayNs) -> bool {
        if self.connect_primary(delay) {
            return true;
        }
        if self.connect_fallback(delay) {
            return true;
        }
        warn!("no uplink: primary and fallback both failed");
        self.link = LinkState::down();
        false
    }

    /// Periodic health check, called every tick.
    ///
    /// While either link reports connected this is a pure no-op: the
    /// fallback is accepted as sufficient and no opportunistic failback to
    /// the primary is attempted, to avoid flapping between links.
    pub fn check_connection(&mut self, delay: &mut impl DelayNs) -> bool {
        if self.primary.is_connected() {
            if self.link.kind != LinkKind::Primary {
                self.adopt_primary();
            }
            return true;
        }
        if self.fallback.status() == ModemStatus::Connected {
            if self.link.kind != LinkKind::Fallback {
                self.adopt_fallback();
            }
            return true;
        }

        warn!("uplink lost, reconnecting");
        for attempt in 1..=PRIMARY_RETRY {
            if self.connect_primary(delay) {
                return true;
            }
            info!("primary reconnect failed (attempt {attempt}/{PRIMARY_RETRY})");
        }
        if self.connect_fallback(delay) {
            return true;
        }

        self.link = LinkState::down();
        false
    }

    fn connect_primary(&mut self, delay: &mut impl DelayNs) -> bool {
        self.primary.begin_connect();
        for _ in 0..PRIMARY_CONNECT_POLLS {
            if self.primary.is_connected() {
                self.adopt_primary();
                return true;
            }
            delay.delay_ms(1000);
        }
        false
    }

    fn connect_fallback(&mut self, delay: &mut impl DelayNs) -> bool {
        self.fallback.begin_connect();
        for _ in 0..FALLBACK_CONNECT_POLLS {
            match self.fallback.status() {
                ModemStatus::Connected => {
                    self.adopt_fallback();
                    return true;
                }
                ModemStatus::Connecting
                | ModemStatus::Initializing
                | ModemStatus::PppStarting => {}
                ModemStatus::Fault => {
                    warn!("modem reported a fault during connect");
                    return false;
                }
            }
            delay.delay_ms(500);
        }
        warn!("modem never reached connected state");
        false
    }

    fn adopt_primary(&mut self) {
        self.link = LinkState {
            kind: LinkKind::Primary,
            address: self.primary.address(),
            signal_quality: self.primary.signal_quality(),
        };
        info!("uplink: primary ({})", self.link.address);
    }

    fn adopt_fallback(&mut self) {
        self.link = LinkState {
            kind: LinkKind::Fallback,
            address: self.fallback.address(),
            signal_quality: self.fallback.signal_quality(),
        };
        info!("uplink: fallback ({})", self.link.address);
    }
}

#[cfg(test)]
mod tests;
