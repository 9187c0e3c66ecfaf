// types.rs
use heapless::String;

/// Motion classification of the vehicle.
///
/// `Init` is only ever observed before hardware and network bring-up
/// completes; afterwards the monitor moves between `Park`, `Drive` and
/// `Accident` and never returns to `Init`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionState {
    Init = 0,
    Park = 1,
    Drive = 2,
    Accident = 3,
}

impl MotionState {
    /// Wire label used in the `state.status` field of telemetry payloads.
    pub const fn status_str(&self) -> &'static str {
        match self {
            MotionState::Init => "init",
            MotionState::Park => "park",
            MotionState::Drive => "drive",
            MotionState::Accident => "accident",
        }
    }
}

/// Which uplink is currently carrying telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkKind {
    /// No uplink: before the first successful connect, or after total loss.
    None,
    /// Short-range wireless (WiFi).
    Primary,
    /// Wide-area cellular (GSM/PPP).
    Fallback,
}

/// Snapshot of the active uplink, owned by the connectivity manager.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkState {
    pub kind: LinkKind,
    pub address: String<40>,
    pub signal_quality: i16,
}

impl LinkState {
    pub const fn down() -> Self {
        Self {
            kind: LinkKind::None,
            address: String::new(),
            signal_quality: 0,
        }
    }

    /// Operator label used in the modem telemetry payload.
    pub const fn operator(&self) -> &'static str {
        match self.kind {
            LinkKind::None => "none",
            LinkKind::Primary => "WiFi",
            LinkKind::Fallback => "GSM",
        }
    }

    pub const fn is_up(&self) -> bool {
        !matches!(self.kind, LinkKind::None)
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::down()
    }
}

/// Inbound relay-control command, a single literal byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayCommand {
    Off,
    On,
}

impl RelayCommand {
    /// Accepts exactly `b"0"` / `b"1"`; any other payload is ignored.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            b"0" => Some(RelayCommand::Off),
            b"1" => Some(RelayCommand::On),
            _ => None,
        }
    }
}
