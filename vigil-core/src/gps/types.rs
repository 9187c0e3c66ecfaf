// gps/types.rs
use heapless::String;

/// Last known position fix.
///
/// `valid` says whether the most recent parse produced a usable fix; a void
/// or garbled sentence never clears a previously good position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
    pub valid: bool,
    /// UTC time field of the sentence that produced the fix (hhmmss.sss).
    pub fix_time: String<12>,
}

impl GpsFix {
    pub const fn new() -> Self {
        Self {
            lat: 0.0,
            lon: 0.0,
            valid: false,
            fix_time: String::new(),
        }
    }
}

/// Receiver bookkeeping, reported for diagnostics only.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsHealth {
    pub sentences: u32,
    pub fixes: u32,
    pub parse_errors: u32,
}

impl GpsHealth {
    pub const fn new() -> Self {
        Self {
            sentences: 0,
            fixes: 0,
            parse_errors: 0,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsSensorError {
    InvalidData,
}
