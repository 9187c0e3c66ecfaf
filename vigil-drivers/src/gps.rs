// gps.rs
use embedded_io::{Read, ReadReady};
use heapless::Vec;
use vigil_core::gps::types::{GpsFix, GpsHealth};
use vigil_core::process_line;
use vigil_core::{debug, warn};

// Max NMEA length is 82; leave headroom for receivers that pad.
const MAX_SENTENCE_LEN: usize = 128;

/// Buffered NMEA reader over a UART.
///
/// Drains whatever bytes the port has buffered each poll, reassembles
/// CR/LF-delimited sentences and feeds them to the core parser. A garbled
/// sentence is counted and dropped; it never stops the loop.
pub struct GpsUart<R> {
    port: R,
    line: Vec<u8, MAX_SENTENCE_LEN>,
    pub fix: GpsFix,
    pub health: GpsHealth,
}

impl<R: Read + ReadReady> GpsUart<R> {
    pub fn new(port: R) -> Self {
        Self {
            port,
            line: Vec::new(),
            fix: GpsFix::new(),
            health: GpsHealth::new(),
        }
    }

    /// Reads all pending bytes. Returns true if this poll yielded a new
    /// valid fix.
    pub fn poll(&mut self) -> bool {
        let mut new_fix = false;
        loop {
            match self.port.read_ready() {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => {
                    warn!("GPS UART read-ready query failed");
                    break;
                }
            }

            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    if self.feed(byte[0]) {
                        new_fix = true;
                    }
                }
                Err(_) => {
                    warn!("GPS UART read failed");
                    break;
                }
            }
        }
        new_fix
    }

    fn feed(&mut self, byte: u8) -> bool {
        if byte == b'\r' || byte == b'\n' {
            if self.line.is_empty() {
                return false;
            }
            self.health.sentences += 1;
            let result = process_line(&self.line, &mut self.fix);
            self.line.clear();
            return match result {
                Ok(true) => {
                    self.health.fixes += 1;
                    true
                }
                Ok(false) => false,
                Err(_) => {
                    self.health.parse_errors += 1;
                    debug!("discarded malformed NMEA sentence");
                    false
                }
            };
        }

        if self.line.push(byte).is_err() {
            // Runaway sentence, resynchronize at the next delimiter.
            self.line.clear();
        }
        false
    }
}
