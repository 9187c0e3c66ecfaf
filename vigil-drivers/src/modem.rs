// modem.rs
use embedded_io::{Read, Write};
use heapless::{String, Vec};
use vigil_core::link::{FallbackLink, ModemStatus};
use vigil_core::{debug, warn};

const MAX_RESPONSE_LINE: usize = 64;
// Response lines to scan before giving up on a command.
const MAX_RESPONSE_LINES: usize = 8;

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemError {
    Io,
    Garbled,
}

/// SIM800-class cellular modem on a UART, driven with AT commands.
///
/// The driver is deliberately stateless about the connection itself: the
/// connectivity manager polls [`Sim800::status`] and decides what the
/// answer means.
pub struct Sim800<S> {
    serial: S,
    apn: &'static str,
    address: String<40>,
}

impl<S: Read + Write> Sim800<S> {
    pub fn new(serial: S, apn: &'static str) -> Self {
        Self {
            serial,
            apn,
            address: String::new(),
        }
    }

    /// Fire-and-forget bring-up sequence: disable echo, attach GPRS, set
    /// the APN, start the data session. Outcomes are observed via
    /// [`Sim800::status`] polling, so individual command failures are only
    /// logged here.
    pub fn start_session(&mut self) {
        for cmd in ["ATE0", "AT+CGATT=1"] {
            if self.query(cmd).is_err() {
                warn!("modem command failed: {cmd}");
            }
        }
        let mut cstt: String<64> = String::new();
        let _ = core::fmt::write(&mut cstt, format_args!("AT+CSTT=\"{}\"", self.apn));
        if self.query(cstt.as_str()).is_err() {
            warn!("modem APN setup failed");
        }
        if self.query("AT+CIICR").is_err() {
            warn!("modem session start failed");
        }
    }

    /// Queries network registration (AT+CREG?) and maps it onto the
    /// connectivity manager's modem status.
    pub fn registration(&mut self) -> ModemStatus {
        let line = match self.query("AT+CREG?") {
            Ok(line) => line,
            Err(e) => {
                debug!("CREG query failed: {e:?}");
                return ModemStatus::Connecting;
            }
        };

        // "+CREG: <n>,<stat>"
        let Some(stat) = line
            .as_str()
            .strip_prefix("+CREG:")
            .and_then(|rest| rest.split(',').nth(1))
            .and_then(|s| s.trim().parse::<u8>().ok())
        else {
            debug!("unparseable CREG response");
            return ModemStatus::Connecting;
        };

        match stat {
            1 | 5 => {
                if self.address.is_empty() {
                    self.refresh_address();
                }
                ModemStatus::Connected
            }
            2 => ModemStatus::Connecting,
            0 | 4 => ModemStatus::Initializing,
            3 => ModemStatus::Fault,
            _ => ModemStatus::Fault,
        }
    }

    /// Reads RSSI via AT+CSQ. 99 means "not known" and is reported as 0.
    pub fn rssi(&mut self) -> i16 {
        let Ok(line) = self.query("AT+CSQ") else {
            return 0;
        };
        let rssi = line
            .as_str()
            .strip_prefix("+CSQ:")
            .and_then(|rest| rest.split(',').next())
            .and_then(|s| s.trim().parse::<i16>().ok())
            .unwrap_or(0);
        if rssi == 99 {
            0
        } else {
            rssi
        }
    }

    fn refresh_address(&mut self) {
        // AT+CIFSR answers with a bare dotted-quad line.
        if let Ok(line) = self.query("AT+CIFSR") {
            if line.as_str().split('.').count() == 4 {
                self.address = String::try_from(line.as_str()).unwrap_or_default();
            }
        }
    }

    /// Sends one command and returns its payload line, draining the
    /// response up to the "OK"/"ERROR" terminator so the next command
    /// starts from a clean buffer. Commands that answer with a bare "OK"
    /// return that line.
    fn query(&mut self, cmd: &str) -> Result<String<MAX_RESPONSE_LINE>, ModemError> {
        self.serial
            .write_all(cmd.as_bytes())
            .map_err(|_| ModemError::Io)?;
        self.serial.write_all(b"\r\n").map_err(|_| ModemError::Io)?;

        let mut payload: Option<String<MAX_RESPONSE_LINE>> = None;
        for _ in 0..MAX_RESPONSE_LINES {
            let line = match self.read_line() {
                Ok(line) => line,
                // AT+CIFSR answers without a terminator, so a payload
                // already in hand survives the dried-up read.
                Err(e) => return payload.ok_or(e),
            };
            if line.is_empty() || line.as_str() == cmd {
                continue;
            }
            match line.as_str() {
                "OK" => return Ok(payload.unwrap_or(line)),
                "ERROR" => return Err(ModemError::Garbled),
                _ => {
                    if payload.is_none() {
                        payload = Some(line);
                    }
                }
            }
        }
        payload.ok_or(ModemError::Garbled)
    }

    fn read_line(&mut self) -> Result<String<MAX_RESPONSE_LINE>, ModemError> {
        let mut buf: Vec<u8, MAX_RESPONSE_LINE> = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.serial.read(&mut byte) {
                Ok(0) => return Err(ModemError::Io),
                Ok(_) => match byte[0] {
                    b'\n' => break,
                    b'\r' => {}
                    b => {
                        if buf.push(b).is_err() {
                            return Err(ModemError::Garbled);
                        }
                    }
                },
                Err(_) => return Err(ModemError::Io),
            }
        }
        let text = core::str::from_utf8(&buf).map_err(|_| ModemError::Garbled)?;
        Ok(String::try_from(text).unwrap_or_default())
    }
}

impl<S: Read + Write> FallbackLink for Sim800<S> {
    fn begin_connect(&mut self) {
        self.start_session();
    }

    fn status(&mut self) -> ModemStatus {
        self.registration()
    }

    fn address(&self) -> String<40> {
        self.address.clone()
    }

    fn signal_quality(&mut self) -> i16 {
        self.rssi()
    }
}
