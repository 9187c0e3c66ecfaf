// sim.rs
//
// Simulated hardware for software-in-the-loop runs. Every device clones a
// shared handle so a scenario can keep one side while the agent owns the
// other; the loop is single-threaded, so plain Rc<RefCell> is enough.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, I2c, Operation, SevenBitAddress};
use embedded_io::{ErrorType, Read, ReadReady};
use heapless::String as HString;
use serde::Serialize;
use vigil_core::clock::TimeSource;
use vigil_core::imu::{ACCEL_SCALE, GYRO_SCALE};
use vigil_core::link::{FallbackLink, ModemStatus, PrimaryLink};
use vigil_core::telemetry::{TelemetryLink, MAX_COMMAND_LEN};

/// Encodes axis readings the way the sensor would: big-endian signed
/// 16-bit, full-scale ranges matching the decode path. Out-of-range inputs
/// saturate, exactly like the physical part.
pub fn imu_frame(accel_g: [f32; 3], gyro_dps: [f32; 3]) -> [u8; 14] {
    let mut frame = [0u8; 14];
    for (i, g) in accel_g.iter().enumerate() {
        let raw = (g * ACCEL_SCALE) as i16;
        frame[i * 2..i * 2 + 2].copy_from_slice(&raw.to_be_bytes());
    }
    for (i, dps) in gyro_dps.iter().enumerate() {
        let raw = (dps * GYRO_SCALE) as i16;
        frame[8 + i * 2..8 + i * 2 + 2].copy_from_slice(&raw.to_be_bytes());
    }
    frame
}

/// A resting frame: 1 g on Z, no rotation.
pub fn still_frame() -> [u8; 14] {
    imu_frame([0.0, 0.0, 1.0], [0.0, 0.0, 0.0])
}

#[derive(Debug)]
pub struct SimBusError;

impl i2c::Error for SimBusError {
    fn kind(&self) -> i2c::ErrorKind {
        i2c::ErrorKind::Other
    }
}

struct ImuInner {
    pointer: u8,
    frames: VecDeque<[u8; 14]>,
    current: [u8; 14],
    fail_reads: u32,
}

impl ImuInner {
    fn next_frame(&mut self) -> [u8; 14] {
        if let Some(frame) = self.frames.pop_front() {
            self.current = frame;
        }
        self.current
    }
}

/// Scripted inertial sensor on a fake I2C bus. Frames are consumed one per
/// burst read; once the script runs out, the last frame holds.
#[derive(Clone)]
pub struct SimImu {
    inner: Rc<RefCell<ImuInner>>,
}

impl SimImu {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ImuInner {
                pointer: 0,
                frames: VecDeque::new(),
                current: still_frame(),
                fail_reads: 0,
            })),
        }
    }

    pub fn push_frame(&self, frame: [u8; 14]) {
        self.inner.borrow_mut().frames.push_back(frame);
    }

    pub fn push_frames(&self, frame: [u8; 14], count: usize) {
        let mut inner = self.inner.borrow_mut();
        for _ in 0..count {
            inner.frames.push_back(frame);
        }
    }

    /// The next `count` burst reads fail with a bus error.
    pub fn fail_next_reads(&self, count: u32) {
        self.inner.borrow_mut().fail_reads = count;
    }
}

impl Default for SimImu {
    fn default() -> Self {
        Self::new()
    }
}

impl i2c::ErrorType for SimImu {
    type Error = SimBusError;
}

impl I2c for SimImu {
    fn transaction(
        &mut self,
        _address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut inner = self.inner.borrow_mut();
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if let Some(&reg) = bytes.first() {
                        inner.pointer = reg;
                    }
                }
                Operation::Read(buf) => {
                    if inner.fail_reads > 0 {
                        inner.fail_reads -= 1;
                        return Err(SimBusError);
                    }
                    match inner.pointer {
                        0x75 => buf[0] = 0x68,
                        0x3B => {
                            let frame = inner.next_frame();
                            let n = buf.len().min(frame.len());
                            buf[..n].copy_from_slice(&frame[..n]);
                        }
                        _ => buf.fill(0),
                    }
                }
            }
        }
        Ok(())
    }
}

/// Scripted GPS serial port: sentences pushed here come out byte by byte.
#[derive(Clone, Default)]
pub struct SimGps {
    rx: Rc<RefCell<VecDeque<u8>>>,
}

impl SimGps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one NMEA sentence, terminator included.
    pub fn push_sentence(&self, sentence: &str) {
        let mut rx = self.rx.borrow_mut();
        rx.extend(sentence.bytes());
        rx.extend(b"\r\n");
    }
}

impl ErrorType for SimGps {
    type Error = core::convert::Infallible;
}

impl Read for SimGps {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut rx = self.rx.borrow_mut();
        let mut n = 0;
        while n < buf.len() {
            match rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl ReadReady for SimGps {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.borrow().is_empty())
    }
}

struct WifiInner {
    available: bool,
    associated: bool,
    connect_attempts: u32,
}

/// Short-range link stand-in. Association succeeds instantly while the
/// network is available; pulling availability also drops the association.
#[derive(Clone)]
pub struct SimWifi {
    inner: Rc<RefCell<WifiInner>>,
}

impl SimWifi {
    pub fn new(available: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(WifiInner {
                available,
                associated: false,
                connect_attempts: 0,
            })),
        }
    }

    pub fn set_available(&self, available: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.available = available;
        if !available {
            inner.associated = false;
        }
    }

    pub fn connect_attempts(&self) -> u32 {
        self.inner.borrow().connect_attempts
    }
}

impl PrimaryLink for SimWifi {
    fn begin_connect(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.connect_attempts += 1;
        if inner.available {
            inner.associated = true;
        }
    }

    fn is_connected(&mut self) -> bool {
        let inner = self.inner.borrow();
        inner.available && inner.associated
    }

    fn address(&self) -> HString<40> {
        HString::try_from("192.168.4.21").unwrap_or_default()
    }

    fn signal_quality(&mut self) -> i16 {
        -58
    }
}

struct ModemInner {
    available: bool,
    warmup_polls: u32,
    polls_left: u32,
    session: bool,
    connect_attempts: u32,
}

/// Cellular modem stand-in. After `begin_connect` it reports Connecting for
/// `warmup_polls` status queries, then Connected for as long as the network
/// stays available.
#[derive(Clone)]
pub struct SimModem {
    inner: Rc<RefCell<ModemInner>>,
}

impl SimModem {
    pub fn new(available: bool, warmup_polls: u32) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ModemInner {
                available,
                warmup_polls,
                polls_left: 0,
                session: false,
                connect_attempts: 0,
            })),
        }
    }

    pub fn set_available(&self, available: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.available = available;
        if !available {
            inner.session = false;
        }
    }

    pub fn connect_attempts(&self) -> u32 {
        self.inner.borrow().connect_attempts
    }
}

impl FallbackLink for SimModem {
    fn begin_connect(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.connect_attempts += 1;
        if inner.available {
            inner.session = true;
            inner.polls_left = inner.warmup_polls;
        }
    }

    fn status(&mut self) -> ModemStatus {
        let mut inner = self.inner.borrow_mut();
        if !inner.available || !inner.session {
            return ModemStatus::Initializing;
        }
        if inner.polls_left > 0 {
            inner.polls_left -= 1;
            return ModemStatus::Connecting;
        }
        ModemStatus::Connected
    }

    fn address(&self) -> HString<40> {
        HString::try_from("10.64.22.7").unwrap_or_default()
    }

    fn signal_quality(&mut self) -> i16 {
        17
    }
}

#[derive(Default)]
struct RecorderInner {
    published: Vec<(String, serde_json::Value)>,
    inbound: VecDeque<heapless::Vec<u8, MAX_COMMAND_LEN>>,
    fail: bool,
}

/// In-memory telemetry transport: JSON-encodes published payloads and hands
/// out queued inbound commands.
#[derive(Clone, Default)]
pub struct RecorderLink {
    inner: Rc<RefCell<RecorderInner>>,
}

impl RecorderLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an inbound command payload, truncated to the channel's limit.
    pub fn push_command(&self, bytes: &[u8]) {
        let mut payload = heapless::Vec::new();
        for &b in bytes.iter().take(MAX_COMMAND_LEN) {
            let _ = payload.push(b);
        }
        self.inner.borrow_mut().inbound.push_back(payload);
    }

    pub fn set_fail(&self, fail: bool) {
        self.inner.borrow_mut().fail = fail;
    }

    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.inner.borrow().published.clone()
    }

    pub fn published_count(&self) -> usize {
        self.inner.borrow().published.len()
    }

    /// The `state.status` labels of every published report that has one,
    /// in publish order.
    pub fn statuses(&self) -> Vec<String> {
        self.inner
            .borrow()
            .published
            .iter()
            .filter_map(|(_, doc)| doc["state"]["status"].as_str().map(str::to_owned))
            .collect()
    }
}

impl TelemetryLink for RecorderLink {
    type Error = &'static str;

    fn publish<P: Serialize>(&mut self, topic: &str, payload: &P) -> Result<(), Self::Error> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail {
            return Err("transport down");
        }
        let doc = serde_json::to_value(payload).map_err(|_| "encode failed")?;
        inner.published.push((topic.to_owned(), doc));
        Ok(())
    }

    fn poll_command(&mut self) -> Option<heapless::Vec<u8, MAX_COMMAND_LEN>> {
        self.inner.borrow_mut().inbound.pop_front()
    }
}

/// Relay output recorder. The driver input is active-low, so a low level
/// means the relay coil is energized.
#[derive(Clone, Default)]
pub struct SimRelay {
    level_low: Rc<Cell<bool>>,
}

impl SimRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_energized(&self) -> bool {
        self.level_low.get()
    }
}

impl digital::ErrorType for SimRelay {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimRelay {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level_low.set(true);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level_low.set(false);
        Ok(())
    }
}

/// Simulated clock: monotonic milliseconds advance only through
/// [`SimDelay`] or [`SimTime::advance_ms`], so a scenario runs as fast as
/// the host allows while the agent still sees real-looking time.
#[derive(Clone)]
pub struct SimTime {
    ms: Rc<Cell<u64>>,
    base_secs: u64,
}

impl SimTime {
    pub fn new(base_secs: u64) -> Self {
        Self {
            ms: Rc::new(Cell::new(0)),
            base_secs,
        }
    }

    /// Seeds the wall-clock base from the host clock, for natural-looking
    /// payload timestamps.
    pub fn from_system() -> Self {
        let base_secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::new(base_secs)
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay {
            ms: Rc::clone(&self.ms),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.ms.set(self.ms.get() + ms);
    }

    pub fn now_ms(&self) -> u64 {
        self.ms.get()
    }
}

impl TimeSource for SimTime {
    fn start_sync(&mut self) -> bool {
        true
    }

    fn synced(&mut self) -> bool {
        true
    }

    fn monotonic_ms(&mut self) -> u64 {
        self.ms.get()
    }

    fn wall_secs(&mut self) -> u64 {
        self.base_secs + self.ms.get() / 1000
    }
}

/// Delay that advances the simulated clock instead of sleeping.
pub struct SimDelay {
    ms: Rc<Cell<u64>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.ms.set(self.ms.get() + u64::from(ns) / 1_000_000);
    }
}
