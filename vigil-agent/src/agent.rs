// agent.rs
//
// The top-level loop: one logical thread owning every component, advanced
// by a fixed-period tick. Per-tick faults are absorbed and logged; only
// startup failures are fatal, and those are main's call.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;
use embedded_io::{Read, ReadReady};
use log::warn;
use vigil_core::clock::{ClockService, TimeSource};
use vigil_core::imu::{ImuSample, ImuSensorError};
use vigil_core::link::{ConnectivityManager, FallbackLink, PrimaryLink};
use vigil_core::telemetry::{ModemIdentity, TelemetryChannel, TelemetryLink};
use vigil_core::types::{LinkKind, MotionState};
use vigil_core::MotionMonitor;
use vigil_drivers::{GpsUart, Mpu6050};

/// Agent identity and cadence. All compile-time on the device; a struct
/// here so scenarios can shorten the cadence.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub device_id: &'static str,
    /// Acquisition period.
    pub tick_ms: u64,
    /// Telemetry publish period; a multiple of the tick.
    pub publish_ms: u64,
    pub topic_sensor: &'static str,
    pub modem_identity: ModemIdentity,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            device_id: "vigil-01",
            tick_ms: 100,
            publish_ms: 500,
            topic_sensor: "/VIGIL/data",
            modem_identity: ModemIdentity {
                imei: "865067022349178",
                imsi: "510105842599416",
            },
        }
    }
}

pub struct VehicleAgent<I2C, PORT, P, F, L, RLY, T> {
    config: AgentConfig,
    pub imu: Mpu6050<I2C>,
    pub gps: GpsUart<PORT>,
    pub monitor: MotionMonitor,
    pub connectivity: ConnectivityManager<P, F>,
    pub telemetry: TelemetryChannel<L, RLY>,
    pub clock: ClockService<T>,
    pub imu_faults: u32,
    last_publish_ms: u64,
    last_link_kind: LinkKind,
}

impl<I2C, PORT, P, F, L, RLY, T> VehicleAgent<I2C, PORT, P, F, L, RLY, T>
where
    I2C: I2c,
    PORT: Read + ReadReady,
    P: PrimaryLink,
    F: FallbackLink,
    L: TelemetryLink,
    RLY: OutputPin,
    T: TimeSource,
{
    pub fn new(
        config: AgentConfig,
        imu: Mpu6050<I2C>,
        gps: GpsUart<PORT>,
        connectivity: ConnectivityManager<P, F>,
        telemetry: TelemetryChannel<L, RLY>,
        clock: ClockService<T>,
    ) -> Self {
        Self {
            config,
            imu,
            gps,
            monitor: MotionMonitor::new(),
            connectivity,
            telemetry,
            clock,
            imu_faults: 0,
            last_publish_ms: 0,
            last_link_kind: LinkKind::None,
        }
    }

    /// Probes and wakes the sensors. Startup only; an error here is fatal.
    pub fn init_hardware(&mut self) -> Result<(), ImuSensorError> {
        self.imu.init()
    }

    /// Initial uplink bring-up.
    pub fn connect(&mut self, delay: &mut impl DelayNs) -> bool {
        self.connectivity.connect(delay)
    }

    /// Park the state machine; called once everything else is up.
    pub fn arm(&mut self) {
        let now_ms = self.clock.monotonic_ms();
        self.monitor.arm(now_ms);
    }

    /// One acquisition cycle: connectivity check, command dispatch, GPS
    /// poll, IMU read, state machine update, cadenced publish.
    pub fn tick(&mut self, delay: &mut impl DelayNs) -> MotionState {
        let now_ms = self.clock.monotonic_ms();

        let link_up = self.connectivity.check_connection(delay);
        self.telemetry.poll();
        self.gps.poll();

        let sample = match self.imu.read() {
            Ok(sample) => sample,
            Err(e) => {
                // A faulted read must not register as motion.
                self.imu_faults += 1;
                warn!("imu read failed ({e:?}), substituting zeroed sample");
                ImuSample::zeroed()
            }
        };

        let state = self.monitor.update(&sample, now_ms);
        let wall = self.clock.now();

        let kind = self.connectivity.link.kind;
        if kind != self.last_link_kind {
            self.last_link_kind = kind;
            if self.connectivity.link.is_up() {
                self.telemetry.publish_link_state(&self.connectivity.link, wall);
            }
        }

        if now_ms.saturating_sub(self.last_publish_ms) >= self.config.publish_ms
            && link_up
            && self.gps.fix.valid
        {
            self.last_publish_ms = now_ms;
            match state {
                MotionState::Init => {}
                MotionState::Park => {
                    self.telemetry.publish_park(&self.gps.fix, wall);
                }
                MotionState::Drive | MotionState::Accident => {
                    self.telemetry.publish_motion(state, &self.gps.fix, &sample, wall);
                }
            }
        }

        state
    }

    /// Runs `ticks` acquisition cycles at the configured period.
    pub fn run(&mut self, ticks: u32, delay: &mut impl DelayNs) {
        for _ in 0..ticks {
            self.tick(delay);
            delay.delay_ms(self.config.tick_ms as u32);
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
