// telemetry.rs
//
// Wire payloads and the publish/subscribe channel. Payload shapes mirror
// what the dashboard consumes: every sub-object carries its own timestamp,
// and the state sub-object's `status` is the lowercase motion state label.

use crate::imu::ImuSample;
use crate::types::{LinkState, MotionState, RelayCommand};
use crate::{info, warn};
use crate::gps::types::GpsFix;
use embedded_hal::digital::OutputPin;
use heapless::{String, Vec};
use serde::Serialize;

/// Maximum inbound command payload the channel will look at.
pub const MAX_COMMAND_LEN: usize = 16;

#[derive(Debug, Serialize)]
pub struct LocationPayload {
    pub lat: f64,
    pub lng: f64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct AxisPayload {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct AccelChangePayload {
    pub accel: f32,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct GyroMagnitudePayload {
    pub gyro: f32,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct StatePayload {
    pub status: &'static str,
    pub timestamp: u64,
}

/// Payload published while parked: position and state only.
#[derive(Debug, Serialize)]
pub struct ParkReport {
    pub location: LocationPayload,
    pub state: StatePayload,
}

/// Payload published while driving or after an accident: position plus the
/// full inertial picture.
#[derive(Debug, Serialize)]
pub struct MotionReport {
    pub location: LocationPayload,
    pub acceleration: AxisPayload,
    pub gyroscope: AxisPayload,
    pub accel_change: AccelChangePayload,
    pub gyro_magnitude: GyroMagnitudePayload,
    pub state: StatePayload,
}

/// Identity of the installed modem and SIM. Provisioned out of band and
/// static for the life of the unit.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModemIdentity {
    pub imei: &'static str,
    pub imsi: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ModemPayload {
    pub ip_address: String<40>,
    pub operator: &'static str,
    pub signal_strength: i16,
    #[serde(rename = "IMEI")]
    pub imei: &'static str,
    #[serde(rename = "IMSI")]
    pub imsi: &'static str,
    pub timestamp: u64,
}

/// One-shot report describing the active uplink.
#[derive(Debug, Serialize)]
pub struct ModemReport {
    pub modem: ModemPayload,
}

impl ParkReport {
    pub fn new(fix: &GpsFix, timestamp: u64) -> Self {
        Self {
            location: LocationPayload {
                lat: fix.lat,
                lng: fix.lon,
                timestamp,
            },
            state: StatePayload {
                status: MotionState::Park.status_str(),
                timestamp,
            },
        }
    }
}

impl MotionReport {
    pub fn new(state: MotionState, fix: &GpsFix, sample: &ImuSample, timestamp: u64) -> Self {
        Self {
            location: LocationPayload {
                lat: fix.lat,
                lng: fix.lon,
                timestamp,
            },
            acceleration: AxisPayload {
                x: sample.accel[0],
                y: sample.accel[1],
                z: sample.accel[2],
                timestamp,
            },
            gyroscope: AxisPayload {
                x: sample.gyro[0],
                y: sample.gyro[1],
                z: sample.gyro[2],
                timestamp,
            },
            accel_change: AccelChangePayload {
                accel: sample.accel_change,
                timestamp,
            },
            gyro_magnitude: GyroMagnitudePayload {
                gyro: sample.gyro_magnitude,
                timestamp,
            },
            state: StatePayload {
                status: state.status_str(),
                timestamp,
            },
        }
    }
}

impl ModemReport {
    pub fn new(link: &LinkState, identity: ModemIdentity, timestamp: u64) -> Self {
        Self {
            modem: ModemPayload {
                ip_address: link.address.clone(),
                operator: link.operator(),
                signal_strength: link.signal_quality,
                imei: identity.imei,
                imsi: identity.imsi,
                timestamp,
            },
        }
    }
}

/// Transport behind the telemetry channel: an MQTT session on the device,
/// an in-memory recorder in the SITL harness.
pub trait TelemetryLink {
    type Error: core::fmt::Debug;

    /// Publishes one payload to a topic. Best effort; the caller drops the
    /// payload on error.
    fn publish<P: Serialize>(&mut self, topic: &str, payload: &P) -> Result<(), Self::Error>;

    /// Returns the next inbound command payload, if one is queued.
    fn poll_command(&mut self) -> Option<Vec<u8, MAX_COMMAND_LEN>>;
}

/// Publishes state snapshots and dispatches inbound relay commands.
///
/// Publishing is fire-and-forget: a transport error is logged and counted,
/// never escalated, and no payload is queued for retry. Command dispatch
/// runs inline when [`TelemetryChannel::poll`] is called, so relay writes
/// are serialized with the main loop.
pub struct TelemetryChannel<L, R> {
    link: L,
    relay: R,
    topic_sensor: &'static str,
    identity: ModemIdentity,
    pub dropped_payloads: u32,
    pub relay_state: Option<RelayCommand>,
}

impl<L: TelemetryLink, R: OutputPin> TelemetryChannel<L, R> {
    pub fn new(link: L, relay: R, topic_sensor: &'static str, identity: ModemIdentity) -> Self {
        Self {
            link,
            relay,
            topic_sensor,
            identity,
            dropped_payloads: 0,
            relay_state: None,
        }
    }

    /// Drains queued inbound commands and drives the relay. Commands are
    /// level commands, last-write-wins; unknown payloads are ignored.
    pub fn poll(&mut self) {
        while let Some(raw) = self.link.poll_command() {
            let Some(command) = RelayCommand::parse(&raw) else {
                warn!("ignoring unknown command payload ({} bytes)", raw.len());
                continue;
            };
            self.apply_relay(command);
        }
    }

    fn apply_relay(&mut self, command: RelayCommand) {
        // The relay driver input is active-low.
        let result = match command {
            RelayCommand::On => self.relay.set_low(),
            RelayCommand::Off => self.relay.set_high(),
        };
        match result {
            Ok(()) => {
                info!("relay {:?}", command);
                self.relay_state = Some(command);
            }
            Err(_) => warn!("relay output write failed"),
        }
    }

    pub fn publish_park(&mut self, fix: &GpsFix, timestamp: u64) -> bool {
        let report = ParkReport::new(fix, timestamp);
        self.publish(&report)
    }

    pub fn publish_motion(
        &mut self,
        state: MotionState,
        fix: &GpsFix,
        sample: &ImuSample,
        timestamp: u64,
    ) -> bool {
        let report = MotionReport::new(state, fix, sample, timestamp);
        self.publish(&report)
    }

    pub fn publish_link_state(&mut self, link: &LinkState, timestamp: u64) -> bool {
        let report = ModemReport::new(link, self.identity, timestamp);
        self.publish(&report)
    }

    fn publish<P: Serialize>(&mut self, payload: &P) -> bool {
        match self.link.publish(self.topic_sensor, payload) {
            Ok(()) => true,
            Err(e) => {
                self.dropped_payloads += 1;
                warn!("publish failed, payload dropped: {e:?}");
                false
            }
        }
    }
}
