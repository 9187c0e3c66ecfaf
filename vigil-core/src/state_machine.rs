// state_machine.rs
use crate::imu::ImuSample;
use crate::types::MotionState;
use heapless::Deque;
use libm::sqrtf;

/// Acceleration-change threshold (g, deviation from rest) above which the
/// vehicle is considered moving.
pub const DRIVE_ACCEL_THRESHOLD: f32 = 0.3;
/// Gyroscope magnitude threshold (deg/s) above which the vehicle is
/// considered moving.
pub const DRIVE_GYRO_THRESHOLD: f32 = 15.0;

/// Acceleration magnitude (g) any single windowed sample must exceed to
/// declare an accident.
pub const ACCIDENT_ACCEL_THRESHOLD: f32 = 40.0;
/// Gyroscope magnitude (deg/s) any single windowed sample must exceed to
/// declare an accident.
pub const ACCIDENT_GYRO_THRESHOLD: f32 = 200.0;
/// Number of consecutive samples the accident predicate inspects.
pub const ACCIDENT_WINDOW: usize = 9;
/// Minimum interval between two accepted accident detections.
pub const ACCIDENT_COOLDOWN_MS: u64 = 30_000;

/// Idle time after which Drive (or an unacknowledged Accident) falls back
/// to Park.
pub const IDLE_TIMEOUT_MS: u64 = 5_000;

/// Park/Drive/Accident classifier fed once per tick with the latest sample.
///
/// Owns every piece of cross-tick state the transitions depend on: the
/// last-movement timestamp, the accident sample window, and the detection
/// cooldown deadline.
pub struct MotionMonitor {
    pub state: MotionState,
    last_movement_ms: u64,
    window: Deque<[f32; 6], ACCIDENT_WINDOW>,
    cooldown_until_ms: u64,
}

impl MotionMonitor {
    pub fn new() -> Self {
        Self {
            state: MotionState::Init,
            last_movement_ms: 0,
            window: Deque::new(),
            cooldown_until_ms: 0,
        }
    }

    /// Init -> Park, once hardware and network bring-up has succeeded.
    /// Not re-entered afterwards.
    pub fn arm(&mut self, now_ms: u64) {
        if self.state == MotionState::Init {
            self.state = MotionState::Park;
            self.last_movement_ms = now_ms;
        }
    }

    /// Advances the state machine with the latest sample. Called exactly
    /// once per tick; returns the (possibly unchanged) current state.
    pub fn update(&mut self, sample: &ImuSample, now_ms: u64) -> MotionState {
        match self.state {
            MotionState::Init => {}
            MotionState::Park => {
                if is_moving(sample) {
                    self.state = MotionState::Drive;
                    self.last_movement_ms = now_ms;
                }
            }
            MotionState::Drive => {
                if self.detect_accident(sample, now_ms) {
                    self.state = MotionState::Accident;
                    self.last_movement_ms = now_ms;
                } else if is_moving(sample) {
                    self.last_movement_ms = now_ms;
                } else if now_ms.saturating_sub(self.last_movement_ms) > IDLE_TIMEOUT_MS {
                    self.state = MotionState::Park;
                    self.last_movement_ms = now_ms;
                }
            }
            MotionState::Accident => {
                if is_moving(sample) {
                    self.last_movement_ms = now_ms;
                } else if now_ms.saturating_sub(self.last_movement_ms) > IDLE_TIMEOUT_MS {
                    self.state = MotionState::Park;
                    self.last_movement_ms = now_ms;
                }
            }
        }
        self.state
    }

    /// External acknowledgement of an accident: return to Park and re-arm
    /// the cooldown so the same event cannot immediately re-trigger.
    pub fn acknowledge(&mut self, now_ms: u64) {
        if self.state == MotionState::Accident {
            self.state = MotionState::Park;
            self.last_movement_ms = now_ms;
            self.cooldown_until_ms = now_ms + ACCIDENT_COOLDOWN_MS;
        }
    }

    /// Sliding-window spike test over the last `ACCIDENT_WINDOW` raw
    /// samples. Only evaluated once the window is full; a positive result
    /// clears the window and suppresses further detections for
    /// `ACCIDENT_COOLDOWN_MS`.
    fn detect_accident(&mut self, sample: &ImuSample, now_ms: u64) -> bool {
        if now_ms < self.cooldown_until_ms {
            return false;
        }

        if self.window.is_full() {
            self.window.pop_front();
        }
        // Capacity was just freed if needed, push cannot fail.
        let _ = self.window.push_back(sample.six_axis());

        if !self.window.is_full() {
            return false;
        }

        for axes in self.window.iter() {
            let accel_magnitude =
                sqrtf(axes[0] * axes[0] + axes[1] * axes[1] + axes[2] * axes[2]);
            let gyro_magnitude =
                sqrtf(axes[3] * axes[3] + axes[4] * axes[4] + axes[5] * axes[5]);

            if accel_magnitude > ACCIDENT_ACCEL_THRESHOLD
                || gyro_magnitude > ACCIDENT_GYRO_THRESHOLD
            {
                self.window.clear();
                self.cooldown_until_ms = now_ms + ACCIDENT_COOLDOWN_MS;
                return true;
            }
        }
        false
    }
}

impl Default for MotionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// The Park -> Drive activity test; strict on both thresholds.
fn is_moving(sample: &ImuSample) -> bool {
    sample.accel_change > DRIVE_ACCEL_THRESHOLD || sample.gyro_magnitude > DRIVE_GYRO_THRESHOLD
}
