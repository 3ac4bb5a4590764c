// GrowWatch: Timing Constants & Controller Configuration
// Target: single 100 kHz system clock, TinyTapeout-style pin bundle

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bnn::BinarizedNetwork;
use crate::drivers::camera::PixelFormat;
use crate::port::{PinRole, PortMap};
use crate::tasks::output::OutputLayout;

// ---------------------------------------------------------------------------
// System Clock
// ---------------------------------------------------------------------------
pub const SYSTEM_CLOCK_HZ: u32 = 100_000; // 10 us period
pub const MICROS_PER_CYCLE: u32 = 1_000_000 / SYSTEM_CLOCK_HZ;

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------
pub const RESET_MIN_CYCLES: u32 = 10;   // shorter pulses are stretched
pub const STABILIZATION_CYCLES: u32 = 20; // outputs settled after reset release

// ---------------------------------------------------------------------------
// Binarized Inference
// ---------------------------------------------------------------------------
pub const FEATURE_COUNT: usize = 4;  // green, red, brightness, height
pub const HIDDEN_UNITS: usize = 4;   // one debug bit per unit
/// Cycles from the tick that publishes a FeatureVector to the ready pulse:
/// one latch cycle, one per hidden unit, one resolve cycle.
pub const INFERENCE_LATENCY_CYCLES: u32 = HIDDEN_UNITS as u32 + 2;

// ---------------------------------------------------------------------------
// Ultrasonic Ranging (HC-SR04 class sensor)
// ---------------------------------------------------------------------------
pub const TRIGGER_PULSE_CYCLES: u32 = 2;          // 20 us, sensor needs >= 10 us
pub const ECHO_RISE_TIMEOUT_CYCLES: u32 = 2_000;  // 20 ms without echo -> no target
pub const ECHO_MAX_CYCLES: u32 = 3_800;           // 38 ms echo = sensor's own "nothing seen"
pub const RANGING_PERIOD_CYCLES: u32 = 6_000;     // 60 ms between cycles
pub const ECHO_ROUND_TRIP_US_PER_CM: u32 = 58;
/// Centimetres per echo cycle, Q16 fixed point.
pub const CM_PER_CYCLE_Q16: u32 = (MICROS_PER_CYCLE << 16) / ECHO_ROUND_TRIP_US_PER_CM;
pub const BUCKET_WIDTH_CM: u32 = 10;
pub const MAX_TARGET_BUCKET: u8 = 6;
pub const NO_TARGET_BUCKET: u8 = 7;

// ---------------------------------------------------------------------------
// Fault Detection
// ---------------------------------------------------------------------------
pub const FAULT_WINDOW_CYCLES: u32 = 8;
/// All-high is also a white pixel on an open line, so it must outlast any
/// pixel-clock level a live camera holds.
pub const FLOATING_HIGH_WINDOW_CYCLES: u32 = 256;

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------
pub const BUZZER_CHIRP_CYCLES: u32 = 5_000; // 50 ms

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// How frame-valid delimits a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameSyncMode {
    /// Frame is open while frame-valid is high.
    #[default]
    Level,
    /// Frame-valid pulses at start of frame; the next rising edge closes it.
    Pulse,
}

/// Which pixel-clock transitions capture a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CaptureEdge {
    #[default]
    Both,
    Rising,
    Falling,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("pin role {0:?} is assigned to more than one port bit")]
    DuplicatePinRole(PinRole),
    #[error("pixel field {name} (shift {shift}, width {width}) does not fit a 16-bit word")]
    PixelFieldOutOfRange {
        name: &'static str,
        shift: u8,
        width: u8,
    },
    #[error("hidden unit {unit} fires at {fire_at} but only {connected} inputs are connected")]
    UnreachableHiddenUnit {
        unit: usize,
        fire_at: u8,
        connected: u32,
    },
    #[error("output unit thresholds invalid: growing_at {growing_at} must be <= fire_at {fire_at} <= {connected} connected units")]
    InvalidOutputThresholds {
        growing_at: u8,
        fire_at: u8,
        connected: u32,
    },
    #[error("clearance alarm bucket {0} is beyond the last target bucket")]
    ClearanceBucketOutOfRange(u8),
}

/// Everything about the controller that varies between deployments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControllerConfig {
    pub pixel_format: PixelFormat,
    pub frame_sync: FrameSyncMode,
    pub capture_edge: CaptureEdge,
    /// A line counts as "tall" when any of its pixels is brighter than this.
    pub height_threshold: u8,
    pub network: BinarizedNetwork,
    pub output_layout: OutputLayout,
    pub port_map: PortMap,
    /// Sound the buzzer when a target is at or inside this distance bucket.
    pub clearance_alarm_bucket: Option<u8>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pixel_format: PixelFormat::RGB565,
            frame_sync: FrameSyncMode::default(),
            capture_edge: CaptureEdge::default(),
            height_threshold: 96,
            network: BinarizedNetwork::default(),
            output_layout: OutputLayout::default(),
            port_map: PortMap::default(),
            clearance_alarm_bucket: Some(1),
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pixel_format.validate()?;
        self.network.validate()?;
        self.port_map.validate()?;
        if let Some(bucket) = self.clearance_alarm_bucket {
            if bucket > MAX_TARGET_BUCKET {
                return Err(ConfigError::ClearanceBucketOutOfRange(bucket));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ControllerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn conversion_constant_matches_round_trip_time() {
        // 58 cycles of 10 us is ~10 cm of round trip
        let cm = (58 * CM_PER_CYCLE_Q16) >> 16;
        assert_eq!(cm, 9);
        let cm = (60 * CM_PER_CYCLE_Q16) >> 16;
        assert_eq!(cm, 10);
    }

    #[test]
    fn rejects_clearance_bucket_past_range() {
        let config = ControllerConfig {
            clearance_alarm_bucket: Some(NO_TARGET_BUCKET),
            ..ControllerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ClearanceBucketOutOfRange(NO_TARGET_BUCKET))
        );
    }
}
