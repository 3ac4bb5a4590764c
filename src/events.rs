// GrowWatch: Shared Data Types & Controller Events

use crate::config::{FEATURE_COUNT, NO_TARGET_BUCKET};

// ---------------------------------------------------------------------------
// Per-frame feature vector
// ---------------------------------------------------------------------------

/// Quantized per-frame summary handed from the feature extractor to the
/// inference engine. All levels are 0..=255.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FeatureVector {
    pub green_level: u8,
    pub red_level: u8,
    pub brightness: u8,
    pub height: u8,
}

impl FeatureVector {
    pub fn new(green_level: u8, red_level: u8, brightness: u8, height: u8) -> Self {
        Self {
            green_level,
            red_level,
            brightness,
            height,
        }
    }

    /// Features in network input order.
    pub fn as_array(&self) -> [u8; FEATURE_COUNT] {
        [self.green_level, self.red_level, self.brightness, self.height]
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Growth stage classification
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrowthStage {
    #[default]
    Early,
    Growing,
    Ready,
}

impl GrowthStage {
    /// Human-readable label for logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Early   => "early",
            Self::Growing => "growing",
            Self::Ready   => "harvest-ready",
        }
    }

    /// Two-bit wire code; code 3 is reserved for "fault" by the output layouts.
    pub fn code(&self) -> u8 {
        match self {
            Self::Early   => 0,
            Self::Growing => 1,
            Self::Ready   => 2,
        }
    }
}

/// Outcome of one inference pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferenceResult {
    /// Single classification bit: harvest-ready or not.
    pub classification: bool,
    pub stage: GrowthStage,
    /// One bit per hidden unit, unit 0 in bit 0.
    pub hidden_activations: u8,
}

// ---------------------------------------------------------------------------
// Ultrasonic ranging
// ---------------------------------------------------------------------------

/// Result of one completed ranging cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingReading {
    Target {
        echo_cycles: u32,
        distance_cm: u16,
        bucket: u8,
    },
    NoTarget,
}

impl RangingReading {
    pub fn bucket(&self) -> u8 {
        match self {
            Self::Target { bucket, .. } => *bucket,
            Self::NoTarget => NO_TARGET_BUCKET,
        }
    }
}

/// Registered view of the ranging controller, republished every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangingState {
    pub trigger_active: bool,
    /// Echo-high cycles counted so far in the current cycle.
    pub echo_timer: u32,
    /// Bucket of the latest completed reading.
    pub distance_bucket: u8,
    pub distance_cm: Option<u16>,
    /// Set only on the cycle a ranging operation finishes.
    pub completed: Option<RangingReading>,
}

impl Default for RangingState {
    fn default() -> Self {
        Self {
            trigger_active: false,
            echo_timer: 0,
            distance_bucket: NO_TARGET_BUCKET,
            distance_cm: None,
            completed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller events, sent to subscribers via channel
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Reset (including stretch) finished; the core is running.
    ResetReleased,
    FrameStarted,
    FrameCompleted(FeatureVector),
    /// A frame was abandoned mid-line; no features were produced.
    FrameDiscarded,
    InferenceReady(InferenceResult),
    RangingComplete(RangingReading),
    FaultRaised,
    FaultCleared,
}
