// GrowWatch: Sensor Fault Detector
//
// A disconnected camera bus floats to all-low or all-high. The flag asserts
// once one pattern has been held unbroken for its window and drops on the
// first sample that breaks it. Any camera-line edge breaks the pattern.
//
// All-low needs FAULT_WINDOW_CYCLES. All-high needs the much longer
// FLOATING_HIGH_WINDOW_CYCLES: a white pixel on an open line with the pixel
// clock high looks identical for as long as the camera holds that level.

use crate::config::{FAULT_WINDOW_CYCLES, FLOATING_HIGH_WINDOW_CYCLES};
use crate::input::PortSample;

/// The bus level a sample is stuck at, if any.
pub fn floating_level(sample: &PortSample) -> Option<bool> {
    match sample.pixel {
        0x00 if sample.camera_lines_at(false) => Some(false),
        0xFF if sample.camera_lines_at(true) => Some(true),
        _ => None,
    }
}

pub fn is_degenerate(sample: &PortSample) -> bool {
    floating_level(sample).is_some()
}

fn window(level: bool) -> u32 {
    if level {
        FLOATING_HIGH_WINDOW_CYCLES
    } else {
        FAULT_WINDOW_CYCLES
    }
}

#[derive(Debug, Default)]
pub struct FaultDetector {
    level: Option<bool>,
    run: u32,
}

impl FaultDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn step(&mut self, sample: &PortSample) -> bool {
        let edge = sample.frame_valid.changed()
            || sample.line_valid.changed()
            || sample.pixel_clock.changed();
        let level = floating_level(sample);

        if level.is_none() || edge || level != self.level {
            self.run = 0;
        }
        self.level = level;

        match level {
            Some(level) => {
                self.run = self.run.saturating_add(1);
                self.run >= window(level)
            }
            None => false,
        }
    }
}
