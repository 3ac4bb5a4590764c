// GrowWatch: Frame/Line Synchronizer
//
// Follows frame-valid / line-valid / pixel-clock from the camera and feeds
// captured pixels to the feature accumulator. At end of frame the extracted
// FeatureVector is published for the inference engine.

use crate::config::{CaptureEdge, FrameSyncMode};
use crate::drivers::camera::{PixelAssembler, PixelFormat};
use crate::events::FeatureVector;
use crate::input::PortSample;
use crate::tasks::features::FeatureAccumulator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    /// Frame open, between lines.
    LineIdle,
    LineActive,
}

impl SyncState {
    pub fn frame_open(&self) -> bool {
        *self != Self::Idle
    }
}

/// What happened to frame delimiting on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStep {
    pub started: bool,
    pub discarded: bool,
    /// Present only on the end-of-frame tick.
    pub features: Option<FeatureVector>,
}

#[derive(Debug)]
pub struct FrameSync {
    mode: FrameSyncMode,
    capture_edge: CaptureEdge,
    format: PixelFormat,
    height_threshold: u8,
    state: SyncState,
    assembler: PixelAssembler,
    acc: FeatureAccumulator,
}

impl FrameSync {
    pub fn new(
        mode: FrameSyncMode,
        capture_edge: CaptureEdge,
        format: PixelFormat,
        height_threshold: u8,
    ) -> Self {
        Self {
            mode,
            capture_edge,
            format,
            height_threshold,
            state: SyncState::Idle,
            assembler: PixelAssembler::default(),
            acc: FeatureAccumulator::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = SyncState::Idle;
        self.assembler.clear();
        self.acc.clear();
    }

    pub fn step(&mut self, sample: &PortSample) -> FrameStep {
        let mut step = FrameStep::default();

        match self.mode {
            FrameSyncMode::Level => {
                if !self.state.frame_open() && sample.frame_valid.high {
                    self.open_frame(&mut step);
                } else if self.state.frame_open() && !sample.frame_valid.high {
                    self.close_frame(&mut step);
                    return step;
                }
            }
            FrameSyncMode::Pulse => {
                if sample.frame_valid.rose {
                    if self.state == SyncState::LineActive {
                        log::warn!(
                            "frame-valid edge mid-line, discarding frame ({} pixels)",
                            self.acc.pixel_count()
                        );
                        step.discarded = true;
                    } else if self.state.frame_open() {
                        self.close_frame(&mut step);
                    }
                    self.open_frame(&mut step);
                }
            }
        }

        if !self.state.frame_open() {
            return step;
        }

        if self.state == SyncState::LineIdle && sample.line_valid.high {
            self.state = SyncState::LineActive;
            self.assembler.clear();
        } else if self.state == SyncState::LineActive && !sample.line_valid.high {
            self.end_line();
            return step;
        }

        if self.state == SyncState::LineActive && sample.pixel_clock.edge(self.capture_edge) {
            log::trace!("captured byte {:#04x}", sample.pixel);
            if let Some(pixel) = self.assembler.push(sample.pixel, &self.format) {
                self.acc.add_pixel(&pixel, self.height_threshold);
            }
        }

        step
    }

    fn open_frame(&mut self, step: &mut FrameStep) {
        self.acc.clear();
        self.assembler.clear();
        self.state = SyncState::LineIdle;
        step.started = true;
    }

    fn close_frame(&mut self, step: &mut FrameStep) {
        if self.state == SyncState::LineActive {
            self.end_line();
        }
        let features = self.acc.extract();
        log::debug!(
            "frame done: {} pixels, {} lines -> {:?}",
            self.acc.pixel_count(),
            self.acc.line_count(),
            features
        );
        self.acc.clear();
        self.state = SyncState::Idle;
        step.features = Some(features);
    }

    fn end_line(&mut self) {
        self.assembler.clear();
        self.acc.end_line();
        self.state = SyncState::LineIdle;
    }
}
