// GrowWatch: Input Sampling & Reset Synchronizer
//
// Pins are sampled once per system-clock tick as levels. Edges are derived by
// comparing against the previous tick's sample, so a slow pixel clock yields
// one capture per transition no matter how many ticks it is held.

use crate::config::{CaptureEdge, RESET_MIN_CYCLES};
use crate::port::{PinRole, PortMap};

/// Raw pin levels presented to the core for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inputs {
    /// Pixel data byte.
    pub ui_in: u8,
    /// Bidirectional port as seen from the pads.
    pub uio_in: u8,
    /// Active-low reset.
    pub rst_n: bool,
    pub ena: bool,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            ui_in: 0,
            uio_in: 0,
            rst_n: true,
            ena: true,
        }
    }
}

impl Inputs {
    pub fn new(ui_in: u8, uio_in: u8) -> Self {
        Self {
            ui_in,
            uio_in,
            ..Self::default()
        }
    }

    pub fn in_reset() -> Self {
        Self {
            rst_n: false,
            ..Self::default()
        }
    }
}

/// A sampled signal with its transition relative to the previous tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Level {
    pub high: bool,
    pub rose: bool,
    pub fell: bool,
}

impl Level {
    fn sample(prev: bool, now: bool) -> Self {
        Self {
            high: now,
            rose: now && !prev,
            fell: !now && prev,
        }
    }

    pub fn changed(&self) -> bool {
        self.rose || self.fell
    }

    pub fn edge(&self, edge: CaptureEdge) -> bool {
        match edge {
            CaptureEdge::Both    => self.changed(),
            CaptureEdge::Rising  => self.rose,
            CaptureEdge::Falling => self.fell,
        }
    }
}

/// Decoded view of one tick's inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortSample {
    pub pixel: u8,
    pub frame_valid: Level,
    pub line_valid: Level,
    pub pixel_clock: Level,
    pub echo: bool,
}

impl PortSample {
    /// True when every camera input pin is at `level`.
    pub fn camera_lines_at(&self, level: bool) -> bool {
        self.frame_valid.high == level
            && self.line_valid.high == level
            && self.pixel_clock.high == level
    }
}

#[derive(Debug, Default)]
pub struct InputSampler {
    last_frame_valid: bool,
    last_line_valid: bool,
    last_pixel_clock: bool,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&mut self, inputs: &Inputs, map: &PortMap) -> PortSample {
        let frame_valid = map.read(PinRole::FrameValidIn, inputs.uio_in);
        let line_valid = map.read(PinRole::LineValidIn, inputs.uio_in);
        let pixel_clock = map.read(PinRole::PixelClockIn, inputs.uio_in);

        let sample = PortSample {
            pixel: inputs.ui_in,
            frame_valid: Level::sample(self.last_frame_valid, frame_valid),
            line_valid: Level::sample(self.last_line_valid, line_valid),
            pixel_clock: Level::sample(self.last_pixel_clock, pixel_clock),
            echo: map.read(PinRole::EchoIn, inputs.uio_in),
        };

        self.last_frame_valid = frame_valid;
        self.last_line_valid = line_valid;
        self.last_pixel_clock = pixel_clock;
        sample
    }
}

// ---------------------------------------------------------------------------
// Reset synchronizer
// ---------------------------------------------------------------------------

/// Tracks the active-low reset and stretches short pulses to
/// [`RESET_MIN_CYCLES`].
#[derive(Debug, Default)]
pub struct ResetSync {
    asserted_for: u32,
    stretch: u32,
}

impl ResetSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the core must be held in reset this tick.
    pub fn step(&mut self, rst_n: bool) -> bool {
        if !rst_n {
            self.asserted_for = self.asserted_for.saturating_add(1);
            self.stretch = RESET_MIN_CYCLES.saturating_sub(self.asserted_for);
            return true;
        }

        self.asserted_for = 0;
        if self.stretch > 0 {
            self.stretch -= 1;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_clock_edges_follow_level_changes() {
        let map = PortMap::default();
        let mut sampler = InputSampler::new();

        let low = sampler.sample(&Inputs::new(0, 0), &map);
        assert!(!low.pixel_clock.changed());

        let high = sampler.sample(&Inputs::new(0, 0b0010_0000), &map);
        assert!(high.pixel_clock.rose);

        // held high: no further edge
        let held = sampler.sample(&Inputs::new(0, 0b0010_0000), &map);
        assert!(!held.pixel_clock.changed());

        let fell = sampler.sample(&Inputs::new(0, 0), &map);
        assert!(fell.pixel_clock.fell);
        assert!(fell.pixel_clock.edge(CaptureEdge::Both));
        assert!(!fell.pixel_clock.edge(CaptureEdge::Rising));
    }

    #[test]
    fn short_reset_is_stretched_to_minimum() {
        let mut reset = ResetSync::new();
        assert!(reset.step(false));

        let mut held = 1;
        while reset.step(true) {
            held += 1;
        }
        assert_eq!(held, RESET_MIN_CYCLES);
    }

    #[test]
    fn long_reset_releases_immediately() {
        let mut reset = ResetSync::new();
        for _ in 0..RESET_MIN_CYCLES + 5 {
            assert!(reset.step(false));
        }
        assert!(!reset.step(true));
    }
}
