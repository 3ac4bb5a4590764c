// GrowWatch: LED & Buzzer Drive
//
// LED is a steady level. The buzzer either sounds continuously (alarm) or
// plays a short chirp counted in system-clock cycles.

use crate::config::BUZZER_CHIRP_CYCLES;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorLevels {
    pub led: bool,
    pub buzzer: bool,
}

#[derive(Debug, Default)]
pub struct Actuators {
    chirp_remaining: u32,
}

impl Actuators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short chirp, e.g. when a plant is first reported ready.
    pub fn trigger(&mut self) {
        self.chirp(BUZZER_CHIRP_CYCLES);
    }

    /// Chirp for a custom number of cycles; restarts any chirp in progress.
    pub fn chirp(&mut self, cycles: u32) {
        self.chirp_remaining = cycles;
    }

    pub fn reset(&mut self) {
        self.chirp_remaining = 0;
    }

    pub fn step(&mut self, led: bool, alarm: bool) -> ActuatorLevels {
        let chirping = self.chirp_remaining > 0;
        self.chirp_remaining = self.chirp_remaining.saturating_sub(1);
        ActuatorLevels {
            led,
            buzzer: alarm || chirping,
        }
    }
}
