// GrowWatch: Sensor Clock Generator
//
// Divide-by-two of the system clock: the level flips on every enabled tick.

#[derive(Debug, Default)]
pub struct SensorClock {
    level: bool,
}

impl SensorClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> bool {
        self.level
    }

    /// Back to the reset polarity (low).
    pub fn reset(&mut self) {
        self.level = false;
    }

    pub fn step(&mut self) -> bool {
        self.level = !self.level;
        self.level
    }
}
