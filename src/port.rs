// GrowWatch: Bidirectional Port Ownership
//
// Every bit of the shared port belongs to exactly one role. Direction comes
// from the role, so the output-enable mask is static and two functions can
// never drive the same pin.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const PORT_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PinRole {
    Unused,
    EchoIn,
    TriggerOut,
    SensorClockOut,
    PixelClockIn,
    LineValidIn,
    FrameValidIn,
}

impl PinRole {
    pub fn is_output(&self) -> bool {
        matches!(self, Self::TriggerOut | Self::SensorClockOut)
    }
}

/// Role assignment for each bit of the bidirectional port, bit 0 first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortMap {
    pins: [PinRole; PORT_WIDTH],
}

impl Default for PortMap {
    fn default() -> Self {
        Self {
            pins: [
                PinRole::EchoIn,         // bit0
                PinRole::TriggerOut,     // bit1
                PinRole::Unused,         // bit2
                PinRole::Unused,         // bit3
                PinRole::SensorClockOut, // bit4
                PinRole::PixelClockIn,   // bit5
                PinRole::LineValidIn,    // bit6
                PinRole::FrameValidIn,   // bit7
            ],
        }
    }
}

impl PortMap {
    pub fn new(pins: [PinRole; PORT_WIDTH]) -> Result<Self, ConfigError> {
        let map = Self { pins };
        map.validate()?;
        Ok(map)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, role) in self.pins.iter().enumerate() {
            if *role == PinRole::Unused {
                continue;
            }
            if self.pins[i + 1..].contains(role) {
                return Err(ConfigError::DuplicatePinRole(*role));
            }
        }
        Ok(())
    }

    pub fn bit_of(&self, role: PinRole) -> Option<usize> {
        if role == PinRole::Unused {
            return None;
        }
        self.pins.iter().position(|r| *r == role)
    }

    /// Output-enable mask: set where the owning role drives the pin.
    pub fn oe_mask(&self) -> u8 {
        self.pins
            .iter()
            .enumerate()
            .filter(|(_, role)| role.is_output())
            .fold(0u8, |mask, (bit, _)| mask | (1 << bit))
    }

    /// Level of an input role in a raw port sample. Unmapped roles read low,
    /// and output pins never read back as inputs.
    pub fn read(&self, role: PinRole, uio_in: u8) -> bool {
        match self.bit_of(role) {
            Some(bit) if !role.is_output() => (uio_in >> bit) & 1 == 1,
            _ => false,
        }
    }

    /// Start composing this cycle's port output.
    pub fn driver(&self) -> PortDriver<'_> {
        PortDriver { map: self, out: 0 }
    }
}

/// Write side of the port for one cycle. Only output roles can set bits.
pub struct PortDriver<'a> {
    map: &'a PortMap,
    out: u8,
}

impl PortDriver<'_> {
    pub fn drive(&mut self, role: PinRole, level: bool) {
        if !role.is_output() {
            log::trace!("ignoring drive of input role {:?}", role);
            return;
        }
        if let Some(bit) = self.map.bit_of(role) {
            if level {
                self.out |= 1 << bit;
            } else {
                self.out &= !(1 << bit);
            }
        }
    }

    /// Final `uio_out`, masked to pins that are actually outputs.
    pub fn finish(self) -> u8 {
        self.out & self.map.oe_mask()
    }
}
