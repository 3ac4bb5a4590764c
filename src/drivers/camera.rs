// GrowWatch: Camera Pixel Decoder
//
// Two bytes per pixel arrive on the data port. The byte pair is assembled into
// a 16-bit word and each colour field is cut out according to the configured
// layout, then widened to 8 bits.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// A colour field inside the assembled 16-bit pixel word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BitField {
    pub shift: u8,
    pub width: u8,
}

impl BitField {
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    fn fits(&self) -> bool {
        self.width >= 1 && self.width <= 8 && u32::from(self.shift) + u32::from(self.width) <= 16
    }

    /// Extract the field and scale it to 0..=255 by repeating its top bits.
    pub fn extract(&self, word: u16) -> u8 {
        let width = u32::from(self.width.min(8));
        if width == 0 {
            return 0;
        }
        let raw = u32::from(word).checked_shr(u32::from(self.shift)).unwrap_or(0) & ((1 << width) - 1);
        let mut widened = raw << (8 - width);
        let mut filled = width;
        while filled < 8 {
            widened |= widened >> filled;
            filled *= 2;
        }
        widened as u8
    }
}

/// Which of the two bytes carries the high half of the pixel word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ByteOrder {
    #[default]
    HighFirst,
    LowFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelFormat {
    pub byte_order: ByteOrder,
    pub red: BitField,
    pub green: BitField,
    pub blue: BitField,
}

impl PixelFormat {
    /// First byte RRRRRGGG, second byte GGGBBBBB.
    pub const RGB565: Self = Self {
        byte_order: ByteOrder::HighFirst,
        red: BitField::new(11, 5),
        green: BitField::new(5, 6),
        blue: BitField::new(0, 5),
    };

    pub const BGR565: Self = Self {
        byte_order: ByteOrder::HighFirst,
        red: BitField::new(0, 5),
        green: BitField::new(5, 6),
        blue: BitField::new(11, 5),
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, field) in [("red", self.red), ("green", self.green), ("blue", self.blue)] {
            if !field.fits() {
                return Err(ConfigError::PixelFieldOutOfRange {
                    name,
                    shift: field.shift,
                    width: field.width,
                });
            }
        }
        Ok(())
    }

    pub fn assemble(&self, first: u8, second: u8) -> u16 {
        match self.byte_order {
            ByteOrder::HighFirst => u16::from_be_bytes([first, second]),
            ByteOrder::LowFirst  => u16::from_le_bytes([first, second]),
        }
    }

    pub fn decode(&self, first: u8, second: u8) -> Pixel {
        let word = self.assemble(first, second);
        Pixel {
            red: self.red.extract(word),
            green: self.green.extract(word),
            blue: self.blue.extract(word),
        }
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::RGB565
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Pixel {
    /// Integer luma approximation, (r + 2g + b) / 4.
    pub fn brightness(&self) -> u8 {
        ((u16::from(self.red) + 2 * u16::from(self.green) + u16::from(self.blue)) / 4) as u8
    }

    /// Inverse of [`PixelFormat::decode`] for full-scale components; used to
    /// build stimulus.
    pub fn encode(&self, format: &PixelFormat) -> (u8, u8) {
        let mut word = 0u16;
        for (field, value) in [
            (format.red, self.red),
            (format.green, self.green),
            (format.blue, self.blue),
        ] {
            word |= (u16::from(value) >> (8 - field.width)) << field.shift;
        }
        let [hi, lo] = word.to_be_bytes();
        match format.byte_order {
            ByteOrder::HighFirst => (hi, lo),
            ByteOrder::LowFirst  => (lo, hi),
        }
    }
}

/// Pairs consecutive captured bytes into pixels.
#[derive(Debug, Default)]
pub struct PixelAssembler {
    pending: Option<u8>,
}

impl PixelAssembler {
    pub fn push(&mut self, byte: u8, format: &PixelFormat) -> Option<Pixel> {
        match self.pending.take() {
            Some(first) => Some(format.decode(first, byte)),
            None => {
                self.pending = Some(byte);
                None
            }
        }
    }

    /// Drop a half-received pixel at line end.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
