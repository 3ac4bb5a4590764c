// GrowWatch: Pixel Feature Accumulator & Extractor
//
// Running sums over one frame, frozen and quantized into a FeatureVector at
// end of frame.

use crate::drivers::camera::Pixel;
use crate::events::FeatureVector;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeatureAccumulator {
    green_sum: u32,
    red_sum: u32,
    brightness_sum: u32,
    pixel_count: u32,
    line_count: u32,
    tall_rows: u32,
    line_is_tall: bool,
}

impl FeatureAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn pixel_count(&self) -> u32 {
        self.pixel_count
    }

    pub fn line_count(&self) -> u32 {
        self.line_count
    }

    pub fn add_pixel(&mut self, pixel: &Pixel, height_threshold: u8) {
        let brightness = pixel.brightness();
        self.green_sum = self.green_sum.saturating_add(u32::from(pixel.green));
        self.red_sum = self.red_sum.saturating_add(u32::from(pixel.red));
        self.brightness_sum = self.brightness_sum.saturating_add(u32::from(brightness));
        self.pixel_count = self.pixel_count.saturating_add(1);
        if brightness > height_threshold {
            self.line_is_tall = true;
        }
    }

    /// Close the current line; counts it as tall at most once.
    pub fn end_line(&mut self) {
        self.line_count = self.line_count.saturating_add(1);
        if self.line_is_tall {
            self.tall_rows = self.tall_rows.saturating_add(1);
        }
        self.line_is_tall = false;
    }

    /// Quantize the frame. Averages over pixels; height is the tall-row
    /// fraction scaled to 0..=255.
    pub fn extract(&self) -> FeatureVector {
        if self.pixel_count == 0 {
            return FeatureVector::default();
        }
        let mean = |sum: u32| (sum / self.pixel_count).min(255) as u8;
        let height = if self.line_count == 0 {
            0
        } else {
            ((u64::from(self.tall_rows) * 255) / u64::from(self.line_count)).min(255) as u8
        };

        FeatureVector {
            green_level: mean(self.green_sum),
            red_level: mean(self.red_sum),
            brightness: mean(self.brightness_sum),
            height,
        }
    }
}
