// GrowWatch: Binarized Network
//
// XNOR-popcount classifier over the four frame features.
//
// Each hidden unit binarizes every feature against its own threshold, XNORs
// the resulting bits with a stored sign mask (bit set = +1 weight), keeps only
// connected inputs, and fires when the match count reaches `fire_at`. The
// output unit does the same over the hidden bits and maps the score to a
// growth stage.
//
// The default weights are a hand-set calibration: sign-consistent (more
// green, less red, taller -> more likely ready) so the response is monotonic.
// Trained weights are loaded through `ControllerConfig::network`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, FEATURE_COUNT, HIDDEN_UNITS};
use crate::events::{FeatureVector, GrowthStage, InferenceResult};

const FEATURE_MASK: u8 = (1 << FEATURE_COUNT) - 1;
const HIDDEN_MASK: u8 = (1 << HIDDEN_UNITS) - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HiddenUnit {
    /// Feature `i` binarizes to 1 when `feature >= thresholds[i]`.
    pub thresholds: [u8; FEATURE_COUNT],
    /// Sign per input, bit set = +1.
    pub weights: u8,
    /// Inputs that participate, bit set = connected.
    pub connect: u8,
    pub fire_at: u8,
}

impl HiddenUnit {
    pub fn binarize(&self, features: &FeatureVector) -> u8 {
        features
            .as_array()
            .iter()
            .zip(self.thresholds.iter())
            .enumerate()
            .fold(0u8, |bits, (i, (value, threshold))| {
                if value >= threshold {
                    bits | (1 << i)
                } else {
                    bits
                }
            })
    }

    pub fn fires(&self, features: &FeatureVector) -> bool {
        xnor_popcount(self.binarize(features), self.weights, self.connect & FEATURE_MASK)
            >= u32::from(self.fire_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputUnit {
    pub weights: u8,
    pub connect: u8,
    /// Score at which the plant is classified harvest-ready.
    pub fire_at: u8,
    /// Score at which the plant is at least growing.
    pub growing_at: u8,
}

impl OutputUnit {
    pub fn score(&self, hidden: u8) -> u32 {
        xnor_popcount(hidden, self.weights, self.connect & HIDDEN_MASK)
    }

    pub fn stage(&self, hidden: u8) -> GrowthStage {
        let score = self.score(hidden);
        if score >= u32::from(self.fire_at) {
            GrowthStage::Ready
        } else if score >= u32::from(self.growing_at) {
            GrowthStage::Growing
        } else {
            GrowthStage::Early
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinarizedNetwork {
    pub hidden: [HiddenUnit; HIDDEN_UNITS],
    pub output: OutputUnit,
}

impl Default for BinarizedNetwork {
    fn default() -> Self {
        // inputs: bit0 green, bit1 red, bit2 brightness, bit3 height
        Self {
            hidden: [
                // green canopy
                HiddenUnit {
                    thresholds: [96, 0, 0, 0],
                    weights: 0b0001,
                    connect: 0b0001,
                    fire_at: 1,
                },
                // low red (no senescence)
                HiddenUnit {
                    thresholds: [0, 128, 0, 0],
                    weights: 0b0000,
                    connect: 0b0010,
                    fire_at: 1,
                },
                // height
                HiddenUnit {
                    thresholds: [0, 0, 0, 96],
                    weights: 0b1000,
                    connect: 0b1000,
                    fire_at: 1,
                },
                // vigour: dense green, bright, tall
                HiddenUnit {
                    thresholds: [160, 0, 64, 150],
                    weights: 0b1101,
                    connect: 0b1101,
                    fire_at: 2,
                },
            ],
            output: OutputUnit {
                weights: 0b1111,
                connect: 0b1111,
                fire_at: 3,
                growing_at: 2,
            },
        }
    }
}

impl BinarizedNetwork {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (unit, h) in self.hidden.iter().enumerate() {
            let connected = (h.connect & FEATURE_MASK).count_ones();
            if u32::from(h.fire_at) > connected {
                return Err(ConfigError::UnreachableHiddenUnit {
                    unit,
                    fire_at: h.fire_at,
                    connected,
                });
            }
        }

        let o = &self.output;
        let connected = (o.connect & HIDDEN_MASK).count_ones();
        if o.growing_at > o.fire_at || u32::from(o.fire_at) > connected {
            return Err(ConfigError::InvalidOutputThresholds {
                growing_at: o.growing_at,
                fire_at: o.fire_at,
                connected,
            });
        }
        Ok(())
    }

    /// Activation of a single hidden unit.
    pub fn hidden_unit(&self, unit: usize, features: &FeatureVector) -> bool {
        self.hidden[unit].fires(features)
    }

    /// Output layer over an already-evaluated hidden word.
    pub fn resolve(&self, hidden: u8) -> InferenceResult {
        let hidden = hidden & HIDDEN_MASK;
        let stage = self.output.stage(hidden);
        InferenceResult {
            classification: stage == GrowthStage::Ready,
            stage,
            hidden_activations: hidden,
        }
    }

    /// Whole network in one call. The pipelined engine must agree with this.
    pub fn classify(&self, features: &FeatureVector) -> InferenceResult {
        let hidden = (0..HIDDEN_UNITS)
            .filter(|&unit| self.hidden_unit(unit, features))
            .fold(0u8, |word, unit| word | (1 << unit));
        self.resolve(hidden)
    }
}

fn xnor_popcount(inputs: u8, weights: u8, connect: u8) -> u32 {
    (!(inputs ^ weights) & connect).count_ones()
}
