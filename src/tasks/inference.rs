// GrowWatch: Inference Pipeline
//
// Evaluates the binarized network one hidden unit per cycle. A FeatureVector
// arriving while busy waits in a single pending slot; a newer one replaces it.
// Ready is a one-cycle pulse carrying the result.

use crate::bnn::BinarizedNetwork;
use crate::config::HIDDEN_UNITS;
use crate::events::{FeatureVector, InferenceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Hidden {
        features: FeatureVector,
        unit: usize,
        word: u8,
    },
    Resolve {
        word: u8,
    },
}

#[derive(Debug)]
pub struct InferenceEngine {
    network: BinarizedNetwork,
    state: EngineState,
    pending: Option<FeatureVector>,
}

impl InferenceEngine {
    pub fn new(network: BinarizedNetwork) -> Self {
        Self {
            network,
            state: EngineState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != EngineState::Idle
    }

    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.pending = None;
    }

    /// Advance one cycle. `arrival` is the FeatureVector published by the
    /// extractor on the previous cycle, if any.
    pub fn step(&mut self, arrival: Option<FeatureVector>) -> Option<InferenceResult> {
        if let Some(features) = arrival {
            if self.state == EngineState::Idle {
                self.state = latch(features);
                return None;
            }
            if self.pending.replace(features).is_some() {
                log::debug!("pending feature vector superseded before inference");
            }
        }

        match self.state {
            EngineState::Idle => None,
            EngineState::Hidden {
                features,
                unit,
                word,
            } => {
                let word = if self.network.hidden_unit(unit, &features) {
                    word | (1 << unit)
                } else {
                    word
                };
                self.state = if unit + 1 < HIDDEN_UNITS {
                    EngineState::Hidden {
                        features,
                        unit: unit + 1,
                        word,
                    }
                } else {
                    EngineState::Resolve { word }
                };
                None
            }
            EngineState::Resolve { word } => {
                let result = self.network.resolve(word);
                log::info!(
                    "inference: {} (hidden {:04b})",
                    result.stage.display_name(),
                    result.hidden_activations
                );
                self.state = self.pending.take().map(latch).unwrap_or_default();
                Some(result)
            }
        }
    }
}

fn latch(features: FeatureVector) -> EngineState {
    EngineState::Hidden {
        features,
        unit: 0,
        word: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INFERENCE_LATENCY_CYCLES;

    fn run_until_ready(engine: &mut InferenceEngine, features: FeatureVector) -> (u32, InferenceResult) {
        let mut arrival = Some(features);
        for cycle in 1..=100 {
            if let Some(result) = engine.step(arrival.take()) {
                return (cycle, result);
            }
        }
        panic!("engine never signalled ready");
    }

    #[test]
    fn latency_is_fixed_and_result_matches_reference() {
        let net = BinarizedNetwork::default();
        let mut engine = InferenceEngine::new(net);
        for fv in [
            FeatureVector::new(50, 80, 60, 30),
            FeatureVector::new(200, 80, 120, 180),
            FeatureVector::default(),
        ] {
            let (cycles, result) = run_until_ready(&mut engine, fv);
            // the arrival step is the first cycle after the extractor publishes
            assert_eq!(cycles, INFERENCE_LATENCY_CYCLES);
            assert_eq!(result, net.classify(&fv));
            assert!(!engine.is_busy());
        }
    }

    #[test]
    fn arrival_while_busy_runs_after_current() {
        let net = BinarizedNetwork::default();
        let mut engine = InferenceEngine::new(net);
        let first = FeatureVector::new(50, 80, 60, 30);
        let second = FeatureVector::new(200, 80, 120, 180);

        engine.step(Some(first));
        engine.step(Some(second));

        let mut results = Vec::new();
        for _ in 0..20 {
            if let Some(r) = engine.step(None) {
                results.push(r);
            }
        }
        assert_eq!(results, vec![net.classify(&first), net.classify(&second)]);
    }

    #[test]
    fn reset_discards_in_flight_pass() {
        let mut engine = InferenceEngine::new(BinarizedNetwork::default());
        engine.step(Some(FeatureVector::default()));
        engine.step(None);
        engine.reset();
        assert_eq!(engine.state(), EngineState::Idle);
        for _ in 0..10 {
            assert_eq!(engine.step(None), None);
        }
    }
}
