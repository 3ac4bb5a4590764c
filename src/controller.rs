// GrowWatch: Controller Top Level
//
// One `tick` is one rising edge of the system clock. Every component computes
// its next state from this tick's sampled pins and from the registers the
// other components published on the previous tick (`Wires`), so no component
// sees another's update mid-cycle. The arbiter then presents the registers
// written this tick.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::config::{ConfigError, ControllerConfig};
use crate::drivers::ultrasonic::UltrasonicRanger;
use crate::events::{ControllerEvent, FeatureVector, InferenceResult, RangingState};
use crate::input::{InputSampler, Inputs, ResetSync};
use crate::tasks::clock::SensorClock;
use crate::tasks::fault::FaultDetector;
use crate::tasks::frame::FrameSync;
use crate::tasks::inference::InferenceEngine;
use crate::tasks::output::{OutputArbiter, Outputs};

/// Registered component outputs, as visible at the end of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wires {
    pub sensor_clock: bool,
    /// End-of-frame features, present for one tick.
    pub features: Option<FeatureVector>,
    /// Ready pulse with its result, present for one tick.
    pub inference: Option<InferenceResult>,
    pub ranging: RangingState,
    pub fault: bool,
}

pub struct Controller {
    config: ControllerConfig,
    reset: ResetSync,
    in_reset: bool,
    sampler: InputSampler,
    clock: SensorClock,
    frame: FrameSync,
    engine: InferenceEngine,
    ranger: UltrasonicRanger,
    fault: FaultDetector,
    arbiter: OutputArbiter,
    wires: Wires,
    cycle: u64,
    subscribers: Vec<Sender<ControllerEvent>>,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            reset: ResetSync::new(),
            in_reset: false,
            sampler: InputSampler::new(),
            clock: SensorClock::new(),
            frame: FrameSync::new(
                config.frame_sync,
                config.capture_edge,
                config.pixel_format,
                config.height_threshold,
            ),
            engine: InferenceEngine::new(config.network),
            ranger: UltrasonicRanger::new(),
            fault: FaultDetector::new(),
            arbiter: OutputArbiter::new(config.output_layout, config.clearance_alarm_bucket),
            wires: Wires::default(),
            cycle: 0,
            subscribers: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Enabled ticks since construction, reset included.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn wires(&self) -> &Wires {
        &self.wires
    }

    /// Result shown on the output pins until the next ready pulse.
    pub fn latched_result(&self) -> InferenceResult {
        self.arbiter.latched()
    }

    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    /// Receive controller events. Sends never block; dropped receivers are
    /// ignored.
    pub fn subscribe(&mut self) -> Receiver<ControllerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Start a ranging cycle on the next tick if the ranger is idle.
    pub fn request_ranging(&mut self) {
        self.ranger.request();
    }

    pub fn tick(&mut self, inputs: Inputs) -> Outputs {
        if !inputs.ena {
            return Outputs::released();
        }
        self.cycle += 1;

        let holding = self.reset.step(inputs.rst_n);
        if holding {
            if !self.in_reset {
                log::debug!("reset asserted at cycle {}", self.cycle);
            }
            self.in_reset = true;
            self.restart();
            // keep edge history current so release does not see stale edges
            self.sampler.sample(&inputs, &self.config.port_map);
            return Outputs::reset_word(&self.config.port_map);
        }
        if self.in_reset {
            self.in_reset = false;
            log::info!("reset released at cycle {}", self.cycle);
            self.emit(ControllerEvent::ResetReleased);
        }

        let sample = self.sampler.sample(&inputs, &self.config.port_map);
        let prev = self.wires;

        let sensor_clock = self.clock.step();
        let frame = self.frame.step(&sample);
        let inference = self.engine.step(prev.features);
        let ranging = self.ranger.step(sample.echo);
        let fault = self.fault.step(&sample);

        self.wires = Wires {
            sensor_clock,
            features: frame.features,
            inference,
            ranging,
            fault,
        };

        if frame.discarded {
            self.emit(ControllerEvent::FrameDiscarded);
        }
        if let Some(features) = frame.features {
            self.emit(ControllerEvent::FrameCompleted(features));
        }
        if frame.started {
            self.emit(ControllerEvent::FrameStarted);
        }
        if let Some(result) = inference {
            self.emit(ControllerEvent::InferenceReady(result));
        }
        if let Some(reading) = ranging.completed {
            self.emit(ControllerEvent::RangingComplete(reading));
        }
        if fault != prev.fault {
            if fault {
                log::warn!("sensor fault: camera bus looks disconnected");
                self.emit(ControllerEvent::FaultRaised);
            } else {
                log::info!("sensor fault cleared");
                self.emit(ControllerEvent::FaultCleared);
            }
        }

        let wires = self.wires;
        self.arbiter.compose(&wires, &self.config.port_map)
    }

    fn restart(&mut self) {
        self.clock.reset();
        self.frame.reset();
        self.engine.reset();
        self.ranger.reset();
        self.fault.reset();
        self.arbiter.reset();
        self.wires = Wires::default();
    }

    fn emit(&mut self, event: ControllerEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::INFERENCE_LATENCY_CYCLES;

    const VSYNC: u8 = 0b1000_0000;

    fn controller() -> Controller {
        Controller::new(ControllerConfig::default()).expect("default config is valid")
    }

    #[test]
    fn reset_word_while_held() {
        let mut ctl = controller();
        ctl.tick(Inputs::new(0x55, VSYNC));
        let out = ctl.tick(Inputs::in_reset());
        assert_eq!(out, Outputs::reset_word(&ctl.config().port_map));
        assert!(ctl.in_reset());
    }

    #[test]
    fn disabled_core_releases_port_and_freezes() {
        let mut ctl = controller();
        let before = ctl.cycle();
        let out = ctl.tick(Inputs {
            ena: false,
            ..Inputs::default()
        });
        assert_eq!(out, Outputs::released());
        assert_eq!(ctl.cycle(), before);
    }

    #[test]
    fn ready_follows_frame_end_by_fixed_latency() {
        let mut ctl = controller();
        ctl.tick(Inputs::new(0x10, VSYNC));
        ctl.tick(Inputs::new(0x10, 0));
        assert!(ctl.wires().features.is_some());

        for n in 1..=INFERENCE_LATENCY_CYCLES {
            let out = ctl.tick(Inputs::new(0x10, 0));
            assert_eq!(out.bit(5), n == INFERENCE_LATENCY_CYCLES, "cycle {}", n);
        }
    }

    #[test]
    fn events_reach_subscribers() {
        let mut ctl = controller();
        let rx = ctl.subscribe();
        ctl.tick(Inputs::new(0x10, VSYNC));
        ctl.tick(Inputs::new(0x10, 0));
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ControllerEvent::FrameStarted,
                ControllerEvent::FrameCompleted(FeatureVector::default()),
            ]
        );
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut ctl = controller();
        drop(ctl.subscribe());
        ctl.tick(Inputs::new(0x10, VSYNC));
        assert!(ctl.subscribers.is_empty());
    }
}
