// GrowWatch: Output Arbiter
//
// Owns the visible pins. Latches the most recent inference result, merges it
// with ranging and fault state, and lays the bits out according to the
// configured output layout. The bidirectional port is written only through
// the port map's driver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::controller::Wires;
use crate::drivers::actuator::{ActuatorLevels, Actuators};
use crate::events::{GrowthStage, InferenceResult};
use crate::port::{PinRole, PortMap};

/// Stage code shown by [`OutputLayout::StageCodeV2`] while the fault flag is up.
pub const FAULT_STAGE_CODE: u8 = 3;

/// Versioned `uo_out` bit layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OutputLayout {
    /// bits0-3 hidden, bit4 classification, bit5 ready, bit6 LED, bit7 buzzer.
    #[default]
    BinaryV1,
    /// bits0-1 stage code, bit2 ready, bit3 LED, bits4-6 distance bucket, bit7 buzzer.
    StageCodeV2,
    /// bits0-2 one-hot stage, bit3 ready, bit4 fault, bit5 LED, bit6 buzzer, bit7 trigger.
    OneHotV3,
}

/// Pin levels after one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outputs {
    pub uo_out: u8,
    pub uio_out: u8,
    pub uio_oe: u8,
}

impl Outputs {
    /// Word presented while reset is held.
    pub fn reset_word(map: &PortMap) -> Self {
        Self {
            uo_out: 0,
            uio_out: 0,
            uio_oe: map.oe_mask(),
        }
    }

    /// Enable low: nothing is driven.
    pub fn released() -> Self {
        Self::default()
    }

    pub fn bit(&self, n: u8) -> bool {
        (self.uo_out >> n) & 1 == 1
    }
}

/// Per-cycle values the layouts draw from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Visible {
    hidden: u8,
    classification: bool,
    /// `None` while faulted.
    stage: Option<GrowthStage>,
    ready: bool,
    fault: bool,
    distance_bucket: u8,
    trigger: bool,
    act: ActuatorLevels,
}

impl OutputLayout {
    fn compose(&self, v: &Visible) -> u8 {
        let b = |on: bool, n: u8| u8::from(on) << n;
        match self {
            Self::BinaryV1 => {
                (v.hidden & 0x0F)
                    | b(v.classification, 4)
                    | b(v.ready, 5)
                    | b(v.act.led, 6)
                    | b(v.act.buzzer, 7)
            }
            Self::StageCodeV2 => {
                let code = v.stage.map(|s| s.code()).unwrap_or(FAULT_STAGE_CODE);
                (code & 0b11)
                    | b(v.ready, 2)
                    | b(v.act.led, 3)
                    | ((v.distance_bucket & 0b111) << 4)
                    | b(v.act.buzzer, 7)
            }
            Self::OneHotV3 => {
                let one_hot = match v.stage {
                    Some(GrowthStage::Early)   => 0b001,
                    Some(GrowthStage::Growing) => 0b010,
                    Some(GrowthStage::Ready)   => 0b100,
                    None => 0,
                };
                one_hot
                    | b(v.ready, 3)
                    | b(v.fault, 4)
                    | b(v.act.led, 5)
                    | b(v.act.buzzer, 6)
                    | b(v.trigger, 7)
            }
        }
    }
}

#[derive(Debug)]
pub struct OutputArbiter {
    layout: OutputLayout,
    clearance_alarm_bucket: Option<u8>,
    latched: InferenceResult,
    actuators: Actuators,
}

impl OutputArbiter {
    pub fn new(layout: OutputLayout, clearance_alarm_bucket: Option<u8>) -> Self {
        Self {
            layout,
            clearance_alarm_bucket,
            latched: InferenceResult::default(),
            actuators: Actuators::new(),
        }
    }

    pub fn latched(&self) -> InferenceResult {
        self.latched
    }

    pub fn reset(&mut self) {
        self.latched = InferenceResult::default();
        self.actuators.reset();
    }

    /// Compose pins from the registers written this tick.
    pub fn compose(&mut self, wires: &Wires, map: &PortMap) -> Outputs {
        if let Some(result) = wires.inference {
            self.latched = result;
            if result.classification && !wires.fault {
                self.actuators.trigger();
            }
        }

        let clearance_alarm = match (self.clearance_alarm_bucket, wires.ranging.distance_cm) {
            (Some(limit), Some(_)) => wires.ranging.distance_bucket <= limit,
            _ => false,
        };
        let harvest = self.latched.classification && !wires.fault;
        let act = self.actuators.step(harvest, wires.fault || clearance_alarm);

        let visible = Visible {
            hidden: self.latched.hidden_activations,
            classification: harvest,
            stage: (!wires.fault).then_some(self.latched.stage),
            ready: wires.inference.is_some(),
            fault: wires.fault,
            distance_bucket: wires.ranging.distance_bucket,
            trigger: wires.ranging.trigger_active,
            act,
        };

        let mut port = map.driver();
        port.drive(PinRole::SensorClockOut, wires.sensor_clock);
        port.drive(PinRole::TriggerOut, wires.ranging.trigger_active);

        Outputs {
            uo_out: self.layout.compose(&visible),
            uio_out: port.finish(),
            uio_oe: map.oe_mask(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RangingState;

    fn ready_wires(result: InferenceResult) -> Wires {
        Wires {
            inference: Some(result),
            ..Wires::default()
        }
    }

    fn harvest() -> InferenceResult {
        InferenceResult {
            classification: true,
            stage: GrowthStage::Ready,
            hidden_activations: 0b1011,
        }
    }

    #[test]
    fn binary_layout_places_bits() {
        let map = PortMap::default();
        let mut arb = OutputArbiter::new(OutputLayout::BinaryV1, None);
        let out = arb.compose(&ready_wires(harvest()), &map);
        assert_eq!(out.uo_out & 0x0F, 0b1011);
        assert!(out.bit(4));
        assert!(out.bit(5));
        assert!(out.bit(6));
        // ready-harvest starts a chirp
        assert!(out.bit(7));

        // ready is a pulse, the result stays latched
        let out = arb.compose(&Wires::default(), &map);
        assert!(!out.bit(5));
        assert!(out.bit(4));
    }

    #[test]
    fn fault_masks_classification_but_not_debug() {
        let map = PortMap::default();
        let mut arb = OutputArbiter::new(OutputLayout::BinaryV1, None);
        let wires = Wires {
            fault: true,
            ..ready_wires(harvest())
        };
        let out = arb.compose(&wires, &map);
        assert_eq!(out.uo_out & 0x0F, 0b1011);
        assert!(!out.bit(4));
        assert!(out.bit(5));
        assert!(!out.bit(6));
        assert!(out.bit(7));
    }

    #[test]
    fn stage_code_layout_shows_fault_code_and_bucket() {
        let map = PortMap::default();
        let mut arb = OutputArbiter::new(OutputLayout::StageCodeV2, None);
        let wires = Wires {
            fault: true,
            ranging: RangingState {
                distance_bucket: 4,
                distance_cm: Some(45),
                ..RangingState::default()
            },
            ..Wires::default()
        };
        let out = arb.compose(&wires, &map);
        assert_eq!(out.uo_out & 0b11, FAULT_STAGE_CODE);
        assert_eq!((out.uo_out >> 4) & 0b111, 4);
    }

    #[test]
    fn one_hot_layout_marks_stage() {
        let map = PortMap::default();
        let mut arb = OutputArbiter::new(OutputLayout::OneHotV3, None);
        let out = arb.compose(&ready_wires(harvest()), &map);
        assert_eq!(out.uo_out & 0b111, 0b100);
        assert!(out.bit(3));
        assert!(!out.bit(4));
    }

    #[test]
    fn close_target_sounds_clearance_alarm() {
        let map = PortMap::default();
        let mut arb = OutputArbiter::new(OutputLayout::BinaryV1, Some(1));
        let wires = Wires {
            ranging: RangingState {
                distance_bucket: 0,
                distance_cm: Some(6),
                ..RangingState::default()
            },
            ..Wires::default()
        };
        assert!(arb.compose(&wires, &map).bit(7));
    }

    #[test]
    fn port_carries_clock_and_trigger_only() {
        let map = PortMap::default();
        let mut arb = OutputArbiter::new(OutputLayout::BinaryV1, None);
        let wires = Wires {
            sensor_clock: true,
            ranging: RangingState {
                trigger_active: true,
                ..RangingState::default()
            },
            ..Wires::default()
        };
        let out = arb.compose(&wires, &map);
        assert_eq!(out.uio_out, 0b0001_0010);
        assert_eq!(out.uio_oe, 0b0001_0010);
    }
}
