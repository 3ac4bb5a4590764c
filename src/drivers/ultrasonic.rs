// GrowWatch: Ultrasonic Ranging Controller
//
// Trigger -> wait for echo -> time echo -> distance bucket. Runs on its own
// cadence, independent of camera frames. One ranging cycle at a time.

use crate::config::*;
use crate::events::{RangingReading, RangingState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangerState {
    #[default]
    Idle,
    Triggering { remaining: u32 },
    WaitEchoRise { waited: u32 },
    TimingEcho { count: u32 },
}

/// Convert an echo width in cycles to centimetres and a bucket.
pub fn reading_from_echo(echo_cycles: u32) -> RangingReading {
    let cm = ((u64::from(echo_cycles) * u64::from(CM_PER_CYCLE_Q16)) >> 16) as u32;
    let bucket = (cm / BUCKET_WIDTH_CM).min(u32::from(MAX_TARGET_BUCKET)) as u8;
    RangingReading::Target {
        echo_cycles,
        distance_cm: cm.min(u32::from(u16::MAX)) as u16,
        bucket,
    }
}

#[derive(Debug, Default)]
pub struct UltrasonicRanger {
    state: RangerState,
    idle_cycles: u32,
    request: bool,
    last: Option<RangingReading>,
}

impl UltrasonicRanger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RangerState {
        self.state
    }

    /// Ask for a ranging cycle on the next tick. Ignored unless idle.
    pub fn request(&mut self) {
        if self.state == RangerState::Idle {
            self.request = true;
        } else {
            log::debug!("ranging request ignored, cycle in flight ({:?})", self.state);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance one tick with the sampled echo level.
    pub fn step(&mut self, echo: bool) -> RangingState {
        let mut completed = None;

        self.state = match self.state {
            RangerState::Idle => {
                self.idle_cycles = self.idle_cycles.saturating_add(1);
                if self.request || self.idle_cycles >= RANGING_PERIOD_CYCLES {
                    self.request = false;
                    self.idle_cycles = 0;
                    RangerState::Triggering {
                        remaining: TRIGGER_PULSE_CYCLES,
                    }
                } else {
                    RangerState::Idle
                }
            }
            RangerState::Triggering { remaining } => {
                if remaining > 1 {
                    RangerState::Triggering {
                        remaining: remaining - 1,
                    }
                } else {
                    RangerState::WaitEchoRise { waited: 0 }
                }
            }
            RangerState::WaitEchoRise { waited } => {
                if echo {
                    RangerState::TimingEcho { count: 1 }
                } else if waited + 1 >= ECHO_RISE_TIMEOUT_CYCLES {
                    log::debug!("no echo within {} cycles", ECHO_RISE_TIMEOUT_CYCLES);
                    completed = Some(RangingReading::NoTarget);
                    RangerState::Idle
                } else {
                    RangerState::WaitEchoRise { waited: waited + 1 }
                }
            }
            RangerState::TimingEcho { count } => {
                if !echo {
                    let reading = reading_from_echo(count);
                    log::debug!("echo {} cycles -> {:?}", count, reading);
                    completed = Some(reading);
                    RangerState::Idle
                } else if count >= ECHO_MAX_CYCLES {
                    log::debug!("echo held past {} cycles, no target", ECHO_MAX_CYCLES);
                    completed = Some(RangingReading::NoTarget);
                    RangerState::Idle
                } else {
                    RangerState::TimingEcho { count: count + 1 }
                }
            }
        };

        if completed.is_some() {
            self.last = completed;
        }

        let (distance_bucket, distance_cm) = match self.last {
            Some(RangingReading::Target {
                distance_cm, bucket, ..
            }) => (bucket, Some(distance_cm)),
            _ => (NO_TARGET_BUCKET, None),
        };

        RangingState {
            trigger_active: matches!(self.state, RangerState::Triggering { .. }),
            echo_timer: match self.state {
                RangerState::TimingEcho { count } => count,
                _ => 0,
            },
            distance_bucket,
            distance_cm,
            completed,
        }
    }
}
