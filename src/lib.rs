//! GrowWatch: cycle-accurate plant growth-stage controller.
//!
//! The core is a set of small state machines advanced in lock-step, one
//! [`Controller::tick`] per system-clock edge:
//!
//! - **Sensor clock**: divide-by-two clock for the camera.
//! - **Frame sync**: follows frame-valid / line-valid / pixel-clock and
//!   accumulates colour, brightness and tall-row sums per frame.
//! - **Inference**: a binarized (XNOR-popcount) network classifies each
//!   frame's feature vector with a fixed latency.
//! - **Ranging**: an ultrasonic trigger/echo cycle measures distance.
//! - **Fault**: flags a floating camera bus.
//! - **Output**: merges everything onto the output pins.
//!
//! ```rust
//! use growwatch::{Controller, ControllerConfig, Inputs};
//!
//! let mut ctl = Controller::new(ControllerConfig::default())?;
//! for _ in 0..10 {
//!     ctl.tick(Inputs::in_reset());
//! }
//! // one frame-valid pulse with no pixels
//! ctl.tick(Inputs::new(0x20, 0b1000_0000));
//! ctl.tick(Inputs::new(0x20, 0));
//! let ready = (0..100).map(|_| ctl.tick(Inputs::new(0x20, 0))).any(|out| out.bit(5));
//! assert!(ready);
//! # Ok::<(), growwatch::ConfigError>(())
//! ```

pub mod bnn;
pub mod config;
pub mod controller;
pub mod drivers;
pub mod events;
pub mod input;
pub mod port;
pub mod tasks;

pub use bnn::BinarizedNetwork;
pub use config::{CaptureEdge, ConfigError, ControllerConfig, FrameSyncMode};
pub use controller::{Controller, Wires};
pub use events::{ControllerEvent, FeatureVector, GrowthStage, InferenceResult, RangingReading};
pub use input::Inputs;
pub use port::{PinRole, PortMap};
pub use tasks::output::{OutputLayout, Outputs};
