#![allow(dead_code)]

use growwatch::config::RESET_MIN_CYCLES;
use growwatch::drivers::camera::Pixel;
use growwatch::{Controller, ControllerConfig, Inputs, Outputs};

pub const ECHO: u8 = 1 << 0;
pub const TRIGGER: u8 = 1 << 1;
pub const XCLK: u8 = 1 << 4;
pub const PCLK: u8 = 1 << 5;
pub const HREF: u8 = 1 << 6;
pub const VSYNC: u8 = 1 << 7;

/// Data byte driven while idle; anything but 0x00 / 0xFF keeps the fault
/// detector quiet.
pub const IDLE_BYTE: u8 = 0x20;

/// Ticks each pixel-clock level is held, i.e. camera clock slower than ours.
pub const PCLK_HOLD: u32 = 2;

pub struct Bench {
    pub ctl: Controller,
    pclk: bool,
    pub last: Outputs,
}

impl Bench {
    pub fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let ctl = Controller::new(config).expect("valid config");
        Self {
            ctl,
            pclk: false,
            last: Outputs::default(),
        }
    }

    pub fn tick(&mut self, ui_in: u8, uio_in: u8) -> Outputs {
        self.last = self.ctl.tick(Inputs::new(ui_in, uio_in));
        self.last
    }

    pub fn hold_reset(&mut self, cycles: u32) -> Vec<Outputs> {
        (0..cycles).map(|_| self.ctl.tick(Inputs::in_reset())).collect()
    }

    /// Reset for the minimum hold and release.
    pub fn reset(&mut self) {
        self.hold_reset(RESET_MIN_CYCLES);
        self.pclk = false;
    }

    pub fn idle(&mut self, cycles: u32) -> Vec<Outputs> {
        (0..cycles).map(|_| self.tick(IDLE_BYTE, 0)).collect()
    }

    fn pclk_bit(&self) -> u8 {
        if self.pclk {
            PCLK
        } else {
            0
        }
    }

    /// Drive one level-mode frame. Returns the output of the end-of-frame
    /// tick (frame-valid low).
    pub fn frame(&mut self, lines: &[Vec<Pixel>]) -> Outputs {
        let format = self.ctl.config().pixel_format;
        self.tick(IDLE_BYTE, VSYNC | self.pclk_bit());
        for line in lines {
            self.tick(IDLE_BYTE, VSYNC | HREF | self.pclk_bit());
            for pixel in line {
                let (first, second) = pixel.encode(&format);
                for byte in [first, second] {
                    self.pclk = !self.pclk;
                    for _ in 0..PCLK_HOLD {
                        self.tick(byte, VSYNC | HREF | self.pclk_bit());
                    }
                }
            }
            self.tick(IDLE_BYTE, VSYNC | self.pclk_bit());
        }
        self.tick(IDLE_BYTE, self.pclk_bit())
    }

    /// Same pixel on every line.
    pub fn uniform_frame(&mut self, pixel: Pixel, width: usize, height: usize) -> Outputs {
        let lines = vec![vec![pixel; width]; height];
        self.frame(&lines)
    }

    /// Tick idle until `done` holds; returns cycles waited and the output.
    pub fn wait_for(&mut self, limit: u32, done: impl Fn(&Outputs) -> bool) -> Option<(u32, Outputs)> {
        for cycle in 1..=limit {
            let out = self.tick(IDLE_BYTE, 0);
            if done(&out) {
                return Some((cycle, out));
            }
        }
        None
    }

    pub fn wait_ready(&mut self, limit: u32) -> Option<(u32, Outputs)> {
        self.wait_for(limit, |out| out.bit(5))
    }

    /// Echo held high for `width` ticks, then released for one tick.
    pub fn echo(&mut self, width: u32) -> Outputs {
        for _ in 0..width {
            self.tick(IDLE_BYTE, ECHO);
        }
        self.tick(IDLE_BYTE, 0)
    }
}

pub fn lush() -> Pixel {
    Pixel {
        red: 0,
        green: 255,
        blue: 0,
    }
}

pub fn sparse() -> Pixel {
    Pixel {
        red: 132,
        green: 65,
        blue: 0,
    }
}
