// GrowWatch: Power-On Self-Test
//
// Sequence:
//   1. Hold reset for the minimum number of cycles.
//   2. Check the camera clock is toggling.
//   3. Pulse frame-valid once and wait for the classifier's ready pulse.
//   4. Run one ranging cycle against a synthetic echo.
//
// Exits non-zero if any step fails. RUST_LOG controls verbosity.

use anyhow::{bail, Context};

use growwatch::config::{RESET_MIN_CYCLES, TRIGGER_PULSE_CYCLES};
use growwatch::{Controller, ControllerConfig, ControllerEvent, Inputs, Outputs, RangingReading};

const XCLK_BIT: u8 = 1 << 4;
const ECHO_BIT: u8 = 1 << 0;
const VSYNC_BIT: u8 = 1 << 7;
const READY_BIT: u8 = 5;
const CLASS_BIT: u8 = 4;

const XCLK_WINDOW_CYCLES: u32 = 50;
const READY_TIMEOUT_CYCLES: u32 = 5_000;
/// ~10 cm at 100 kHz.
const SELF_TEST_ECHO_CYCLES: u32 = 60;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("GrowWatch self-test starting…");

    let mut ctl = Controller::new(ControllerConfig::default()).context("invalid controller configuration")?;
    let events = ctl.subscribe();

    // ---- Step 1: reset ------------------------------------------------------
    for _ in 0..RESET_MIN_CYCLES {
        ctl.tick(Inputs::in_reset());
    }
    ctl.tick(Inputs::default());
    log::info!("Reset complete");

    // ---- Step 2: camera clock ----------------------------------------------
    let mut prev = ctl.tick(Inputs::default()).uio_out & XCLK_BIT;
    let mut toggles = 0;
    for _ in 0..XCLK_WINDOW_CYCLES {
        let now = ctl.tick(Inputs::default()).uio_out & XCLK_BIT;
        if now != prev {
            toggles += 1;
            prev = now;
        }
    }
    if toggles <= 2 {
        bail!("camera clock not toggling ({} edges in {} cycles)", toggles, XCLK_WINDOW_CYCLES);
    }
    log::info!("Camera clock OK ({} edges)", toggles);

    // ---- Step 3: frame -> classifier ---------------------------------------
    ctl.tick(Inputs::new(0, VSYNC_BIT));
    ctl.tick(Inputs::new(0, 0));
    let out = wait_for(&mut ctl, READY_TIMEOUT_CYCLES, |out| out.bit(READY_BIT))
        .context("timeout waiting for classifier ready")?;
    log::info!(
        "Classifier OK: prediction {}, hidden {:04b}",
        u8::from(out.bit(CLASS_BIT)),
        out.uo_out & 0x0F
    );

    // ---- Step 4: ranging ---------------------------------------------------
    ctl.request_ranging();
    wait_for(&mut ctl, TRIGGER_PULSE_CYCLES + 2, |out| out.uio_out & 0b10 != 0)
        .context("ultrasonic trigger never fired")?;
    wait_for(&mut ctl, TRIGGER_PULSE_CYCLES + 2, |out| out.uio_out & 0b10 == 0)
        .context("ultrasonic trigger stuck high")?;
    for _ in 0..SELF_TEST_ECHO_CYCLES {
        ctl.tick(Inputs::new(0x20, ECHO_BIT));
    }
    ctl.tick(Inputs::new(0x20, 0));

    let reading = events.try_iter().find_map(|event| match event {
        ControllerEvent::RangingComplete(reading) => Some(reading),
        _ => None,
    });
    match reading {
        Some(RangingReading::Target { distance_cm, bucket, .. }) => {
            log::info!("Ranging OK: {} cm (bucket {})", distance_cm, bucket);
        }
        Some(RangingReading::NoTarget) => bail!("ranging reported no target for a {}-cycle echo", SELF_TEST_ECHO_CYCLES),
        None => bail!("ranging cycle did not complete"),
    }

    log::info!("Self-test passed after {} cycles", ctl.cycle());
    Ok(())
}

/// Tick with idle inputs until `done` holds, up to `limit` cycles.
fn wait_for(ctl: &mut Controller, limit: u32, done: impl Fn(&Outputs) -> bool) -> Option<Outputs> {
    (0..limit)
        .map(|_| ctl.tick(Inputs::new(0x20, 0)))
        .find(|out| done(out))
}
