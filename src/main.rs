//! pi-timelapse - exposure-controlled time-lapse daemon.

use anyhow::Context;
use clap::Parser;
use pi_timelapse::{
    CameraDevice, CameraError, Cli, FrameStore, Timelapse, TimelapseConfig, V4L2Device,
};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exit status when the output directory is missing.
const EXIT_NO_OUTPUT_DIR: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let device_index = cli.device;
    let config = cli.into_config();

    let store = match FrameStore::open(&config.output_dir) {
        Ok(store) => store,
        Err(err @ CameraError::OutputDirMissing(_)) => {
            log::error!("{err}");
            return ExitCode::from(EXIT_NO_OUTPUT_DIR);
        }
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match run(device_index, config, store) {
        Ok(()) => {
            log::info!("Closing...");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(device_index: u32, config: TimelapseConfig, store: FrameStore) -> anyhow::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        log::info!("stop signal received, finishing current frame");
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("install signal handler")?;

    let device = V4L2Device::open(device_index)
        .with_context(|| format!("open /dev/video{device_index}"))?;
    log::info!(
        "Device: {} ({})",
        device.capabilities().card,
        device.capabilities().driver
    );

    let mut timelapse = Timelapse::new(device, config, store).context("start capture")?;
    timelapse.run(&stop).context("capture loop")?;
    Ok(())
}
