// Vibration Monitor — Firmware Entry Point
//
// Boot sequence:
//   1. Initialise logging and load the pipeline configuration.
//   2. Bring up the accelerometer (IIS2DLPC over I2C on the board, a
//      simulated vibration on the host) and verify it answers.
//   3. Move sensor, classifier and reporter into a dedicated pipeline thread
//      and run the sample → classify → vote loop there.
//
// Any sensor, classifier or configuration error stops the pipeline; the
// diagnostic is logged and returned from `main`.

use std::thread;

use vibration_monitor::config::*;
use vibration_monitor::drivers::SensorSource;
use vibration_monitor::ei::EdgeImpulse;
use vibration_monitor::report::WriterReporter;
use vibration_monitor::sampler::Timer;
use vibration_monitor::{init_logging, Pipeline, PipelineError};

fn main() -> anyhow::Result<()> {
    #[cfg(target_os = "espidf")]
    esp_idf_svc::sys::link_patches();

    init_logging();
    log::info!("Vibration monitor starting…");

    let config = load_config();
    config.validate()?;
    log::info!(
        "Axes {:?}, {} Hz, window {} runs, {:?} output",
        config.axes,
        config.sampling_hz,
        config.window_size,
        config.output
    );

    let sensor = open_sensor(&config)?;
    log::info!("Boot complete — entering normal operation");

    // The pipeline owns every stage; nothing is shared with this thread.
    let pipeline = thread::Builder::new()
        .name("pipeline".into())
        .stack_size(STACK_PIPELINE)
        .spawn(move || run_pipeline(&config, sensor))?;

    match pipeline.join() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            log::error!("Pipeline stopped: {}", e);
            Err(e.into())
        }
        Err(_) => anyhow::bail!("pipeline thread panicked"),
    }
}

fn run_pipeline<S: SensorSource>(config: &PipelineConfig, sensor: S) -> Result<(), PipelineError> {
    log::info!("Pipeline task started");
    let mut pipeline = Pipeline::new(
        config,
        sensor,
        Timer::from(config.timer),
        EdgeImpulse::new(),
        WriterReporter::stdout(config.output),
    )?;
    pipeline.run()
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
fn load_config() -> PipelineConfig {
    PipelineConfig::default()
}

#[cfg(target_os = "espidf")]
fn open_sensor(_config: &PipelineConfig) -> anyhow::Result<vibration_monitor::drivers::accel::Iis2dlpc> {
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use vibration_monitor::drivers::accel::Iis2dlpc;

    let peripherals = Peripherals::take()?;

    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA
        peripherals.pins.gpio7, // SCL
        &i2c_config,
    )?;
    log::debug!("I2C up on SDA=GPIO{} SCL=GPIO{}", PIN_I2C_SDA, PIN_I2C_SCL);

    let mut accel = Iis2dlpc::new(i2c);
    accel.probe()?;
    accel.init()?;
    Ok(accel)
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

#[cfg(not(target_os = "espidf"))]
fn load_config() -> PipelineConfig {
    PipelineConfig::from_env()
}

#[cfg(not(target_os = "espidf"))]
fn open_sensor(
    config: &PipelineConfig,
) -> anyhow::Result<vibration_monitor::drivers::sim::SimulatedAccelerometer> {
    use vibration_monitor::drivers::sim::SimulatedAccelerometer;

    log::info!("Simulated accelerometer: {:.1} Hz vibration", config.sim_vibration_hz);
    Ok(SimulatedAccelerometer::new(
        config.sim_vibration_hz,
        SIM_AMPLITUDE,
        SIM_NOISE,
        config.sampling_hz,
        SIM_SEED,
    ))
}
