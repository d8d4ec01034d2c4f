use clap::Parser;
use log::{error, info};
use smart_sensor_bridge::config::{Config, ConfigOverrides};
use smart_sensor_bridge::error::BridgeError;
use smart_sensor_bridge::gatt::Advertiser;
use smart_sensor_bridge::gatt::transport::event_channel;
use smart_sensor_bridge::input::simulation::{
    ScenarioHandles, SimulatedSensor, SimulatedTransport, run_central_simulation,
};
use smart_sensor_bridge::peripheral::SensorPeripheral;
use smart_sensor_bridge::scheduler::NotificationScheduler;
use smart_sensor_bridge::sensors::SensorSampler;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::signal;

/// Capacity of the transport event queue.
const EVENT_QUEUE_DEPTH: usize = 32;

#[derive(Parser)]
#[command(name = "smart-sensor-bridge")]
#[command(about = "BLE environmental sensing peripheral (simulated collaborators)")]
struct Cli {
    /// JSON configuration file
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Advertised device name
    #[arg(long)]
    name: Option<String>,

    /// Sensor device to bind
    #[arg(long)]
    sensor: Option<String>,

    /// Sampling period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Sensor settling time after binding, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Do not run the scripted centrals
    #[arg(long)]
    no_simulation: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, BridgeError> {
    let overrides = ConfigOverrides {
        name: cli.name.clone(),
        sensor_name: cli.sensor.clone(),
        period_ms: cli.period_ms,
        settle_delay_ms: cli.settle_ms,
    };
    Config::resolve(
        cli.config.as_deref(),
        |key| std::env::var(key).ok(),
        &overrides,
    )
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();
    info!("Starting smart sensor bridge");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Configuration loaded:");
    info!("  Device Name: {}", config.device.name);
    info!("  Sensor: {}", config.device.sensor_name);
    info!("  Period: {} ms", config.sampling.period_ms);

    let Some(sensor) = SimulatedSensor::bind(&config.device.sensor_name) else {
        error!(
            "{}",
            BridgeError::SensorNotFound(config.device.sensor_name.clone())
        );
        return ExitCode::FAILURE;
    };

    // Sensor needs time to settle after binding
    tokio::time::sleep(config.settle_delay()).await;

    let transport = SimulatedTransport::new();
    let mut peripheral = SensorPeripheral::new(
        SensorSampler::new(sensor),
        transport,
        Advertiser::new(&config.device.name),
        NotificationScheduler::new(config.period()),
    );

    if let Err(e) = peripheral.bring_up().await {
        error!("Bring-up failed, not starting sampling: {}", e);
        return ExitCode::FAILURE;
    }

    // Held for the whole run so the queue stays open without simulated peers
    let (events, receiver) = event_channel(EVENT_QUEUE_DEPTH);
    let simulation = (!cli.no_simulation).then(|| {
        run_central_simulation(events.clone(), ScenarioHandles::from_table(peripheral.table()))
    });

    info!("Smart sensor bridge is running");
    info!("  - Press Ctrl+C to exit");

    peripheral
        .run(receiver, async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    if let Some(task) = simulation {
        task.abort();
    }

    info!(
        "Smart sensor bridge stopped after {} cycles ({} skipped)",
        peripheral.scheduler().cycles(),
        peripheral.scheduler().skipped()
    );
    ExitCode::SUCCESS
}
