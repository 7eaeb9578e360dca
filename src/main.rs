use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{broadcast, watch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod api;
mod config;
mod error;
mod forwarding;
mod processing;
mod protocol;
mod sensor;
mod service;
mod storage;

use api::AppState;
use config::Cli;
use error::MonitorError;
use forwarding::ForwardingClient;
use sensor::serial::SerialSensor;
use service::calibration_session::run_calibration_session;
use service::calibrator::Calibrator;
use service::poll_loop::PollLoop;
use service::sink::{ForwardingSink, LiveSink};
use service::state::create_shared_state;
use storage::{CalibrationStore, HistoryStore};

/// Readings buffered per live client before it starts skipping
const LIVE_CHANNEL_CAPACITY: usize = 32;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with colors and stderr output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soil_monitor=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Handle --list-ports
    if cli.list_ports {
        list_serial_ports();
        return Ok(());
    }

    // Require a mode if not listing ports
    let Some(sensor_config) = cli.to_sensor_config() else {
        eprintln!("Error: Please specify a mode (serial or playback)");
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    };

    let mut sensor = sensor_config.create_sensor();
    sensor.start().await?;

    if cli.calibrate {
        let store = CalibrationStore::new(&cli.calibration_file);
        let result = run_calibration_session(
            sensor.as_mut(),
            cli.poll_interval(),
            cli.save.then_some(&store),
            shutdown_signal(),
        )
        .await;
        sensor.stop().await?;
        result?;
        return Ok(());
    }

    tracing::info!("Starting soil monitor on {}:{}", cli.host, cli.listen);

    let state = create_shared_state(sensor.name());
    let calibrator = Arc::new(Calibrator::load(CalibrationStore::new(
        &cli.calibration_file,
    )));
    let history = match &cli.database {
        Some(path) => Some(HistoryStore::open(path).await?),
        None => None,
    };
    let (live_tx, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);

    // Assemble the poll loop and its sinks
    let outlier_filter = cli.to_outlier_method().create();
    let mut poll_loop = PollLoop::new(
        state.clone(),
        calibrator.clone(),
        outlier_filter,
        cli.to_poll_settings(),
    )
    .with_sink(Arc::new(LiveSink::new(live_tx.clone())));

    if let Some(store) = &history {
        poll_loop = poll_loop.with_sink(Arc::new(store.clone()));
    }
    if let Some(url) = &cli.forward_url {
        let client = ForwardingClient::new(url.clone())?;
        tracing::info!("Forwarding readings to {}", client.url());
        poll_loop = poll_loop.with_sink(Arc::new(ForwardingSink::new(client, sensor.name())));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_handle = tokio::spawn(async move {
        if let Err(e) = poll_loop.run(sensor, shutdown_rx).await {
            tracing::error!("Poll loop error: {}", e);
        }
    });

    // Create and run HTTP server
    let router = api::create_router(AppState {
        monitor: state,
        calibrator,
        history,
        live: live_tx,
    });
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.listen)
        .parse()
        .map_err(|e| MonitorError::Config(format!("Invalid listen address: {}", e)))?;

    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(true);
    poll_handle.await?;

    Ok(())
}

/// List available serial ports
fn list_serial_ports() {
    match SerialSensor::list_available_ports() {
        Ok(ports) => {
            if ports.is_empty() {
                println!("No serial ports found");
            } else {
                println!("Available serial ports:");
                for port in ports {
                    let port_type = match port.port_type {
                        serialport::SerialPortType::UsbPort(info) => {
                            format!(
                                "USB - {}",
                                info.product.unwrap_or_else(|| "Unknown".to_string())
                            )
                        }
                        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                        serialport::SerialPortType::PciPort => "PCI".to_string(),
                        serialport::SerialPortType::Unknown => "Unknown".to_string(),
                    };
                    println!("  {} - {}", port.port_name, port_type);
                }
            }
        }
        Err(e) => {
            eprintln!("Error listing serial ports: {}", e);
        }
    }
}

/// Wait for shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler only killing the process stops us
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
