use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::processing::outlier::OutlierMethod;
use crate::processing::sampler::SamplerSettings;
use crate::sensor::SensorConfig;
use crate::service::poll_loop::PollSettings;

#[derive(Parser, Debug)]
#[command(name = "soil-monitor")]
#[command(about = "Soil moisture monitor with self-widening calibration")]
#[command(version)]
pub struct Cli {
    /// HTTP server port
    #[arg(short, long, default_value = "5000")]
    pub listen: u16,

    /// HTTP server host
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Calibration bounds file (TOML)
    #[arg(long, env = "SOIL_CALIBRATION_FILE", default_value = "calibration.toml")]
    pub calibration_file: PathBuf,

    /// SQLite database for the reading history; no history without it
    #[arg(long, env = "SOIL_DATABASE")]
    pub database: Option<PathBuf>,

    /// Collector URL every reading is posted to
    #[arg(long, env = "SOIL_FORWARD_URL")]
    pub forward_url: Option<String>,

    /// Seconds between poll cycles
    #[arg(long, default_value = "5")]
    pub interval: u64,

    /// Readings averaged into one value
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub samples: u32,

    /// Delay between the readings of a batch in milliseconds
    #[arg(long, default_value = "100")]
    pub sample_delay_ms: u64,

    /// Outlier exclusion method
    #[arg(long, value_enum, default_value = "none")]
    pub outlier_method: OutlierMethodArg,

    /// Alpha value for Grubbs test (significance level)
    #[arg(long, default_value = "0.05")]
    pub grubbs_alpha: f64,

    /// Track the raw range from scratch instead of serving; stop with Ctrl+C
    #[arg(long)]
    pub calibrate: bool,

    /// With --calibrate, write the observed range to the calibration file
    #[arg(long, requires = "calibrate")]
    pub save: bool,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Talk to the sensor bridge over a serial port
    Serial(SerialArgs),

    /// Replay a recorded bridge log
    Playback(PlaybackArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SerialArgs {
    /// Serial port device path (e.g., COM3 on Windows, /dev/ttyUSB0 on Linux)
    #[arg(short, long)]
    pub device: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    pub baud: u32,

    /// How long to wait for each reply in milliseconds
    #[arg(long, default_value = "1000")]
    pub timeout_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct PlaybackArgs {
    /// Path to log file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Loop playback when file ends
    #[arg(long, default_value = "false")]
    pub loop_playback: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum OutlierMethodArg {
    /// Average every reading (default)
    #[default]
    None,
    /// Grubbs' test
    Grubbs,
}

impl Cli {
    /// Convert CLI args to SensorConfig
    pub fn to_sensor_config(&self) -> Option<SensorConfig> {
        match &self.mode {
            Some(Mode::Serial(args)) => Some(SensorConfig::Serial {
                port: args.device.clone(),
                baud_rate: args.baud,
                reply_timeout: Duration::from_millis(args.timeout_ms),
            }),
            Some(Mode::Playback(args)) => Some(SensorConfig::Playback {
                log_file: args.file.clone(),
                loop_playback: args.loop_playback,
            }),
            None => None,
        }
    }

    /// Convert CLI args to OutlierMethod
    pub fn to_outlier_method(&self) -> OutlierMethod {
        match self.outlier_method {
            OutlierMethodArg::None => OutlierMethod::None,
            OutlierMethodArg::Grubbs => OutlierMethod::Grubbs {
                alpha: self.grubbs_alpha,
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn to_poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.poll_interval(),
            sampler: SamplerSettings {
                count: self.samples as usize,
                delay: Duration::from_millis(self.sample_delay_ms),
            },
        }
    }
}
