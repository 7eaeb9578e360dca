use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serialport::{ClearBuffer, SerialPort};

use super::SoilSensor;
use crate::error::{MonitorError, SensorError};
use crate::protocol::{BridgeLine, Metric, RawMoisture, parse_line};

/// Per-read timeout of the port itself; the reply timeout spans several of these
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(100);

type BridgePort = BufReader<Box<dyn SerialPort>>;

/// Soil sensor reached through a microcontroller bridge on a serial port
pub struct SerialSensor {
    port_name: String,
    baud_rate: u32,
    reply_timeout: Duration,
    port: Option<Arc<Mutex<BridgePort>>>,
}

impl SerialSensor {
    pub fn new(port_name: String, baud_rate: u32, reply_timeout: Duration) -> Self {
        Self {
            port_name,
            baud_rate,
            reply_timeout,
            port: None,
        }
    }

    /// List available serial ports (helper for CLI)
    pub fn list_available_ports() -> Result<Vec<serialport::SerialPortInfo>, MonitorError> {
        serialport::available_ports().map_err(MonitorError::SerialPort)
    }

    async fn query(&self, metric: Metric) -> Result<BridgeLine, SensorError> {
        let port = self.port.clone().ok_or(SensorError::NotStarted)?;
        let reply_timeout = self.reply_timeout;

        tokio::task::spawn_blocking(move || {
            let mut port = port
                .lock()
                .map_err(|_| SensorError::Transport("serial port lock poisoned".into()))?;
            exchange(&mut *port, metric, reply_timeout)
        })
        .await
        .map_err(|e| SensorError::Transport(e.to_string()))?
    }
}

fn transport(err: std::io::Error) -> SensorError {
    SensorError::Transport(err.to_string())
}

/// Send one query and read lines until the reply for `metric` arrives.
///
/// Lines answering the other metric are stale replies from an earlier timed
/// out query and are skipped.
pub(crate) fn exchange<P: Read + Write>(
    port: &mut BufReader<P>,
    metric: Metric,
    reply_timeout: Duration,
) -> Result<BridgeLine, SensorError> {
    let started = Instant::now();

    writeln!(port.get_mut(), "{}", metric.query()).map_err(transport)?;
    port.get_mut().flush().map_err(transport)?;

    let mut line = String::new();

    loop {
        if started.elapsed() >= reply_timeout {
            return Err(SensorError::Timeout(metric));
        }

        match port.read_line(&mut line) {
            Ok(0) => continue,
            Ok(_) => {
                let parsed = parse_line(&line);
                line.clear();

                match parsed.metric() {
                    Some(answered) if answered == metric => return Ok(parsed),
                    Some(_) => tracing::debug!("Skipping stale reply: {:?}", parsed),
                    None => tracing::trace!("Ignoring bridge line: {:?}", parsed),
                }
            }
            // Partial lines stay in the buffer until the newline arrives
            Err(ref e) if e.kind() == ErrorKind::TimedOut => continue,
            Err(e) => return Err(transport(e)),
        }
    }
}

#[async_trait]
impl SoilSensor for SerialSensor {
    async fn start(&mut self) -> Result<(), MonitorError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(PORT_READ_TIMEOUT)
            .open()?;

        // Drop anything the bridge printed while booting
        port.clear(ClearBuffer::All)?;

        tracing::info!(
            "Serial sensor bridge opened on {} at {} baud",
            self.port_name,
            self.baud_rate
        );

        self.port = Some(Arc::new(Mutex::new(BufReader::new(port))));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), MonitorError> {
        self.port = None;
        tracing::info!("Serial sensor bridge closed");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.port.is_some()
    }

    async fn read_moisture(&mut self) -> Result<RawMoisture, SensorError> {
        self.query(Metric::Moisture).await?.into_moisture()
    }

    async fn read_temperature(&mut self) -> Result<f64, SensorError> {
        self.query(Metric::Temperature).await?.into_temperature()
    }

    fn name(&self) -> &str {
        &self.port_name
    }
}
