use std::sync::LazyLock;

use regex::Regex;

use super::types::{Metric, RawMoisture};
use crate::error::SensorError;

static MOISTURE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^MOISTURE\s*=\s*(\d+)$").unwrap());

static TEMP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^TEMP\s*=\s*(-?\d+(?:\.\d+)?)$").unwrap());

static ERROR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ERR\s+(MOISTURE|TEMP)\b\s*(.*)$").unwrap());

/// Parsed line variants from the sensor bridge
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeLine {
    /// Moisture reply: MOISTURE=<raw>
    Moisture(RawMoisture),
    /// Temperature reply: TEMP=<celsius>
    Temperature(f64),
    /// Read failure for one metric: ERR <MOISTURE|TEMP> <reason>
    Error { metric: Metric, reason: String },
    /// Bridge finished booting
    Ready,
    /// Unrecognized line
    Unknown(String),
}

impl BridgeLine {
    /// The metric this line answers, if any
    pub fn metric(&self) -> Option<Metric> {
        match self {
            BridgeLine::Moisture(_) => Some(Metric::Moisture),
            BridgeLine::Temperature(_) => Some(Metric::Temperature),
            BridgeLine::Error { metric, .. } => Some(*metric),
            BridgeLine::Ready | BridgeLine::Unknown(_) => None,
        }
    }

    /// Interpret this line as the answer to a moisture query
    pub fn into_moisture(self) -> Result<RawMoisture, SensorError> {
        match self {
            BridgeLine::Moisture(raw) => Ok(raw),
            other => Err(other.into_failure(Metric::Moisture)),
        }
    }

    /// Interpret this line as the answer to a temperature query
    pub fn into_temperature(self) -> Result<f64, SensorError> {
        match self {
            BridgeLine::Temperature(celsius) => Ok(celsius),
            other => Err(other.into_failure(Metric::Temperature)),
        }
    }

    fn into_failure(self, expected: Metric) -> SensorError {
        match self {
            BridgeLine::Error { metric, reason } if metric == expected => {
                SensorError::Device { metric, reason }
            }
            other => SensorError::UnexpectedReply {
                metric: expected,
                line: format!("{:?}", other),
            },
        }
    }
}

/// Parse a single line of bridge output
pub fn parse_line(input: &str) -> BridgeLine {
    let trimmed = input.trim();

    if let Some(caps) = MOISTURE_REGEX.captures(trimmed) {
        // Out-of-range values fall through to Unknown
        if let Ok(raw) = caps[1].parse::<RawMoisture>() {
            return BridgeLine::Moisture(raw);
        }
    }

    if let Some(caps) = TEMP_REGEX.captures(trimmed) {
        if let Ok(celsius) = caps[1].parse::<f64>() {
            return BridgeLine::Temperature(celsius);
        }
    }

    if let Some(caps) = ERROR_REGEX.captures(trimmed) {
        if let Some(metric) = Metric::from_tag(&caps[1]) {
            let reason = caps[2].trim();
            return BridgeLine::Error {
                metric,
                reason: if reason.is_empty() {
                    "unspecified".to_string()
                } else {
                    reason.to_string()
                },
            };
        }
    }

    if trimmed == "READY" {
        return BridgeLine::Ready;
    }

    BridgeLine::Unknown(trimmed.to_string())
}
