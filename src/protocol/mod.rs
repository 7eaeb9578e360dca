pub mod parser;
pub mod types;

pub use parser::{BridgeLine, parse_line};
pub use types::{Metric, RawMoisture, Reading};
