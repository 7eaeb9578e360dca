pub mod calibration_file;
pub mod history;

pub use calibration_file::CalibrationStore;
pub use history::HistoryStore;
