pub mod calibration_session;
pub mod calibrator;
pub mod poll_loop;
pub mod sink;
pub mod state;

pub use state::SharedState;
