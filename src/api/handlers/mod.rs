pub mod calibration;
pub mod live;
pub mod page;
pub mod readings;
