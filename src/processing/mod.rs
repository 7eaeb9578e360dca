pub mod calibration;
pub mod outlier;
pub mod sampler;
