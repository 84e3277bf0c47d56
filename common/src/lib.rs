pub mod float_ext;
pub mod log_setup;
pub mod slot;

pub const EPSILON: f64 = 1e-6;
