//! CLI command implementations.

pub mod check_artifacts;
mod device;
pub mod fit_scalers;
pub mod predict;
pub mod recommend;

pub use device::init_device;
