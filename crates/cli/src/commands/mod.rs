pub mod features;
pub mod predict;
pub mod status;
