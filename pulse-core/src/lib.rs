pub mod config;
pub mod ext;
pub mod failure_detector;
