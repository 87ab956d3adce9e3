#![forbid(unsafe_code)]

pub mod config;
pub mod model;
pub mod time;

pub use config::AssessmentConfig;
pub use time::Clock;
