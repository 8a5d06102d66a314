//! Predictive-maintenance analysis: composite health score, remaining useful
//! life extrapolation, and the device status derived from both.

pub mod health;
pub mod rul;
pub mod status;

pub use health::HealthScorer;
pub use rul::{RulEstimate, RulPredictor};
pub use status::classify_device;
