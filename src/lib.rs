//! Student performance analytics: per-question test results in, weak subject,
//! topic and cognitive-level breakdowns out.

pub mod config;
pub mod dataset;
pub mod error;
pub mod latest;
pub mod models;
pub mod ranking;
pub mod report;
pub mod search;
pub mod stats;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use dataset::StudentDataset;
pub use error::{AnalyticsError, Result};
