//! Liver-risk forecaster.
//!
//! Predicts triglycerides and GGT from two weeks of wearable data and the
//! user's same-day profile, and turns a logged meal into a recommendation for
//! a healthier alternative.

pub mod api;
pub mod commands;
pub mod context;
pub mod error;
pub mod predict;
pub mod recommend;

pub use context::{PredictionContext, RecommendationContext};
pub use error::{ServiceError, StatusClass};
