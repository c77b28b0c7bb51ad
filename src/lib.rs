//! Client, normalization and insight layer for the IP analytics backend.
//!
//! Fetch with [`client::ApiClient`], or build whole dashboards with
//! [`report::build_report`] / [`report::build_trademark_report`].

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod insight;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod report;

pub use client::ApiClient;
pub use config::Config;
pub use error::ApiError;
