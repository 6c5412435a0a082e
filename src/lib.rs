//! Chart lyrics ETL library - shared modules for all binaries.

pub mod chart;
pub mod config;
pub mod error;
pub mod filters;
pub mod genius;
pub mod http;
pub mod join;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod page;
pub mod pipeline;
pub mod progress;
pub mod rapidapi;
pub mod reconcile;
pub mod resolver;
pub mod safety;
pub mod store;
