//! Request construction and dispatch for the Missive REST API.
//!
//! A batch of loosely typed input items goes through [`params::Fields`]
//! (extraction), a [`handlers::ResourceHandler`] (routing and body mapping)
//! and [`client::ApiClient`] (dispatch); [`runner::run_batch`] drives the
//! loop and isolates per-item failures.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mapper;
pub mod params;
pub mod resource;
pub mod runner;
pub mod schema;

pub use error::{MissiveError, Result};
