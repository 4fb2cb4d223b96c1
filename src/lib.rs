//! # Devfolio API Library
//!
//! Developer portfolios, peer vouches, GitHub sync and AI reviews behind a
//! JSON HTTP API.

pub mod auth;
pub mod clients;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod services;
pub mod telemetry;
pub mod validation;
pub use migration;
