//! ShareLoop - Peer-to-peer Item Sharing Server
//!
//! Booking subsystem of the ShareLoop platform: booking creation and
//! approval, conflict detection, state-filtered listings and the
//! nearest-booking aggregation behind the catalog views.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
