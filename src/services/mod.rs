//! Business logic services

pub mod bookings;
pub mod catalog;

use crate::{config::BookingConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub bookings: bookings::BookingsService,
    pub catalog: catalog::CatalogService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, booking_config: &BookingConfig) -> Self {
        let bookings =
            bookings::BookingsService::new(repository.clone(), booking_config.conflict_policy);
        let catalog = catalog::CatalogService::new(repository, bookings.clone());
        Self { bookings, catalog }
    }
}
