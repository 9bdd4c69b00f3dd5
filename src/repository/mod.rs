//! Storage layer: collaborator contracts and their backends

pub mod bookings;
pub mod items;
pub mod memory;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use bookings::BookingStore;
use items::ItemCatalog;
use users::UserDirectory;

/// Container bundling the collaborator contracts the services consume.
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UserDirectory>,
    pub items: Arc<dyn ItemCatalog>,
    pub bookings: Arc<dyn BookingStore>,
}

impl Repository {
    /// Postgres-backed repository, the production default.
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::PgUserDirectory::new(pool.clone())),
            items: Arc::new(items::PgItemCatalog::new(pool.clone())),
            bookings: Arc::new(bookings::PgBookingStore::new(pool)),
        }
    }

    /// Repository over one shared in-memory backend.
    pub fn memory(backend: &memory::MemoryBackend) -> Self {
        Self {
            users: Arc::new(backend.clone()),
            items: Arc::new(backend.clone()),
            bookings: Arc::new(backend.clone()),
        }
    }
}
