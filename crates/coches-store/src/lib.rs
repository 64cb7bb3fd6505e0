//! Record store for car data.
//!
//! [`CarStore`] is the seam between the HTTP layer and storage. Two backends
//! implement it:
//!
//! - [`MemoryStore`]: an ordered in-process collection behind a `Mutex`.
//! - [`SqliteStore`]: rows in the `coches` table, reached through a pooled
//!   connection checked out per operation.
//!
//! Both assign ids that are unique and strictly increasing for the lifetime
//! of the store.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use coches_types::{Car, CarPatch, NewCar};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("car not found: {0}")]
    NotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("database connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// CRUD primitives over car records, keyed by id.
///
/// Operations are blocking; async callers should run them on a blocking
/// thread.
pub trait CarStore: Send + Sync {
    /// Returns every record in storage order.
    fn list(&self) -> Result<Vec<Car>, StoreError>;

    /// Returns the record with `id`, or [`StoreError::NotFound`].
    fn get(&self, id: i64) -> Result<Car, StoreError>;

    /// Assigns the next id, stores the record and returns it.
    fn insert(&self, new: NewCar) -> Result<Car, StoreError>;

    /// Replaces each field supplied in `patch` and returns the updated
    /// record, or [`StoreError::NotFound`].
    fn update(&self, id: i64, patch: &CarPatch) -> Result<Car, StoreError>;

    /// Removes the record with `id`. Returns whether anything was removed.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

/// The fixed starting set used when a store is seeded.
pub fn seed_cars() -> Vec<NewCar> {
    vec![
        NewCar::new("Toyota", "Corolla", 2018),
        NewCar::new("Ford", "Focus", 2015),
        NewCar::new("Seat", "Ibiza", 2020),
    ]
}
