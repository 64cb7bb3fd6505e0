//! In-process car store.

use std::sync::{Mutex, MutexGuard};

use coches_types::{Car, CarPatch, NewCar};

use crate::{seed_cars, CarStore, StoreError};

#[derive(Debug)]
struct Inner {
    cars: Vec<Car>,
    next_id: i64,
}

/// An ordered in-memory collection of cars.
///
/// All operations hold the lock for their full duration, so concurrent
/// requests never lose updates. Ids come from a monotonic counter and are
/// not reused after a delete.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_cars(Vec::new())
    }

    /// Creates a store holding [`seed_cars`] with ids `1..=3`.
    pub fn seeded() -> Self {
        let cars = seed_cars()
            .into_iter()
            .zip(1..)
            .map(|(new, id)| Car::from_new(id, new))
            .collect();
        Self::with_cars(cars)
    }

    /// Creates a store from existing records. The next id is one past the
    /// largest id present.
    pub fn with_cars(cars: Vec<Car>) -> Self {
        let next_id = cars.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        Self {
            inner: Mutex::new(Inner { cars, next_id }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CarStore for MemoryStore {
    fn list(&self) -> Result<Vec<Car>, StoreError> {
        Ok(self.lock()?.cars.clone())
    }

    fn get(&self, id: i64) -> Result<Car, StoreError> {
        self.lock()?
            .cars
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn insert(&self, new: NewCar) -> Result<Car, StoreError> {
        let mut inner = self.lock()?;
        let id = inner.next_id;
        inner.next_id += 1;

        let car = Car::from_new(id, new);
        inner.cars.push(car.clone());
        tracing::debug!(id, "inserted car into memory store");
        Ok(car)
    }

    fn update(&self, id: i64, patch: &CarPatch) -> Result<Car, StoreError> {
        let mut inner = self.lock()?;
        let car = inner
            .cars
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound(id))?;
        car.apply(patch);
        Ok(car.clone())
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.cars.len();
        inner.cars.retain(|c| c.id != id);
        Ok(inner.cars.len() != before)
    }
}
