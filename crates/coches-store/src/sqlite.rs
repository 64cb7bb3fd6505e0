//! SQLite-backed car store.

use coches_db::DbPool;
use coches_types::{Car, CarPatch, NewCar};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{CarStore, StoreError};

/// Car records persisted in the `coches` table.
///
/// Each operation checks out one connection from the pool and returns it
/// when the operation finishes, whatever the outcome. The table must exist;
/// run [`coches_db::run_migrations`] first.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts `cars` only if the table is empty. Returns how many rows were
    /// inserted.
    pub fn seed_if_empty(&self, cars: &[NewCar]) -> Result<usize, StoreError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM coches", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }

        for car in cars {
            insert_row(&tx, car)?;
        }
        tx.commit()?;

        tracing::info!(count = cars.len(), "seeded coches table");
        Ok(cars.len())
    }
}

impl CarStore for SqliteStore {
    fn list(&self) -> Result<Vec<Car>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id, marca, modelo, anio FROM coches ORDER BY id ASC")?;

        let rows = stmt.query_map([], map_row_to_car)?;
        let mut cars = Vec::new();
        for row in rows {
            cars.push(row?);
        }
        Ok(cars)
    }

    fn get(&self, id: i64) -> Result<Car, StoreError> {
        let conn = self.pool.get()?;
        select_car(&conn, id)
    }

    fn insert(&self, new: NewCar) -> Result<Car, StoreError> {
        let conn = self.pool.get()?;
        let id = insert_row(&conn, &new)?;
        tracing::debug!(id, "inserted car row");
        Ok(Car::from_new(id, new))
    }

    /// Builds a single `UPDATE` from the supplied fields and reads the row
    /// back inside the same transaction.
    fn update(&self, id: i64, patch: &CarPatch) -> Result<Car, StoreError> {
        let mut conn = self.pool.get()?;
        if patch.is_empty() {
            return select_car(&conn, id);
        }

        let mut set_parts: Vec<String> = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();

        if let Some(marca) = &patch.marca {
            values.push(marca);
            set_parts.push(format!("marca = ?{}", values.len()));
        }
        if let Some(modelo) = &patch.modelo {
            values.push(modelo);
            set_parts.push(format!("modelo = ?{}", values.len()));
        }
        if let Some(anio) = &patch.anio {
            values.push(anio);
            set_parts.push(format!("anio = ?{}", values.len()));
        }

        values.push(&id);
        let sql = format!(
            "UPDATE coches SET {} WHERE id = ?{}",
            set_parts.join(", "),
            values.len()
        );

        let tx = conn.transaction()?;
        let count = tx.execute(&sql, values.as_slice())?;
        if count == 0 {
            return Err(StoreError::NotFound(id));
        }
        let car = select_car(&tx, id)?;
        tx.commit()?;
        Ok(car)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let count = conn.execute("DELETE FROM coches WHERE id = ?1", [id])?;
        Ok(count > 0)
    }
}

fn insert_row(conn: &Connection, car: &NewCar) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO coches (marca, modelo, anio) VALUES (?1, ?2, ?3)",
        params![car.marca, car.modelo, car.anio],
    )?;
    Ok(conn.last_insert_rowid())
}

fn select_car(conn: &Connection, id: i64) -> Result<Car, StoreError> {
    conn.query_row(
        "SELECT id, marca, modelo, anio FROM coches WHERE id = ?1",
        [id],
        map_row_to_car,
    )
    .optional()?
    .ok_or(StoreError::NotFound(id))
}

fn map_row_to_car(row: &Row) -> rusqlite::Result<Car> {
    Ok(Car {
        id: row.get(0)?,
        marca: row.get(1)?,
        modelo: row.get(2)?,
        anio: row.get(3)?,
    })
}
