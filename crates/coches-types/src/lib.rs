//! Shared types and request validation for the coches service.
//!
//! This crate defines the single domain entity, [`Car`], together with the
//! two validated inputs the record store accepts: [`NewCar`] for creation
//! and [`CarPatch`] for partial updates. Request bodies are decoded exactly
//! once into one of these, or into a [`ValidationError`] that names every
//! offending key.

mod validation;

pub use validation::{parse_object, ValidationError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The mutable fields of a car, in wire order.
pub const CAR_FIELDS: [&str; 3] = ["marca", "modelo", "anio"];

/// A car record as stored and served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    /// Store-assigned identifier. Never changes after creation.
    pub id: i64,
    /// Make.
    pub marca: String,
    /// Model.
    pub modelo: String,
    /// Model year. `None` is the "unknown" sentinel and serializes as `null`.
    pub anio: Option<i32>,
}

impl Car {
    /// Builds a stored record from validated creation input.
    pub fn from_new(id: i64, new: NewCar) -> Self {
        Self {
            id,
            marca: new.marca,
            modelo: new.modelo,
            anio: new.anio,
        }
    }

    /// Applies every field supplied in `patch`, keeping the rest.
    pub fn apply(&mut self, patch: &CarPatch) {
        if let Some(marca) = &patch.marca {
            self.marca = marca.clone();
        }
        if let Some(modelo) = &patch.modelo {
            self.modelo = modelo.clone();
        }
        if let Some(anio) = patch.anio {
            self.anio = Some(anio);
        }
    }
}

/// Validated input for creating a car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCar {
    pub marca: String,
    pub modelo: String,
    pub anio: Option<i32>,
}

impl NewCar {
    /// Convenience constructor for a car with a known year.
    pub fn new(marca: impl Into<String>, modelo: impl Into<String>, anio: i32) -> Self {
        Self {
            marca: marca.into(),
            modelo: modelo.into(),
            anio: Some(anio),
        }
    }

    /// Decodes a creation body.
    ///
    /// `marca` and `modelo` are always required. `anio` is required when
    /// `require_anio` is set; otherwise a missing or `null` year becomes the
    /// unknown sentinel. Keys outside [`CAR_FIELDS`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFields`] listing every absent
    /// required field, or [`ValidationError::InvalidField`] for the first
    /// field with the wrong type.
    pub fn from_json(
        body: &Map<String, Value>,
        require_anio: bool,
    ) -> Result<Self, ValidationError> {
        let mut missing = Vec::new();
        let marca = validation::string_field(body, "marca")?;
        let modelo = validation::string_field(body, "modelo")?;
        let anio = validation::year_field(body, "anio")?;

        if marca.is_none() {
            missing.push("marca");
        }
        if modelo.is_none() {
            missing.push("modelo");
        }
        if anio.is_none() && require_anio {
            missing.push("anio");
        }

        match (marca, modelo) {
            (Some(marca), Some(modelo)) if missing.is_empty() => Ok(Self {
                marca,
                modelo,
                anio,
            }),
            _ => Err(ValidationError::MissingFields(missing)),
        }
    }
}

/// A validated partial update. At least one field is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarPatch {
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub anio: Option<i32>,
}

impl CarPatch {
    /// Decodes an update body.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyBody`] when the object has no keys.
    /// - [`ValidationError::UnknownFields`] listing every key outside
    ///   [`CAR_FIELDS`].
    /// - [`ValidationError::InvalidField`] when a known key holds `null` or a
    ///   value of the wrong type.
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ValidationError> {
        if body.is_empty() {
            return Err(ValidationError::EmptyBody);
        }

        let unknown: Vec<String> = body
            .keys()
            .filter(|key| !CAR_FIELDS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownFields(unknown));
        }

        for (key, value) in body {
            if value.is_null() {
                return Err(ValidationError::InvalidField {
                    field: key.clone(),
                    reason: "must not be null".to_string(),
                });
            }
        }

        Ok(Self {
            marca: validation::string_field(body, "marca")?,
            modelo: validation::string_field(body, "modelo")?,
            anio: validation::year_field(body, "anio")?,
        })
    }

    /// Returns `true` if no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.marca.is_none() && self.modelo.is_none() && self.anio.is_none()
    }
}
