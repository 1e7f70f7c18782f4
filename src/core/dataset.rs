//! Core data model: field identifiers, datasets, and samples.
//!
//! A [`Dataset`] stores particle data in columnar form: one position array
//! plus one named column per physical field. Field names are typed
//! [`FieldId`] values (namespace + name) so that a missing field is a
//! construction-time error rather than a lookup-time surprise.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Namespace used when a bare field name is given without a `namespace:` prefix.
pub const DEFAULT_NAMESPACE: &str = "gas";

/// Namespace for fields derived from geometry rather than loaded data.
pub const INDEX_NAMESPACE: &str = "index";

/// Errors that can occur when building or extending a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("column '{field}' has {got} values but the dataset has {expected} particles")]
    ColumnLengthMismatch {
        field: FieldId,
        got: usize,
        expected: usize,
    },

    #[error("duplicate column: {0}")]
    DuplicateColumn(FieldId),

    #[error("dataset has no particles")]
    Empty,

    #[error("invalid field identifier: '{0}'")]
    InvalidFieldId(String),
}

/// Typed identifier for a physical field: a namespace plus a name.
///
/// Displays and parses as `namespace:name`; a bare name parses with the
/// [`DEFAULT_NAMESPACE`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId {
    pub namespace: String,
    pub name: String,
}

impl FieldId {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Shorthand for a field in the default (`gas`) namespace.
    pub fn gas(name: &str) -> Self {
        Self::new(DEFAULT_NAMESPACE, name)
    }

    /// The derived radial-distance field attached by region selection.
    pub fn radius() -> Self {
        Self::new(INDEX_NAMESPACE, "radius")
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

impl FromStr for FieldId {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DatasetError::InvalidFieldId(s.to_string()));
        }
        match s.split_once(':') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => {
                Ok(Self::new(ns.trim(), name.trim()))
            }
            Some(_) => Err(DatasetError::InvalidFieldId(s.to_string())),
            None => Ok(Self::new(DEFAULT_NAMESPACE, s)),
        }
    }
}

/// Axis-aligned bounding box of a dataset's particle positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl DomainBounds {
    /// Compute bounds from a non-empty position slice.
    pub fn from_positions(positions: &[[f64; 3]]) -> Option<Self> {
        let first = positions.first()?;
        let mut bounds = Self {
            min: *first,
            max: *first,
        };
        for p in &positions[1..] {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }

    /// Whether a point lies inside the bounds (inclusive on both edges).
    pub fn contains(&self, point: &[f64; 3]) -> bool {
        (0..3).all(|axis| point[axis] >= self.min[axis] && point[axis] <= self.max[axis])
    }
}

/// Columnar particle dataset: positions plus named scalar fields.
#[derive(Debug, Clone)]
pub struct Dataset {
    positions: Vec<[f64; 3]>,
    columns: BTreeMap<FieldId, Vec<f64>>,
    domain: DomainBounds,
}

impl Dataset {
    /// Build a dataset from positions and field columns.
    ///
    /// Every column must have exactly one value per particle, and the
    /// dataset must contain at least one particle (an empty dataset has
    /// no meaningful domain bounds).
    pub fn new(
        positions: Vec<[f64; 3]>,
        columns: BTreeMap<FieldId, Vec<f64>>,
    ) -> Result<Self, DatasetError> {
        let domain = DomainBounds::from_positions(&positions).ok_or(DatasetError::Empty)?;
        let expected = positions.len();
        for (field, column) in &columns {
            if column.len() != expected {
                return Err(DatasetError::ColumnLengthMismatch {
                    field: field.clone(),
                    got: column.len(),
                    expected,
                });
            }
        }
        Ok(Self {
            positions,
            columns,
            domain,
        })
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Particle positions, one `[x, y, z]` per particle.
    #[inline]
    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// Spatial bounding box of all particle positions.
    #[inline]
    pub fn domain(&self) -> DomainBounds {
        self.domain
    }

    /// Look up a field column by identifier.
    pub fn column(&self, field: &FieldId) -> Option<&[f64]> {
        self.columns.get(field).map(Vec::as_slice)
    }

    pub fn has_field(&self, field: &FieldId) -> bool {
        self.columns.contains_key(field)
    }

    /// All field identifiers, in sorted order.
    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.columns.keys()
    }

    /// Add a derived column after construction.
    pub fn add_column(&mut self, field: FieldId, values: Vec<f64>) -> Result<(), DatasetError> {
        if self.columns.contains_key(&field) {
            return Err(DatasetError::DuplicateColumn(field));
        }
        if values.len() != self.positions.len() {
            return Err(DatasetError::ColumnLengthMismatch {
                field,
                got: values.len(),
                expected: self.positions.len(),
            });
        }
        self.columns.insert(field, values);
        Ok(())
    }
}

/// A single selected particle: position, gathered field values, and weight.
///
/// Samples are produced by region selection with every requested field
/// already resolved, so downstream consumers can treat missing fields as
/// a caller misconfiguration rather than a data problem.
#[derive(Debug, Clone)]
pub struct Sample {
    pub position: [f64; 3],
    fields: BTreeMap<FieldId, f64>,
    pub weight: f64,
}

impl Sample {
    pub fn new(position: [f64; 3], fields: BTreeMap<FieldId, f64>, weight: f64) -> Self {
        Self {
            position,
            fields,
            weight,
        }
    }

    /// Value of a gathered field, if present.
    pub fn field(&self, field: &FieldId) -> Option<f64> {
        self.fields.get(field).copied()
    }

    /// Attach or replace a derived field value on this sample.
    pub fn set_field(&mut self, field: FieldId, value: f64) {
        self.fields.insert(field, value);
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.fields.keys()
    }
}
