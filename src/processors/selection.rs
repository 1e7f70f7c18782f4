//! Spherical region selection over a particle dataset.
//!
//! A [`RegionSelector`] wraps a dataset with a kiddo KD-tree so sphere
//! membership is an O(log n) spatial query rather than a full scan. The
//! selector materializes [`Sample`] records with every requested field
//! resolved up front, plus a derived `index:radius` field holding each
//! particle's distance to the sphere center.

use std::collections::BTreeMap;

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use rayon::prelude::*;
use thiserror::Error;

use crate::core::dataset::{Dataset, FieldId, Sample};

/// Errors that can occur during region selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selection center {center:?} lies outside the dataset domain")]
    OutOfDomain { center: [f64; 3] },

    #[error("invalid radius: {0} (must be positive)")]
    InvalidRadius(f64),

    #[error("dataset has no field '{0}'")]
    UnknownField(FieldId),
}

/// Result type for selection operations.
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Where to center a spherical region.
#[derive(Debug, Clone, PartialEq)]
pub enum Center {
    /// An explicit coordinate in dataset units.
    Point([f64; 3]),
    /// The position of the global maximum of a field (e.g. `gas:density`),
    /// resolved by an explicit pre-pass before any region is built.
    MaxField(FieldId),
}

impl Center {
    /// Center on the densest particle, the common case for halo profiles.
    pub fn max_density() -> Self {
        Center::MaxField(FieldId::gas("density"))
    }
}

/// Spherical region selector backed by a KD-tree over particle positions.
pub struct RegionSelector<'a> {
    dataset: &'a Dataset,
    tree: ImmutableKdTree<f64, 3>,
}

impl<'a> RegionSelector<'a> {
    /// Build the spatial index for a dataset.
    pub fn new(dataset: &'a Dataset) -> Self {
        let tree = ImmutableKdTree::new_from_slice(dataset.positions());
        Self { dataset, tree }
    }

    /// Resolve a [`Center`] to a concrete coordinate.
    ///
    /// For [`Center::MaxField`] this performs a one-time parallel scan for
    /// the field's global maximum and returns that particle's position;
    /// the result is always inside the domain by construction.
    pub fn resolve_center(&self, center: &Center) -> Result<[f64; 3]> {
        match center {
            Center::Point(point) => Ok(*point),
            Center::MaxField(field) => {
                let column = self
                    .dataset
                    .column(field)
                    .ok_or_else(|| SelectionError::UnknownField(field.clone()))?;

                let (max_idx, _) = column
                    .par_iter()
                    .enumerate()
                    .map(|(i, &v)| (i, v))
                    .reduce(
                        || (0, f64::NEG_INFINITY),
                        |a, b| if b.1 > a.1 { b } else { a },
                    );

                Ok(self.dataset.positions()[max_idx])
            }
        }
    }

    /// Select all particles within `radius` of `center`.
    ///
    /// Each returned sample carries the requested `fields`, a weight read
    /// from `weight_field`, and a derived `index:radius` field with the
    /// particle's Euclidean distance to `center`. The caller must supply
    /// `center` and `radius` in the dataset's own unit system; no
    /// conversion is attempted.
    ///
    /// # Errors
    ///
    /// * [`SelectionError::InvalidRadius`] if `radius <= 0` or non-finite.
    /// * [`SelectionError::OutOfDomain`] if `center` lies outside the
    ///   dataset's bounding box.
    /// * [`SelectionError::UnknownField`] if the dataset lacks a requested
    ///   field or the weight field.
    pub fn select(
        &self,
        center: [f64; 3],
        radius: f64,
        fields: &[FieldId],
        weight_field: &FieldId,
    ) -> Result<Vec<Sample>> {
        if !(radius > 0.0) || !radius.is_finite() {
            return Err(SelectionError::InvalidRadius(radius));
        }
        if !self.dataset.domain().contains(&center) {
            return Err(SelectionError::OutOfDomain { center });
        }

        // Resolve columns once so a bad field spec fails before any work.
        let columns: Vec<(&FieldId, &[f64])> = fields
            .iter()
            .map(|field| {
                self.dataset
                    .column(field)
                    .map(|col| (field, col))
                    .ok_or_else(|| SelectionError::UnknownField(field.clone()))
            })
            .collect::<Result<_>>()?;
        let weights = self
            .dataset
            .column(weight_field)
            .ok_or_else(|| SelectionError::UnknownField(weight_field.clone()))?;

        let mut hits = self.tree.within::<SquaredEuclidean>(&center, radius * radius);
        // Deterministic sample order regardless of tree layout
        hits.sort_by(|a, b| a.item.cmp(&b.item));

        let samples = hits
            .iter()
            .map(|nn| {
                let idx = nn.item as usize;
                let mut sample_fields: BTreeMap<FieldId, f64> = columns
                    .iter()
                    .map(|(field, col)| ((*field).clone(), col[idx]))
                    .collect();
                sample_fields.insert(FieldId::radius(), nn.distance.sqrt());
                Sample::new(self.dataset.positions()[idx], sample_fields, weights[idx])
            })
            .collect();

        Ok(samples)
    }
}
