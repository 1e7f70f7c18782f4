//! Derived quantities over a selected region.
//!
//! Mirrors the handful of reductions a radial-profile workflow needs
//! before binning: total mass, center of mass, bulk velocity, and the
//! derived velocity-magnitude field (optionally measured relative to the
//! region's bulk motion so infall speeds are not swamped by the halo's
//! own drift).

use thiserror::Error;

use crate::core::dataset::{FieldId, Sample};

/// Errors from region-quantity reductions.
#[derive(Debug, Error)]
pub enum QuantityError {
    #[error("sample is missing required field '{0}'")]
    MissingField(FieldId),

    #[error("region carries no weight (empty selection or all-zero weights)")]
    EmptyRegion,
}

/// Result type for quantity reductions.
pub type Result<T> = std::result::Result<T, QuantityError>;

/// The three velocity component fields, in axis order.
pub fn velocity_fields() -> [FieldId; 3] {
    [
        FieldId::gas("velocity_x"),
        FieldId::gas("velocity_y"),
        FieldId::gas("velocity_z"),
    ]
}

/// Sum of sample weights (total mass when the weight is mass).
pub fn total_weight(samples: &[Sample]) -> f64 {
    samples.iter().map(|s| s.weight).sum()
}

/// Weight-weighted mean position of the region.
pub fn center_of_mass(samples: &[Sample]) -> Result<[f64; 3]> {
    let total = total_weight(samples);
    if total == 0.0 {
        return Err(QuantityError::EmptyRegion);
    }

    let mut acc = [0.0f64; 3];
    for sample in samples {
        for axis in 0..3 {
            acc[axis] += sample.weight * sample.position[axis];
        }
    }
    Ok(acc.map(|v| v / total))
}

/// Weight-weighted mean velocity of the region.
///
/// # Errors
///
/// * [`QuantityError::MissingField`] if a sample lacks a velocity
///   component.
/// * [`QuantityError::EmptyRegion`] if the total weight is zero.
pub fn bulk_velocity(samples: &[Sample]) -> Result<[f64; 3]> {
    let fields = velocity_fields();
    let total = total_weight(samples);
    if total == 0.0 {
        return Err(QuantityError::EmptyRegion);
    }

    let mut acc = [0.0f64; 3];
    for sample in samples {
        for (axis, field) in fields.iter().enumerate() {
            let v = sample
                .field(field)
                .ok_or_else(|| QuantityError::MissingField(field.clone()))?;
            acc[axis] += sample.weight * v;
        }
    }
    Ok(acc.map(|v| v / total))
}

/// Attach a derived `gas:velocity_magnitude` field to every sample.
///
/// When `bulk` is given, magnitudes are computed in the frame moving with
/// that velocity; pass the result of [`bulk_velocity`] to profile motion
/// relative to the region itself.
pub fn attach_velocity_magnitude(samples: &mut [Sample], bulk: Option<[f64; 3]>) -> Result<()> {
    let fields = velocity_fields();
    let frame = bulk.unwrap_or([0.0; 3]);
    let magnitude_field = FieldId::gas("velocity_magnitude");

    for sample in samples.iter_mut() {
        let mut sum_sq = 0.0;
        for (axis, field) in fields.iter().enumerate() {
            let v = sample
                .field(field)
                .ok_or_else(|| QuantityError::MissingField(field.clone()))?;
            let rel = v - frame[axis];
            sum_sq += rel * rel;
        }
        sample.set_field(magnitude_field.clone(), sum_sq.sqrt());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn moving_sample(position: [f64; 3], velocity: [f64; 3], weight: f64) -> Sample {
        let mut fields = BTreeMap::new();
        for (field, v) in velocity_fields().into_iter().zip(velocity) {
            fields.insert(field, v);
        }
        Sample::new(position, fields, weight)
    }

    #[test]
    fn test_total_weight() {
        let samples = vec![
            moving_sample([0.0; 3], [0.0; 3], 1.0),
            moving_sample([0.0; 3], [0.0; 3], 2.5),
        ];
        assert_eq!(total_weight(&samples), 3.5);
    }

    #[test]
    fn test_center_of_mass_weighted() {
        let samples = vec![
            moving_sample([0.0, 0.0, 0.0], [0.0; 3], 1.0),
            moving_sample([4.0, 0.0, 0.0], [0.0; 3], 3.0),
        ];
        let com = center_of_mass(&samples).unwrap();
        assert!((com[0] - 3.0).abs() < 1e-12);
        assert_eq!(com[1], 0.0);
    }

    #[test]
    fn test_bulk_velocity_weighted_mean() {
        let samples = vec![
            moving_sample([0.0; 3], [10.0, 0.0, 0.0], 1.0),
            moving_sample([0.0; 3], [20.0, 0.0, 0.0], 1.0),
        ];
        let bulk = bulk_velocity(&samples).unwrap();
        assert!((bulk[0] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_bulk_velocity_empty_region() {
        let samples = vec![moving_sample([0.0; 3], [1.0; 3], 0.0)];
        assert!(matches!(
            bulk_velocity(&samples).unwrap_err(),
            QuantityError::EmptyRegion
        ));
        assert!(matches!(
            bulk_velocity(&[]).unwrap_err(),
            QuantityError::EmptyRegion
        ));
    }

    #[test]
    fn test_bulk_velocity_missing_component() {
        let samples = vec![Sample::new([0.0; 3], BTreeMap::new(), 1.0)];
        assert!(matches!(
            bulk_velocity(&samples).unwrap_err(),
            QuantityError::MissingField(_)
        ));
    }

    #[test]
    fn test_attach_velocity_magnitude() {
        let mut samples = vec![moving_sample([0.0; 3], [3.0, 4.0, 0.0], 1.0)];
        attach_velocity_magnitude(&mut samples, None).unwrap();

        let mag = samples[0]
            .field(&FieldId::gas("velocity_magnitude"))
            .unwrap();
        assert!((mag - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_attach_velocity_magnitude_relative_to_bulk() {
        let mut samples = vec![
            moving_sample([0.0; 3], [10.0, 0.0, 0.0], 1.0),
            moving_sample([0.0; 3], [20.0, 0.0, 0.0], 1.0),
        ];
        let bulk = bulk_velocity(&samples).unwrap();
        attach_velocity_magnitude(&mut samples, Some(bulk)).unwrap();

        // Both move at 5 relative to the bulk frame
        for sample in &samples {
            let mag = sample.field(&FieldId::gas("velocity_magnitude")).unwrap();
            assert!((mag - 5.0).abs() < 1e-12);
        }
    }
}
