//! Weighted radial profiling pipeline for particle datasets.
//!
//! This crate provides tools for:
//! - Loading particle tables (positions plus named scalar fields) from CSV
//! - Selecting spherical regions with a KD-tree spatial index
//! - Computing weighted 1D profiles with streaming mean and standard
//!   deviation (parallelized)
//! - Rendering profile curves to PNG
//!
//! # Example
//!
//! ```no_run
//! use radial_profile::core::loaders::load_particle_csv;
//! use radial_profile::core::dataset::FieldId;
//! use radial_profile::processors::profile::{weighted_profile, BinSpacing, ProfileRequest};
//! use radial_profile::processors::selection::{Center, RegionSelector};
//!
//! let dataset = load_particle_csv("galaxy.csv".as_ref()).unwrap();
//! let selector = RegionSelector::new(&dataset);
//! let center = selector.resolve_center(&Center::max_density()).unwrap();
//! let samples = selector
//!     .select(center, 1000.0, &[FieldId::gas("density")], &FieldId::gas("mass"))
//!     .unwrap();
//!
//! let profile = weighted_profile(
//!     &samples,
//!     &ProfileRequest {
//!         bin_field: FieldId::radius(),
//!         value_field: FieldId::gas("density"),
//!         weight_field: None,
//!         extrema: (0.1, 1000.0),
//!         n_bins: 64,
//!         spacing: BinSpacing::Log,
//!     },
//! )
//! .unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{BinningConfig, PipelineConfig, PlotConfig, SelectionConfig};
pub use core::dataset::{Dataset, DomainBounds, FieldId, Sample};
pub use processors::profile::{Profile, ProfileError};
pub use processors::selection::{Center, RegionSelector, SelectionError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
