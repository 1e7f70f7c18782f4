//! Core data model and I/O operations.

pub mod dataset;
pub mod loaders;
pub mod writers;

pub use dataset::{Dataset, DomainBounds, FieldId, Sample};
pub use loaders::{load_particle_csv, load_profile_csv, LoaderError, ProfileTable};
pub use writers::{write_profile_csv, WriteError};
