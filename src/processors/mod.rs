//! Region selection and profiling.

pub mod profile;
pub mod quantities;
pub mod selection;

// Re-export key types for convenience
pub use profile::{
    weighted_profile, BinAccumulator, BinEdges, BinSpacing, Profile, ProfileAccumulator,
    ProfileError, ProfileRequest,
};
pub use quantities::{
    attach_velocity_magnitude, bulk_velocity, center_of_mass, total_weight, QuantityError,
};
pub use selection::{Center, RegionSelector, SelectionError};
