//! Voxel field, armor catalog, and beam-group helpers.
#![forbid(unsafe_code)]

pub mod beam;
pub mod builder;
pub mod catalog;
pub mod coord;
pub mod field;

pub use beam::{Beam, beams_of};
pub use builder::{ArmorBlock, BuiltField, FieldBuilder, PhantomCell, expand_phantoms};
pub use catalog::{ArmorCatalog, ArmorFamily, CatalogError, MAX_BEAM_LENGTH, VariantInfo};
pub use coord::{Axis, Coord};
pub use field::{COLORS_PER_FAMILY, FieldError, MaterialKey, VoxelField};
