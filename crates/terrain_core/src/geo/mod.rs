//! Geospatial value types.
//!
//! - [`extents`]: `GeospatialExtents` - rectangular extent with dateline
//!   handling for geographic data
//! - [`spatial`]: `SpatialProperties`, `GeoTransform`, `CoordinateSystem` -
//!   sampled dataset geometry
//! - [`ellipsoid`]: `EllipsoidModel` - geodetic to geocentric mapping

pub mod ellipsoid;
pub mod extents;
pub mod spatial;

pub use ellipsoid::EllipsoidModel;
pub use extents::GeospatialExtents;
pub use spatial::{CoordinateKind, CoordinateSystem, GeoTransform, SpatialProperties};
