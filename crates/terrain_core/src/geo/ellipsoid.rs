//! Ellipsoid model for mapping geodetic coordinates to geocentric XYZ.

use glam::{DMat3, DMat4, DVec3};

use crate::constants::{WGS_84_RADIUS_EQUATOR, WGS_84_RADIUS_POLAR};

/// Oblate ellipsoid defined by its equatorial and polar radii.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EllipsoidModel {
  pub radius_equator: f64,
  pub radius_polar: f64,
  eccentricity_squared: f64,
}

impl Default for EllipsoidModel {
  fn default() -> Self {
    Self::new(WGS_84_RADIUS_EQUATOR, WGS_84_RADIUS_POLAR)
  }
}

impl EllipsoidModel {
  pub fn new(radius_equator: f64, radius_polar: f64) -> Self {
    let flattening = (radius_equator - radius_polar) / radius_equator;
    Self {
      radius_equator,
      radius_polar,
      eccentricity_squared: 2.0 * flattening - flattening * flattening,
    }
  }

  /// Geodetic latitude/longitude (radians) and height to geocentric XYZ.
  pub fn lat_long_height_to_xyz(&self, latitude: f64, longitude: f64, height: f64) -> DVec3 {
    let sin_lat = latitude.sin();
    let cos_lat = latitude.cos();
    let n = self.radius_equator / (1.0 - self.eccentricity_squared * sin_lat * sin_lat).sqrt();
    DVec3::new(
      (n + height) * cos_lat * longitude.cos(),
      (n + height) * cos_lat * longitude.sin(),
      (n * (1.0 - self.eccentricity_squared) + height) * sin_lat,
    )
  }

  /// Convenience for destination coordinates: x = longitude, y = latitude,
  /// both in degrees.
  #[inline]
  pub fn degrees_to_xyz(&self, longitude_deg: f64, latitude_deg: f64, height: f64) -> DVec3 {
    self.lat_long_height_to_xyz(latitude_deg.to_radians(), longitude_deg.to_radians(), height)
  }

  /// Surface normal at a geodetic position (radians).
  pub fn up_vector(&self, latitude: f64, longitude: f64) -> DVec3 {
    DVec3::new(
      latitude.cos() * longitude.cos(),
      latitude.cos() * longitude.sin(),
      latitude.sin(),
    )
  }

  /// Columns are east, north, up at a geodetic position (radians).
  pub fn east_north_up(&self, latitude: f64, longitude: f64) -> DMat3 {
    let up = self.up_vector(latitude, longitude);
    let east = DVec3::new(-longitude.sin(), longitude.cos(), 0.0);
    let north = up.cross(east);
    DMat3::from_cols(east, north, up)
  }

  /// Local-to-world matrix for a frame tangent to the surface at a position.
  pub fn local_to_world(&self, latitude: f64, longitude: f64, height: f64) -> DMat4 {
    let origin = self.lat_long_height_to_xyz(latitude, longitude, height);
    let enu = self.east_north_up(latitude, longitude);
    DMat4::from_cols(
      enu.x_axis.extend(0.0),
      enu.y_axis.extend(0.0),
      enu.z_axis.extend(0.0),
      origin.extend(1.0),
    )
  }

  /// Metres per degree of longitude and latitude at a latitude (radians),
  /// using the equatorial radius.
  pub fn metres_per_degree(&self, latitude: f64) -> (f64, f64) {
    let per_degree = self.radius_equator * std::f64::consts::PI / 180.0;
    (per_degree * latitude.cos(), per_degree)
  }
}
