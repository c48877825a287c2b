//! Coordinate transformation and distance measurement.
//!
//! [`ProjGeodesy`] transforms with `proj4rs` and measures with Karney's
//! geodesic inverse from `geographiclib-rs`. [`GeodesyContext`] picks the
//! metric for a working CRS:
//!
//! - engineering CRS: planar Euclidean distance in CRS units
//! - geographic CRS: ellipsoidal distance on (lon, lat)
//! - projected CRS: transform to the associated geographic CRS first

use geo::Coord;
use geographiclib_rs::{Geodesic, InverseGeodesic};
use proj4rs::Proj;

use crate::crs::{Crs, Ellipsoid};
use crate::models::traits::Geodesy;
use crate::models::types::{Result, RiverDistanceError};

#[derive(Clone, Copy, Debug, Default)]
pub struct ProjGeodesy;

impl ProjGeodesy {
    fn build(crs: &Crs) -> Result<Proj> {
        let definition = crs.definition().ok_or_else(|| {
            RiverDistanceError::Crs("Cannot transform engineering coordinates".into())
        })?;
        Proj::from_proj_string(definition)
            .map_err(|e| RiverDistanceError::Crs(format!("{}: {:?}", crs, e)))
    }

    fn transform_with(
        src: &Proj,
        dst: &Proj,
        coord: Coord<f64>,
        from: &Crs,
        to: &Crs,
    ) -> Result<Coord<f64>> {
        // proj4rs works in radians for geographic coordinates
        let mut point = if from.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        proj4rs::transform::transform(src, dst, &mut point).map_err(|e| {
            RiverDistanceError::Crs(format!(
                "Failed to transform ({}, {}) from {} to {}: {:?}",
                coord.x, coord.y, from, to, e
            ))
        })?;

        Ok(if to.is_geographic() {
            Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            }
        } else {
            Coord {
                x: point.0,
                y: point.1,
            }
        })
    }
}

impl Geodesy for ProjGeodesy {
    fn transform(&self, coord: Coord<f64>, from: &Crs, to: &Crs) -> Result<Coord<f64>> {
        if from == to {
            return Ok(coord);
        }
        check_compatible(from, to)?;
        let src = Self::build(from)?;
        let dst = Self::build(to)?;
        Self::transform_with(&src, &dst, coord, from, to)
    }

    fn transform_all(&self, coords: &mut [Coord<f64>], from: &Crs, to: &Crs) -> Result<()> {
        if from == to || coords.is_empty() {
            return Ok(());
        }
        check_compatible(from, to)?;
        let src = Self::build(from)?;
        let dst = Self::build(to)?;
        for c in coords.iter_mut() {
            *c = Self::transform_with(&src, &dst, *c, from, to)?;
        }
        Ok(())
    }

    fn ellipsoidal_distance(&self, a: Coord<f64>, b: Coord<f64>, ellipsoid: Ellipsoid) -> f64 {
        let geodesic = Geodesic::new(ellipsoid.a, ellipsoid.f);
        geodesic.inverse(a.y, a.x, b.y, b.x)
    }
}

fn is_lon_lat(c: &Coord<f64>) -> bool {
    (-180.0..=180.0).contains(&c.x) && (-90.0..=90.0).contains(&c.y)
}

/// Engineering coordinates cannot be related to a real CRS.
pub fn check_compatible(left: &Crs, right: &Crs) -> Result<()> {
    if left.is_engineering() != right.is_engineering() {
        return Err(RiverDistanceError::CrsMismatch {
            left: left.to_string(),
            right: right.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Metric selection
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metric {
    Planar,
    Ellipsoidal(Ellipsoid),
}

/// Distance measurement bound to one working CRS.
pub struct GeodesyContext<'a> {
    crs: Crs,
    geographic: Option<Crs>,
    metric: Metric,
    geodesy: &'a dyn Geodesy,
}

impl<'a> GeodesyContext<'a> {
    pub fn new(crs: &Crs, geodesy: &'a dyn Geodesy) -> Result<Self> {
        let (metric, geographic) = match crs.ellipsoid() {
            None => (Metric::Planar, None),
            Some(ellipsoid) if crs.is_geographic() => (Metric::Ellipsoidal(ellipsoid), None),
            Some(ellipsoid) => (Metric::Ellipsoidal(ellipsoid), Some(crs.geographic()?)),
        };

        Ok(Self {
            crs: crs.clone(),
            geographic,
            metric,
            geodesy,
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Bring working-CRS coordinates into the space [`Self::measure`] expects.
    ///
    /// Under an ellipsoidal metric every result must be a valid longitude and
    /// latitude, otherwise the geodesic inverse yields NaN.
    pub fn normalise(&self, coords: &mut [Coord<f64>]) -> Result<()> {
        if let Some(geographic) = &self.geographic {
            self.geodesy.transform_all(coords, &self.crs, geographic)?;
        }
        if matches!(self.metric, Metric::Planar) {
            return Ok(());
        }
        match coords.iter().find(|c| !is_lon_lat(c)) {
            Some(c) => Err(RiverDistanceError::Crs(format!(
                "Coordinate ({}, {}) is not a valid longitude/latitude in {}",
                c.x, c.y, self.crs
            ))),
            None => Ok(()),
        }
    }

    /// Distance between two coordinates already passed through [`Self::normalise`].
    pub fn measure(&self, a: Coord<f64>, b: Coord<f64>) -> f64 {
        match self.metric {
            Metric::Planar => (a.x - b.x).hypot(a.y - b.y),
            Metric::Ellipsoidal(ellipsoid) => self.geodesy.ellipsoidal_distance(a, b, ellipsoid),
        }
    }

    /// Distance between two working-CRS coordinates.
    pub fn distance(&self, a: Coord<f64>, b: Coord<f64>) -> Result<f64> {
        let mut pair = [a, b];
        self.normalise(&mut pair)?;
        Ok(self.measure(pair[0], pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_planar_metric_for_engineering_crs() {
        let geodesy = ProjGeodesy;
        let ctx = GeodesyContext::new(&Crs::engineering(), &geodesy).unwrap();

        assert_eq!(ctx.metric(), Metric::Planar);
        let d = ctx.distance(Coord { x: 0.0, y: 0.0 }, Coord { x: 3.0, y: 4.0 }).unwrap();
        assert_abs_diff_eq!(d, 5.0);
    }

    #[test]
    fn test_ellipsoidal_distance_one_degree_of_longitude() {
        let geodesy = ProjGeodesy;
        let ctx = GeodesyContext::new(&Crs::wgs84(), &geodesy).unwrap();

        assert_eq!(ctx.metric(), Metric::Ellipsoidal(Ellipsoid::WGS84));
        // One degree along the equator on WGS84
        let d = ctx.distance(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }).unwrap();
        assert_abs_diff_eq!(d, 111_319.49, epsilon = 0.01);
    }

    #[test]
    fn test_ellipsoidal_distance_nyc_to_la() {
        let geodesy = ProjGeodesy;
        let nyc = Coord { x: -74.0060, y: 40.7128 };
        let la = Coord { x: -118.2437, y: 34.0522 };

        let d = geodesy.ellipsoidal_distance(nyc, la, Ellipsoid::WGS84);
        assert!(d > 3_930_000.0 && d < 3_960_000.0);
    }

    #[test]
    fn test_projected_crs_is_normalised_to_geographic() {
        let geodesy = ProjGeodesy;
        let utm = Crs::parse("EPSG:32631").unwrap();
        let ctx = GeodesyContext::new(&utm, &geodesy).unwrap();

        // 1 km apart along a northing, near the central meridian of zone 31
        let a = Coord { x: 500_000.0, y: 5_000_000.0 };
        let b = Coord { x: 500_000.0, y: 5_001_000.0 };
        let d = ctx.distance(a, b).unwrap();

        // UTM scale factor at the central meridian is 0.9996
        assert_abs_diff_eq!(d, 1000.0 / 0.9996, epsilon = 0.5);
    }

    #[test]
    fn test_transform_roundtrip_utm() {
        let geodesy = ProjGeodesy;
        let utm = Crs::parse("EPSG:32631").unwrap();
        let wgs84 = Crs::wgs84();

        let lonlat = Coord { x: 3.0, y: 45.0 };
        let projected = geodesy.transform(lonlat, &wgs84, &utm).unwrap();
        assert_abs_diff_eq!(projected.x, 500_000.0, epsilon = 0.01);

        let back = geodesy.transform(projected, &utm, &wgs84).unwrap();
        assert_abs_diff_eq!(back.x, lonlat.x, epsilon = 1e-7);
        assert_abs_diff_eq!(back.y, lonlat.y, epsilon = 1e-7);
    }

    #[test]
    fn test_to_geographic() {
        let geodesy = ProjGeodesy;
        let utm = Crs::parse("EPSG:32631").unwrap();

        let lonlat = geodesy
            .to_geographic(Coord { x: 500_000.0, y: 0.0 }, &utm)
            .unwrap();
        assert_abs_diff_eq!(lonlat.x, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(lonlat.y, 0.0, epsilon = 1e-9);

        // Already geographic
        let same = geodesy.to_geographic(lonlat, &Crs::wgs84()).unwrap();
        assert_eq!(same, lonlat);
    }

    #[test]
    fn test_metre_coordinates_in_geographic_crs_are_rejected() {
        let geodesy = ProjGeodesy;
        let ctx = GeodesyContext::new(&Crs::wgs84(), &geodesy).unwrap();

        let a = Coord { x: 500_000.0, y: 5_000_000.0 };
        let b = Coord { x: 500_100.0, y: 5_000_100.0 };
        let err = ctx.distance(a, b).unwrap_err();
        assert!(matches!(err, RiverDistanceError::Crs(ref m) if m.contains("500000")));

        // Range bounds are inclusive
        let d = ctx
            .distance(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 })
            .unwrap();
        assert!(d.is_finite());
    }

    #[test]
    fn test_planar_metric_accepts_any_range() {
        let geodesy = ProjGeodesy;
        let ctx = GeodesyContext::new(&Crs::engineering(), &geodesy).unwrap();

        let a = Coord { x: 500_000.0, y: 5_000_000.0 };
        let b = Coord { x: 500_000.0, y: 5_000_100.0 };
        assert_abs_diff_eq!(ctx.distance(a, b).unwrap(), 100.0);
    }

    #[test]
    fn test_engineering_mismatch() {
        let geodesy = ProjGeodesy;
        let err = geodesy
            .transform(Coord { x: 0.0, y: 0.0 }, &Crs::engineering(), &Crs::wgs84())
            .unwrap_err();
        assert!(matches!(err, RiverDistanceError::CrsMismatch { .. }));
    }
}
