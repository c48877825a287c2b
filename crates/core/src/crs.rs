//! Coordinate reference systems.
//!
//! A [`Crs`] is either an engineering (unit-less, planar) system or a
//! PROJ-style definition. Definitions are validated by `proj4rs` at
//! construction time; the reference ellipsoid is read from the definition's
//! `+R`, `+a/+b/+rf/+f`, `+ellps` or `+datum` parameters, in that order.

use std::fmt;
use std::sync::Arc;

use crate::models::types::{Result, RiverDistanceError};

// ============================================================================
// Ellipsoid
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis in metres.
    pub a: f64,
    /// Flattening.
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Self = Self::from_inverse_flattening(6_378_137.0, 298.257_223_563);
    pub const GRS80: Self = Self::from_inverse_flattening(6_378_137.0, 298.257_222_101);

    pub const fn from_inverse_flattening(a: f64, rf: f64) -> Self {
        Self { a, f: 1.0 / rf }
    }

    pub const fn sphere(radius: f64) -> Self {
        Self { a: radius, f: 0.0 }
    }

    pub fn from_axes(a: f64, b: f64) -> Self {
        Self { a, f: (a - b) / a }
    }

    /// Look up a PROJ `+ellps=` name.
    pub fn from_name(name: &str) -> Option<Self> {
        let e = match name {
            "WGS84" => Self::WGS84,
            "GRS80" => Self::GRS80,
            "WGS72" => Self::from_inverse_flattening(6_378_135.0, 298.26),
            "intl" => Self::from_inverse_flattening(6_378_388.0, 297.0),
            "bessel" => Self::from_inverse_flattening(6_377_397.155, 299.152_812_8),
            "clrk66" => Self::from_axes(6_378_206.4, 6_356_583.8),
            "clrk80" => Self::from_inverse_flattening(6_378_249.145, 293.465),
            "clrk80ign" => Self::from_inverse_flattening(6_378_249.2, 293.466_021_293_626_5),
            "krass" => Self::from_inverse_flattening(6_378_245.0, 298.3),
            "airy" => Self::from_inverse_flattening(6_377_563.396, 299.324_964_6),
            "mod_airy" => Self::from_axes(6_377_340.189, 6_356_034.446),
            "aust_SA" => Self::from_inverse_flattening(6_378_160.0, 298.25),
            _ => return None,
        };
        Some(e)
    }

    /// Look up the ellipsoid of a PROJ `+datum=` name.
    pub fn from_datum(datum: &str) -> Option<Self> {
        let ellps = match datum {
            "WGS84" => "WGS84",
            "NAD83" | "GGRS87" => "GRS80",
            "NAD27" => "clrk66",
            "OSGB36" => "airy",
            "potsdam" | "hermannskogel" => "bessel",
            "carthage" => "clrk80ign",
            "ire65" => "mod_airy",
            "nzgd49" => "intl",
            _ => return None,
        };
        Self::from_name(ellps)
    }
}

// ============================================================================
// CRS
// ============================================================================

#[derive(Debug)]
struct ProjCrs {
    label: String,
    definition: String,
    ellipsoid: Ellipsoid,
    geographic: bool,
}

#[derive(Clone, Debug)]
enum CrsKind {
    Engineering,
    Proj(Arc<ProjCrs>),
}

#[derive(Clone, Debug)]
pub struct Crs {
    kind: CrsKind,
}

/// Parameters that carry over to the geographic counterpart of a projection.
const DATUM_KEYS: [&str; 10] = [
    "ellps", "datum", "towgs84", "nadgrids", "a", "b", "rf", "f", "R", "pm",
];

impl Crs {
    /// Unit-less planar coordinates. Distances are Euclidean in CRS units.
    pub fn engineering() -> Self {
        Self {
            kind: CrsKind::Engineering,
        }
    }

    pub fn wgs84() -> Self {
        Self {
            kind: CrsKind::Proj(Arc::new(ProjCrs {
                label: "EPSG:4326".into(),
                definition: "+proj=longlat +datum=WGS84 +no_defs".into(),
                ellipsoid: Ellipsoid::WGS84,
                geographic: true,
            })),
        }
    }

    pub fn from_epsg(code: u16) -> Result<Self> {
        let def = crs_definitions::from_code(code)
            .ok_or_else(|| RiverDistanceError::Crs(format!("Unknown EPSG code: {}", code)))?;
        Self::from_definition(format!("EPSG:{}", code), def.proj4)
    }

    pub fn from_proj_string(definition: &str) -> Result<Self> {
        Self::from_definition(definition.trim(), definition)
    }

    /// Parse `EPSG:<code>`, a `+proj=` string, or `engineering`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("engineering") || s.eq_ignore_ascii_case("none") {
            return Ok(Self::engineering());
        }

        if let Some(code) = s
            .strip_prefix("EPSG:")
            .or_else(|| s.strip_prefix("epsg:"))
        {
            let code = code
                .parse::<u16>()
                .map_err(|_| RiverDistanceError::Crs(format!("Invalid EPSG code: {}", s)))?;
            return Self::from_epsg(code);
        }

        if s.starts_with('+') {
            return Self::from_proj_string(s);
        }

        Err(RiverDistanceError::Crs(format!(
            "Unrecognised CRS '{}', expected EPSG:<code>, a +proj string or 'engineering'",
            s
        )))
    }

    fn from_definition(label: impl Into<String>, definition: &str) -> Result<Self> {
        let label = label.into();
        let definition = normalise(definition);

        proj4rs::Proj::from_proj_string(&definition).map_err(|e| {
            RiverDistanceError::Crs(format!("Invalid definition for {}: {:?}", label, e))
        })?;

        let params = parse_params(&definition);
        let projection = param(&params, "proj").unwrap_or("");
        let geographic = matches!(projection, "longlat" | "latlong" | "lonlat" | "latlon");

        Ok(Self {
            kind: CrsKind::Proj(Arc::new(ProjCrs {
                label,
                ellipsoid: ellipsoid_from_params(&params),
                definition,
                geographic,
            })),
        })
    }

    pub fn is_engineering(&self) -> bool {
        matches!(self.kind, CrsKind::Engineering)
    }

    pub fn is_geographic(&self) -> bool {
        match &self.kind {
            CrsKind::Engineering => false,
            CrsKind::Proj(p) => p.geographic,
        }
    }

    pub fn ellipsoid(&self) -> Option<Ellipsoid> {
        match &self.kind {
            CrsKind::Engineering => None,
            CrsKind::Proj(p) => Some(p.ellipsoid),
        }
    }

    /// PROJ definition string, `None` for engineering coordinates.
    pub fn definition(&self) -> Option<&str> {
        match &self.kind {
            CrsKind::Engineering => None,
            CrsKind::Proj(p) => Some(&p.definition),
        }
    }

    pub fn label(&self) -> &str {
        match &self.kind {
            CrsKind::Engineering => "engineering",
            CrsKind::Proj(p) => &p.label,
        }
    }

    /// The geographic CRS sharing this CRS's datum and ellipsoid.
    pub fn geographic(&self) -> Result<Self> {
        match &self.kind {
            CrsKind::Engineering => Err(RiverDistanceError::Crs(
                "An engineering CRS has no geographic counterpart".into(),
            )),
            CrsKind::Proj(p) if p.geographic => Ok(self.clone()),
            CrsKind::Proj(p) => {
                let params = parse_params(&p.definition);
                let mut definition = String::from("+proj=longlat");
                for (key, value) in &params {
                    if DATUM_KEYS.contains(key) {
                        match value {
                            Some(v) => definition.push_str(&format!(" +{}={}", key, v)),
                            None => definition.push_str(&format!(" +{}", key)),
                        }
                    }
                }
                definition.push_str(" +no_defs");
                Self::from_definition(format!("geographic({})", p.label), &definition)
            }
        }
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (CrsKind::Engineering, CrsKind::Engineering) => true,
            (CrsKind::Proj(a), CrsKind::Proj(b)) => {
                Arc::ptr_eq(a, b) || a.definition == b.definition
            }
            _ => false,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn normalise(definition: &str) -> String {
    definition
        .split_whitespace()
        .filter(|token| *token != "+type=crs")
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_params(definition: &str) -> Vec<(&str, Option<&str>)> {
    definition
        .split_whitespace()
        .filter_map(|token| token.strip_prefix('+'))
        .map(|token| match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        })
        .collect()
}

fn param<'a>(params: &[(&'a str, Option<&'a str>)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| *v)
}

fn numeric_param(params: &[(&str, Option<&str>)], key: &str) -> Option<f64> {
    param(params, key).and_then(|v| v.parse::<f64>().ok())
}

fn ellipsoid_from_params(params: &[(&str, Option<&str>)]) -> Ellipsoid {
    if let Some(r) = numeric_param(params, "R") {
        return Ellipsoid::sphere(r);
    }

    if let Some(a) = numeric_param(params, "a") {
        if let Some(rf) = numeric_param(params, "rf") {
            return Ellipsoid::from_inverse_flattening(a, rf);
        }
        if let Some(f) = numeric_param(params, "f") {
            return Ellipsoid { a, f };
        }
        if let Some(b) = numeric_param(params, "b") {
            return Ellipsoid::from_axes(a, b);
        }
        return Ellipsoid::sphere(a);
    }

    param(params, "ellps")
        .and_then(Ellipsoid::from_name)
        .or_else(|| param(params, "datum").and_then(Ellipsoid::from_datum))
        // PROJ's default ellipsoid
        .unwrap_or(Ellipsoid::GRS80)
}
