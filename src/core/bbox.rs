// Bounding box value: four edges plus an optional coordinate reference system.
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_CRS: &str = "EPSG:4326";

#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub minx: f64,
    pub maxx: f64,
    pub miny: f64,
    pub maxy: f64,
    pub crs: Option<String>,
}

impl BoundingBox {
    pub fn new(minx: f64, maxx: f64, miny: f64, maxy: f64, crs: Option<String>) -> Self {
        Self {
            minx,
            maxx,
            miny,
            maxy,
            crs,
        }
    }

    /// Whole-world extent in geographic coordinates.
    pub fn world() -> Self {
        Self::new(-180.0, 180.0, -90.0, 90.0, Some(DEFAULT_CRS.to_string()))
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.minx, self.maxx, self.miny, self.maxy)?;
        if let Some(crs) = &self.crs {
            write!(f, ",{crs}")?;
        }
        Ok(())
    }
}

/// Parses `minx,maxx,miny,maxy[,crs]`.
impl FromStr for BoundingBox {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("bounds must be minx,maxx,miny,maxy[,crs]"));
        }
        let mut edges = [0.0f64; 4];
        for (edge, part) in edges.iter_mut().zip(&parts) {
            *edge = part.parse().map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid bounds coordinate: {part}"))
                    .with_source(err)
            })?;
        }
        let crs = parts
            .get(4)
            .filter(|crs| !crs.is_empty())
            .map(|crs| crs.to_string());
        Ok(Self::new(edges[0], edges[1], edges[2], edges[3], crs))
    }
}
