//! WKT encoding for the geometry column.
//!
//! WKT text is the source of truth in storage: it keeps the column
//! human-inspectable and round-trips through `geo-types` without a binary
//! format.

#![allow(clippy::result_large_err)]

use crate::errors::{wkt_error, Result};
use geo_types::Geometry;
use wkt::ToWkt;

/// Parse WKT text into a geometry.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    use std::str::FromStr;
    wkt::Wkt::from_str(text)
        .map_err(|e| wkt_error("parse_wkt", format!("{:?}", e)))
        .and_then(|w| {
            w.try_into()
                .map_err(|e: wkt::conversion::Error| wkt_error("parse_wkt", format!("{:?}", e)))
        })
}

/// Encode a geometry as WKT text.
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    geometry.wkt_string()
}
