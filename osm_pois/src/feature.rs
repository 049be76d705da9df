use anyhow::{anyhow, Result};
use geojson::{Feature, Geometry, JsonObject, Value};

/// Serializes a GeoJSON point feature. Coordinates are rounded to 5 decimal places, roughly a
/// meter.
pub fn point_feature(lon: f64, lat: f64, properties: JsonObject) -> Result<String> {
    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![round5(lon), round5(lat)]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };
    Ok(serde_json::to_string(&feature)?)
}

pub fn round5(x: f64) -> f64 {
    // Go through the same formatting used for stored coordinates, so both agree exactly
    format!("{:.5}", x).parse().unwrap_or(x)
}

/// The value stored for one coordinate, longitude first.
pub fn encode_coord(lon: f64, lat: f64) -> String {
    format!("{:.5},{:.5}", lon, lat)
}

/// Parses `encode_coord` output back into `(lon, lat)`.
pub fn decode_coord(raw: &[u8]) -> Result<(f64, f64)> {
    let raw = std::str::from_utf8(raw)?;
    let (lon, lat) = raw
        .split_once(',')
        .ok_or_else(|| anyhow!("stored coordinate {:?} isn't lon,lat", raw))?;
    Ok((lon.parse()?, lat.parse()?))
}
