// src/normalize/point.rs

use serde_json::Value;
use std::borrow::Cow;

/// `(latitude, longitude)` from a GeoJSON-style point.
///
/// Accepts the structured object or its JSON text. The source stores
/// `coordinates` as `[lon, lat]`; anything other than exactly two numbers
/// yields `(None, None)`, never a half-filled pair.
pub fn parse_point(v: Option<&Value>) -> (Option<f64>, Option<f64>) {
    decode(v)
        .and_then(|obj| coordinates(&obj))
        .map_or((None, None), |(lat, lon)| (Some(lat), Some(lon)))
}

fn decode(v: Option<&Value>) -> Option<Cow<'_, Value>> {
    match v? {
        Value::String(s) => serde_json::from_str(s).ok().map(Cow::Owned),
        other => Some(Cow::Borrowed(other)),
    }
}

fn coordinates(obj: &Value) -> Option<(f64, f64)> {
    match obj.get("coordinates")?.as_array()?.as_slice() {
        [lon, lat] => Some((lat.as_f64()?, lon.as_f64()?)),
        _ => None,
    }
}
