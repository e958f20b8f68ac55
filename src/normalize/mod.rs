// src/normalize/mod.rs

pub mod coerce;
pub mod point;

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::dataset::FieldIndex;
use coerce::{normalize_ev_type, to_decimal, to_int, to_text};
use point::parse_point;

/// Logical field names in the dataset export.
pub mod fields {
    pub const DOL_VEHICLE_ID: &str = "dol_vehicle_id";
    pub const VIN_1_10: &str = "vin_1_10";
    pub const COUNTY: &str = "county";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const ZIP_CODE: &str = "zip_code";
    pub const LEGISLATIVE_DISTRICT: &str = "legislative_district";
    pub const GEOCODED_COLUMN: &str = "geocoded_column";
    pub const MODEL_YEAR: &str = "model_year";
    pub const MAKE: &str = "make";
    pub const MODEL: &str = "model";
    pub const EV_TYPE: &str = "ev_type";
    pub const CAFV_TYPE: &str = "cafv_type";
    pub const ELECTRIC_RANGE: &str = "electric_range";
    pub const BASE_MSRP: &str = "base_msrp";
    pub const ELECTRIC_UTILITY: &str = "electric_utility";
}

/// Storage columns, key first, in bind order.
pub const COLUMNS: [&str; 17] = [
    "dol_vehicle_id",
    "vin_1_10",
    "county",
    "city",
    "state",
    "zip_code",
    "legislative_district",
    "latitude",
    "longitude",
    "model_year",
    "make",
    "model",
    "ev_type",
    "cafv_type",
    "electric_range",
    "base_msrp",
    "electric_utility",
];

pub const COLUMN_COUNT: usize = COLUMNS.len();

/// One vehicle registration, typed and ready for the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Registration {
    pub dol_vehicle_id: String,
    pub vin_1_10: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub legislative_district: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub model_year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub ev_type: Option<String>,
    pub cafv_type: Option<String>,
    pub electric_range: Option<i32>,
    pub base_msrp: Option<f64>,
    pub electric_utility: Option<String>,
}

/// Normalize one raw row. Only a missing identifier is an error; every other
/// attribute degrades to `None`.
pub fn normalize_row(index: &FieldIndex, row: &[Value]) -> Result<Registration> {
    use fields::*;
    let f = |name: &str| index.field(row, name);

    let Some(dol_vehicle_id) = to_text(f(DOL_VEHICLE_ID)) else {
        bail!("row has no {}", DOL_VEHICLE_ID);
    };
    let (latitude, longitude) = parse_point(f(GEOCODED_COLUMN));

    Ok(Registration {
        dol_vehicle_id,
        vin_1_10: to_text(f(VIN_1_10)),
        county: to_text(f(COUNTY)),
        city: to_text(f(CITY)),
        state: to_text(f(STATE)),
        zip_code: to_text(f(ZIP_CODE)),
        legislative_district: to_text(f(LEGISLATIVE_DISTRICT)),
        latitude,
        longitude,
        model_year: to_int(f(MODEL_YEAR)),
        make: to_text(f(MAKE)),
        model: to_text(f(MODEL)),
        ev_type: normalize_ev_type(f(EV_TYPE)),
        cafv_type: to_text(f(CAFV_TYPE)),
        electric_range: to_int(f(ELECTRIC_RANGE)),
        base_msrp: to_decimal(f(BASE_MSRP)),
        electric_utility: to_text(f(ELECTRIC_UTILITY)),
    })
}

/// Normalize every row, preserving order. Fails on the first row without an
/// identifier, naming its position.
#[instrument(level = "info", skip_all, fields(rows = rows.len()))]
pub fn normalize_rows(index: &FieldIndex, rows: &[Vec<Value>]) -> Result<Vec<Registration>> {
    let mut out = Vec::with_capacity(rows.len());
    for (pos, row) in rows.iter().enumerate() {
        match normalize_row(index, row) {
            Ok(rec) => out.push(rec),
            Err(e) => bail!("data row {}: {}", pos, e),
        }
    }
    let located = out.iter().filter(|r| r.latitude.is_some()).count();
    debug!(normalized = out.len(), located, "rows normalized");
    Ok(out)
}
