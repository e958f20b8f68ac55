// src/reports/render.rs

use prettytable::{format, Cell, Row, Table};

use super::queries::{CityModel, CountyCount, MsrpByZip, RangeByType, UtilityCount, UtilityCounty};

/// A report row that knows its column titles and cell text.
pub trait Tabular {
    fn header() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
    /// Indexes of right-aligned (numeric) cells.
    fn numeric() -> &'static [usize] {
        &[]
    }
}

fn opt2(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x)).unwrap_or_default()
}

impl Tabular for CountyCount {
    fn header() -> &'static [&'static str] {
        &["county", "ev_count"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.county.clone(), self.ev_count.to_string()]
    }
    fn numeric() -> &'static [usize] {
        &[1]
    }
}

/// Rendered under a per-city heading, so the city itself is not a column.
impl Tabular for CityModel {
    fn header() -> &'static [&'static str] {
        &["make", "model", "n"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.make.clone(), self.model.clone(), self.n.to_string()]
    }
    fn numeric() -> &'static [usize] {
        &[2]
    }
}

impl Tabular for RangeByType {
    fn header() -> &'static [&'static str] {
        &["ev_type", "vehicles", "avg_electric_range", "median_range"]
    }
    fn cells(&self) -> Vec<String> {
        vec![
            self.ev_type.clone(),
            self.vehicles.to_string(),
            opt2(self.avg_electric_range),
            opt2(self.median_range),
        ]
    }
    fn numeric() -> &'static [usize] {
        &[1, 2, 3]
    }
}

impl Tabular for MsrpByZip {
    fn header() -> &'static [&'static str] {
        &["zip_code", "n", "avg_msrp", "median_msrp", "p90_msrp"]
    }
    fn cells(&self) -> Vec<String> {
        vec![
            self.zip_code.clone(),
            self.n.to_string(),
            opt2(self.avg_msrp),
            opt2(self.median_msrp),
            opt2(self.p90_msrp),
        ]
    }
    fn numeric() -> &'static [usize] {
        &[1, 2, 3, 4]
    }
}

impl Tabular for UtilityCount {
    fn header() -> &'static [&'static str] {
        &["electric_utility", "ev_count"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.electric_utility.clone(), self.ev_count.to_string()]
    }
    fn numeric() -> &'static [usize] {
        &[1]
    }
}

/// Rendered under a per-utility heading.
impl Tabular for UtilityCounty {
    fn header() -> &'static [&'static str] {
        &["county", "n"]
    }
    fn cells(&self) -> Vec<String> {
        vec![self.county.clone(), self.n.to_string()]
    }
    fn numeric() -> &'static [usize] {
        &[1]
    }
}

pub fn table_of<'a, T, I>(rows: I) -> Table
where
    T: Tabular + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        T::header()
            .iter()
            .map(|h| Cell::new(h).style_spec("b"))
            .collect(),
    ));
    for r in rows {
        let cells = r
            .cells()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if T::numeric().contains(&i) {
                    Cell::new(c).style_spec("r")
                } else {
                    Cell::new(c)
                }
            })
            .collect();
        table.add_row(Row::new(cells));
    }
    table
}

/// Split already-sorted rows into consecutive runs sharing `key`.
pub fn group_runs<'a, T>(rows: &'a [T], key: impl Fn(&T) -> &str) -> Vec<(&'a str, &'a [T])> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=rows.len() {
        if i == rows.len() || key(&rows[i]) != key(&rows[start]) {
            out.push((key(&rows[start]), &rows[start..i]));
            start = i;
        }
    }
    out
}
