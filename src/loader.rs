use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{RawRow, SalesRecord, REQUIRED_COLUMNS};
use crate::util::{parse_date, parse_f64_safe, parse_units};
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub filtered_rows: usize,
}

/// Market slice a run is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceFilter {
    pub platform: String,
    pub region: String,
    pub year: i32,
}

impl From<&AnalysisConfig> for SliceFilter {
    fn from(cfg: &AnalysisConfig) -> Self {
        Self {
            platform: cfg.platform.clone(),
            region: cfg.region.clone(),
            year: cfg.year,
        }
    }
}

impl SliceFilter {
    pub fn accepts(&self, platform: &str, region: &str, date: NaiveDate) -> bool {
        platform == self.platform && region == self.region && date.year() == self.year
    }

    pub fn matches(&self, r: &SalesRecord) -> bool {
        self.accepts(&r.platform, &r.region, r.date)
    }
}

/// Load the sales export at `path` and keep only rows in `filter`'s slice.
///
/// A missing file or column, an unparseable date on any row, or an
/// unparseable measure on a kept row aborts the load.
pub fn load_sales(path: &Path, filter: &SliceFilter) -> Result<(Vec<SalesRecord>, LoadReport)> {
    let file = File::open(path).map_err(|source| AnalysisError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let (kept, total_rows) = read_records(file, filter)?;
    debug_assert!(kept.iter().all(|r| filter.matches(r)));
    let report = LoadReport {
        total_rows,
        filtered_rows: kept.len(),
    };
    debug!(?report, path = %path.display(), "sales file loaded");
    Ok((kept, report))
}

/// Parse a CSV source and return the rows inside `filter`'s slice, in file
/// order, together with the total row count.
///
/// Measures are only parsed for kept rows; rows outside the slice may carry
/// blank or malformed numbers.
pub fn read_records<R: Read>(source: R, filter: &SliceFilter) -> Result<(Vec<SalesRecord>, usize)> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let headers = rdr.headers()?.clone();
    check_columns(&headers)?;

    let mut total = 0usize;
    let mut out = Vec::new();
    for result in rdr.records() {
        let record = result?;
        total += 1;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row: RawRow = record.deserialize(Some(&headers))?;
        let date = parse_date(&row.date).ok_or_else(|| AnalysisError::InvalidDate {
            line,
            value: row.date.clone(),
        })?;
        if !filter.accepts(&row.platform, &row.location, date) {
            continue;
        }

        let bad = |column: &'static str, raw: &Option<String>| AnalysisError::InvalidNumber {
            line,
            column,
            value: raw.clone().unwrap_or_default(),
        };
        let units_sold = parse_units(row.units_sold.as_deref())
            .ok_or_else(|| bad("Units Sold", &row.units_sold))?;
        let units_returned = parse_units(row.units_returned.as_deref())
            .ok_or_else(|| bad("Units Returned", &row.units_returned))?;
        let price = parse_f64_safe(row.price.as_deref()).ok_or_else(|| bad("Price", &row.price))?;
        let discount = parse_f64_safe(row.discount.as_deref())
            .ok_or_else(|| bad("Discount", &row.discount))?;
        let revenue = parse_f64_safe(row.revenue.as_deref())
            .ok_or_else(|| bad("Revenue", &row.revenue))?;

        out.push(SalesRecord {
            date,
            platform: row.platform,
            region: row.location,
            category: row.category,
            units_sold,
            units_returned,
            price,
            discount,
            revenue,
        });
    }
    Ok((out, total))
}

fn check_columns(headers: &StringRecord) -> Result<()> {
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == col) {
            return Err(AnalysisError::MissingColumn(col.to_string()));
        }
    }
    Ok(())
}
