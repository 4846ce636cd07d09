use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use tabled::Tabled;

use crate::util::format_number;

/// Column names the input file must carry, in the order they are reported.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "Date",
    "Platform",
    "Location",
    "Category",
    "Units Sold",
    "Units Returned",
    "Price",
    "Discount",
    "Revenue",
];

/// One CSV row as exported. Measures stay text until the row is known to be
/// in the analysed slice.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Units Sold")]
    pub units_sold: Option<String>,
    #[serde(rename = "Units Returned")]
    pub units_returned: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Discount")]
    pub discount: Option<String>,
    #[serde(rename = "Revenue")]
    pub revenue: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub platform: String,
    pub region: String,
    pub category: String,
    pub units_sold: i64,
    pub units_returned: i64,
    pub price: f64,
    pub discount: f64,
    pub revenue: f64,
}

/// Month and quarter bucket labels derived from one record date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketKeys {
    pub month: String,
    pub quarter: String,
}

fn display_2dp(v: &f64) -> String {
    format_number(*v, 2)
}

/// One row per bucket: summed volumes, averaged price and discount.
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct AggregateRow {
    #[tabled(rename = "Bucket")]
    pub key: String,
    #[tabled(rename = "Units Sold")]
    pub units_sold: i64,
    #[tabled(rename = "Revenue", display_with = "display_2dp")]
    pub revenue: f64,
    #[tabled(rename = "Units Returned")]
    pub units_returned: i64,
    #[tabled(rename = "Price", display_with = "display_2dp")]
    pub price: f64,
    #[tabled(rename = "Discount", display_with = "display_2dp")]
    pub discount: f64,
}

/// Percentage of sold units that came back.
///
/// `Undefined` marks a bucket with no sales, which is distinct from a zero
/// ratio (sales but no returns).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnImpact {
    Value(f64),
    Undefined { reason: &'static str },
}

impl ReturnImpact {
    pub fn value(&self) -> Option<f64> {
        match self {
            ReturnImpact::Value(v) => Some(*v),
            ReturnImpact::Undefined { .. } => None,
        }
    }
}

impl fmt::Display for ReturnImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnImpact::Value(v) => write!(f, "{:.2}", v),
            ReturnImpact::Undefined { .. } => write!(f, "undefined"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct DerivedRow {
    #[tabled(inline)]
    pub aggregate: AggregateRow,
    #[tabled(rename = "Return Impact")]
    pub return_impact: ReturnImpact,
    #[tabled(rename = "Profit per Unit", display_with = "display_2dp")]
    pub profit_per_unit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfitRow {
    pub month: String,
    pub profit_per_unit: f64,
}

#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct VolatilityPoint {
    #[tabled(rename = "Quarter")]
    pub quarter: String,
    #[tabled(rename = "Std Dev of Discount (%)", display_with = "display_2dp")]
    pub volatility: f64,
}

/// Pairwise Pearson coefficients; `None` where a pair has too little data or
/// a constant series.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub labels: [&'static str; 4],
    pub values: [[Option<f64>; 4]; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoRow {
    pub source: String,
    pub region: String,
    pub year: i32,
    pub prepared_by: String,
}
