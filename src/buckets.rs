// Calendar bucket labels. Keys sort lexicographically in calendar order, so
// the aggregator can rely on plain string ordering.
use chrono::{Datelike, NaiveDate};

use crate::types::BucketKeys;

/// `YYYY-MM`
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// `YYYYQn`, with Q1 = Jan..Mar.
pub fn quarter_key(date: NaiveDate) -> String {
    format!("{}Q{}", date.year(), date.month0() / 3 + 1)
}

pub fn bucket_keys(date: NaiveDate) -> BucketKeys {
    BucketKeys {
        month: month_key(date),
        quarter: quarter_key(date),
    }
}

/// The four quarter labels of `year`, in order.
pub fn quarter_labels(year: i32) -> [String; 4] {
    [1, 2, 3, 4].map(|q| format!("{}Q{}", year, q))
}
