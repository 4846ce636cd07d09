use crate::buckets::bucket_keys;
use crate::error::Result;
use crate::types::{AggregateRow, DerivedRow, InfoRow, ProfitRow, ReturnImpact, SalesRecord};
use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, info};

pub const SHEET_RECORDS: &str = "DataFrame";
pub const SHEET_MONTHLY: &str = "Monthly Summary";
pub const SHEET_QUARTERLY: &str = "Quarterly Summary";
pub const SHEET_PROFIT: &str = "Profit per Unit";
pub const SHEET_DISCOUNT_RETURN: &str = "Discount & Return";
pub const SHEET_INFO: &str = "Info";

/// Text written in place of a return impact that has no value.
pub const UNDEFINED_CELL: &str = "undefined";

const MEASURE_HEADERS: [&str; 5] = ["Units Sold", "Revenue", "Units Returned", "Price", "Discount"];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

/// A named flat table, one per workbook sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Everything the workbook is built from. Borrowed; nothing is modified.
pub struct ReportTables<'a> {
    pub records: &'a [SalesRecord],
    pub monthly: &'a [AggregateRow],
    pub quarterly: &'a [AggregateRow],
    pub categories: &'a [(String, Vec<AggregateRow>)],
    pub profit: &'a [ProfitRow],
    pub derived: &'a [DerivedRow],
    pub info: &'a InfoRow,
}

fn headers(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn aggregate_cells(row: &AggregateRow) -> Vec<Cell> {
    vec![
        Cell::Text(row.key.clone()),
        Cell::Number(row.units_sold as f64),
        Cell::Number(row.revenue),
        Cell::Number(row.units_returned as f64),
        Cell::Number(row.price),
        Cell::Number(row.discount),
    ]
}

pub fn records_sheet(records: &[SalesRecord]) -> SheetTable {
    let rows = records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let keys = bucket_keys(r.date);
            vec![
                Cell::Number(i as f64),
                Cell::Date(r.date),
                Cell::Text(r.platform.clone()),
                Cell::Text(r.region.clone()),
                Cell::Text(r.category.clone()),
                Cell::Number(r.units_sold as f64),
                Cell::Number(r.units_returned as f64),
                Cell::Number(r.price),
                Cell::Number(r.discount),
                Cell::Number(r.revenue),
                Cell::Text(keys.month),
                Cell::Text(keys.quarter),
            ]
        })
        .collect();
    SheetTable {
        name: SHEET_RECORDS.to_string(),
        headers: headers(&[
            "Row",
            "Date",
            "Platform",
            "Location",
            "Category",
            "Units Sold",
            "Units Returned",
            "Price",
            "Discount",
            "Revenue",
            "Month",
            "Quarter",
        ]),
        rows,
    }
}

pub fn aggregate_sheet(name: &str, key_header: &str, rows: &[AggregateRow]) -> SheetTable {
    let mut cols = vec![key_header];
    cols.extend(MEASURE_HEADERS);
    SheetTable {
        name: name.to_string(),
        headers: headers(&cols),
        rows: rows.iter().map(aggregate_cells).collect(),
    }
}

pub fn profit_sheet(rows: &[ProfitRow]) -> SheetTable {
    SheetTable {
        name: SHEET_PROFIT.to_string(),
        headers: headers(&["Month", "Profit per Unit"]),
        rows: rows
            .iter()
            .map(|p| vec![Cell::Text(p.month.clone()), Cell::Number(p.profit_per_unit)])
            .collect(),
    }
}

pub fn discount_return_sheet(rows: &[DerivedRow]) -> SheetTable {
    let mut cols = vec!["Month"];
    cols.extend(MEASURE_HEADERS);
    cols.push("Return Impact");
    SheetTable {
        name: SHEET_DISCOUNT_RETURN.to_string(),
        headers: headers(&cols),
        rows: rows
            .iter()
            .map(|d| {
                let mut cells = aggregate_cells(&d.aggregate);
                cells.push(match d.return_impact {
                    ReturnImpact::Value(v) => Cell::Number(v),
                    ReturnImpact::Undefined { .. } => Cell::Text(UNDEFINED_CELL.to_string()),
                });
                cells
            })
            .collect(),
    }
}

pub fn info_sheet(info: &InfoRow) -> SheetTable {
    SheetTable {
        name: SHEET_INFO.to_string(),
        headers: headers(&["Source", "Region", "Year", "Prepared by"]),
        rows: vec![vec![
            Cell::Text(info.source.clone()),
            Cell::Text(info.region.clone()),
            Cell::Number(info.year as f64),
            Cell::Text(info.prepared_by.clone()),
        ]],
    }
}

/// All sheets in workbook order.
pub fn build_sheets(t: &ReportTables<'_>) -> Vec<SheetTable> {
    let mut sheets = vec![
        records_sheet(t.records),
        aggregate_sheet(SHEET_MONTHLY, "Month", t.monthly),
        aggregate_sheet(SHEET_QUARTERLY, "Quarter", t.quarterly),
    ];
    for (category, rows) in t.categories {
        sheets.push(aggregate_sheet(category, "Month", rows));
    }
    sheets.push(profit_sheet(t.profit));
    sheets.push(discount_return_sheet(t.derived));
    sheets.push(info_sheet(t.info));
    sheets
}

/// Write every table to its own sheet of one workbook at `path`.
///
/// The file is only opened during the final save and is closed whether or
/// not that save succeeds.
pub fn write_workbook(path: &Path, sheets: &[SheetTable]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for table in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&table.name)?;
        for (col, h) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, h, &header)?;
        }
        for (i, row) in table.rows.iter().enumerate() {
            let r = i as u32 + 1;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(s) => sheet.write_string(r, col as u16, s)?,
                    Cell::Number(n) => sheet.write_number(r, col as u16, *n)?,
                    Cell::Date(d) => {
                        let dt = ExcelDateTime::from_ymd(d.year() as u16, d.month() as u8, d.day() as u8)?;
                        sheet.write_datetime_with_format(r, col as u16, &dt, &date_format)?
                    }
                };
            }
        }
        sheet.autofit();
        debug!(sheet = %table.name, rows = table.rows.len(), "sheet staged");
    }

    workbook.save(path)?;
    info!(path = %path.display(), sheets = sheets.len(), "workbook written");
    Ok(())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
