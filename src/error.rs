use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("File I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Unparseable date '{value}' on line {line}")]
    InvalidDate { line: u64, value: String },

    #[error("Unparseable {column} value '{value}' on line {line}")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("Workbook write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Chart rendering failed: {0}")]
    Chart(String),

    #[error("Chart '{chart}' has {axis} axis points but {series} series values")]
    SeriesLength {
        chart: &'static str,
        axis: usize,
        series: usize,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
