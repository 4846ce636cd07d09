use std::path::PathBuf;

/// Fixed parameters for one analysis run. Every run analyses the same market
/// slice and writes the same workbook.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub input_path: PathBuf,
    pub workbook_path: PathBuf,
    pub platform: String,
    pub region: String,
    pub year: i32,
    pub categories: Vec<String>,
    pub source_label: String,
    pub prepared_by: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("Supplement_Sales_Weekly.csv"),
            workbook_path: PathBuf::from("supplement_analysis_final.xlsx"),
            platform: "Walmart".to_string(),
            region: "Canada".to_string(),
            year: 2024,
            categories: vec![
                "Vitamin".to_string(),
                "Mineral".to_string(),
                "Protein".to_string(),
            ],
            source_label: "Walmart Supplement Sales".to_string(),
            prepared_by: "Parham Parvizi".to_string(),
        }
    }
}
