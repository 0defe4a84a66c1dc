use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Required column '{column}' is missing from the input")]
    MissingColumn { column: String },

    #[error("Unknown category '{category}' at row {row}")]
    UnknownCategory { category: String, row: usize },

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidNumeric {
        column: String,
        value: String,
        row: usize,
    },

    #[error("Input '{path}' is empty")]
    EmptyInput { path: String },
}

impl PipelineError {
    pub fn invalid(column: &str, value: &str, row: usize) -> Self {
        PipelineError::InvalidNumeric {
            column: column.to_string(),
            value: value.to_string(),
            row,
        }
    }
}
