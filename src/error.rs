use thiserror::Error;

#[derive(Error, Debug)]
pub enum XcatError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Format error: {0}")]
    Format(String),
    #[error("Binding error: {0}")]
    Binding(String),
    #[error("Execution error: {0}")]
    Execution(String),
    #[error("Multiple terms fit the query pattern:\n{pattern}\nThey are:\n{results}")]
    NotUnique { pattern: String, results: String },
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, XcatError>;

// Helper conversions
impl From<rusqlite::Error> for XcatError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}

impl From<config::ConfigError> for XcatError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
