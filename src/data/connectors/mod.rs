mod csv;
mod types;
mod validator;

pub use csv::{CsvConnector, DEFAULT_MIN_ROWS};
pub use types::{DatasetMetadata, RequiredColumn};
pub use validator::DataValidator;
