use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XPORT decoding error: {message}")]
    XportError { message: String },

    #[error("Identifier {column} in {source_name} is not an integer: {value:?}")]
    IdentifierCastError {
        source_name: String,
        column: String,
        value: String,
    },

    #[error("Column {column} not found in {source_name}")]
    MissingColumnError { source_name: String, column: String },

    #[error("Variable {variable} not found in dataset {dataset_name}")]
    MissingVariableError {
        variable: String,
        dataset_name: String,
    },

    #[error("Columns overlap but no suffix specified: {columns:?}")]
    ColumnOverlapError { columns: Vec<String> },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("No dataset tables to combine in {directory}")]
    NoInputFilesError { directory: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: {value:?} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Decoding,
    Data,
    Configuration,
    Filesystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::CsvError(_) | EtlError::XportError { .. } => ErrorCategory::Decoding,
            EtlError::IoError(_) => ErrorCategory::Filesystem,
            EtlError::IdentifierCastError { .. }
            | EtlError::MissingColumnError { .. }
            | EtlError::MissingVariableError { .. }
            | EtlError::ColumnOverlapError { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::NoInputFilesError { .. } => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Decoding | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Filesystem => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => {
                "Check the network connection and that the base URL and year block exist"
            }
            EtlError::CsvError(_) => {
                "Check that the variables file and the output directory hold well-formed CSV"
            }
            EtlError::IoError(_) => "Check that the output directory is writable",
            EtlError::XportError { .. } => {
                "The downloaded file is not a SAS transport file; check the dataset URL"
            }
            EtlError::IdentifierCastError { .. } | EtlError::MissingColumnError { .. } => {
                "Every dataset must carry an integral SEQN column"
            }
            EtlError::MissingVariableError { .. } => {
                "Fix the variable code in the variables file or choose another year block"
            }
            EtlError::ProcessingError { .. } => "Check the intermediate CSV files in the output directory",
            EtlError::ColumnOverlapError { .. } => {
                "Give each variable a unique common name across datasets"
            }
            EtlError::NoInputFilesError { .. } => {
                "Run the fetch step first or point --output-path at a populated directory"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Review the command-line flags or TOML file",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Download failed: {}", self),
            ErrorCategory::Decoding => format!("Could not read data: {}", self),
            ErrorCategory::Data => format!("Dataset problem: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Filesystem => format!("File system problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
