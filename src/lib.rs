pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::toml_config::TomlConfig;

pub use crate::adapters::LocalStorage;
pub use crate::core::{
    combine::{combine, COMBINED_FILE_NAME},
    etl::EtlEngine,
    fetch::DatasetFetcher,
    pipeline::SurveyPipeline,
    registry::VariableRegistry,
};
pub use crate::domain::model::{DatasetSpec, KeyedTable, VariableDescriptor, IDENTIFIER};
pub use crate::utils::error::{EtlError, Result};
