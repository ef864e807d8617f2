pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_path_segment, validate_url};

#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;

pub const DEFAULT_VARIABLES_FILE: &str = "variables.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "data";
pub const DEFAULT_LOG_FILTER: &str = "survey_etl=info";
pub const VERBOSE_LOG_FILTER: &str = "survey_etl=debug,info";

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "survey-etl")]
#[command(about = "Download survey datasets, keep the configured variables and join them on SEQN")]
pub struct CliConfig {
    /// CSV listing "Data Set", "Data Set Name", "Variable", "Variable Common Name"
    #[arg(long, default_value = DEFAULT_VARIABLES_FILE)]
    pub variables_file: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    #[arg(long, default_value = crate::core::fetch::DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, default_value = crate::core::fetch::DEFAULT_YEAR_BLOCK)]
    pub year_block: String,

    /// Explicit download URL for one dataset, repeatable
    #[arg(long = "url", value_name = "CODE=URL", value_parser = parse_url_override)]
    pub url_overrides: Vec<(String, String)>,

    /// TOML configuration file; replaces the flags above when given
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
fn parse_url_override(raw: &str) -> std::result::Result<(String, String), String> {
    let (code, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CODE=URL, got {:?}", raw))?;
    let code = code.trim();
    if code.is_empty() {
        return Err(format!("missing dataset code in {:?}", raw));
    }
    Ok((code.to_string(), url.trim().to_string()))
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Log directives used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn year_block(&self) -> &str {
        &self.year_block
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn variables_file(&self) -> &str {
        &self.variables_file
    }

    fn url_override(&self, dataset_code: &str) -> Option<&str> {
        self.url_overrides
            .iter()
            .find(|(code, _)| code == dataset_code)
            .map(|(_, url)| url.as_str())
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(
            self,
            self.url_overrides
                .iter()
                .map(|(code, url)| (code.as_str(), url.as_str())),
        )
    }
}

/// Checks shared by every configuration source.
pub fn validate_provider<'a, C: ConfigProvider>(
    config: &C,
    overrides: impl Iterator<Item = (&'a str, &'a str)>,
) -> Result<()> {
    validate_url("base_url", config.base_url())?;
    validate_path_segment("year_block", config.year_block())?;
    validate_path("output_path", config.output_path())?;
    validate_path("variables_file", config.variables_file())?;
    for (code, url) in overrides {
        validate_url(&format!("urls.{}", code), url)?;
    }
    Ok(())
}
