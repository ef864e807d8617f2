use crate::core::table_io::{format_number, write_frame};
use crate::core::xport::{self, XportDataset, XportValue};
use crate::domain::model::{DatasetSpec, FetchedDataset, Frame, IDENTIFIER};
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://wwwn.cdc.gov/Nchs/Nhanes";
pub const DEFAULT_YEAR_BLOCK: &str = "2017-2018";

/// Downloads `.XPT` files and stores them as CSV named after the dataset code.
pub struct DatasetFetcher {
    client: Client,
    base_url: String,
}

impl DatasetFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Returns the download URL and the code the local files are named by.
    pub fn resolve(
        &self,
        dataset_code: &str,
        year_block: &str,
        explicit_url: Option<&str>,
    ) -> Result<(String, String)> {
        match explicit_url {
            Some(url) => Ok((url.to_string(), code_from_url(url)?)),
            None => Ok((
                format!(
                    "{}/{}/{}.XPT",
                    self.base_url.trim_end_matches('/'),
                    year_block,
                    dataset_code
                ),
                dataset_code.to_string(),
            )),
        }
    }

    pub async fn fetch<S: Storage>(
        &self,
        storage: &S,
        dataset: &DatasetSpec,
        year_block: &str,
        explicit_url: Option<&str>,
    ) -> Result<FetchedDataset> {
        let (url, code) = self.resolve(&dataset.code, year_block, explicit_url)?;
        tracing::info!("Requesting {}", url);

        storage.ensure_root().await?;

        let xpt_name = format!("{}.XPT", code);
        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
        storage.write_file(&xpt_name, &body).await?;

        let raw = storage.read_file(&xpt_name).await?;
        let table = xport::parse(&raw)?;
        let frame = to_frame(&table, &xpt_name)?;

        let csv_name = format!("{}.csv", code);
        storage.write_file(&csv_name, &write_frame(&frame)?).await?;
        storage.remove_file(&xpt_name).await?;

        tracing::debug!(
            "Stored {} rows x {} columns as {}",
            frame.len(),
            frame.columns.len(),
            csv_name
        );

        Ok(FetchedDataset {
            code,
            location: storage.location(&csv_name),
            file_name: csv_name,
        })
    }
}

/// `https://host/path/P_DEMO.XPT` -> `P_DEMO`.
pub fn code_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| EtlError::InvalidConfigValueError {
        field: "url".to_string(),
        value: url.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })?;

    let code = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .and_then(|last| last.split('.').next())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| EtlError::InvalidConfigValueError {
            field: "url".to_string(),
            value: url.to_string(),
            reason: "URL has no file name to name the dataset by".to_string(),
        })?;

    Ok(code.to_string())
}

/// Every column as text, with the identifier cast to an integer.
pub fn to_frame(table: &XportDataset, source_name: &str) -> Result<Frame> {
    let key_index = table
        .variable_index(IDENTIFIER)
        .ok_or_else(|| EtlError::MissingColumnError {
            source_name: source_name.to_string(),
            column: IDENTIFIER.to_string(),
        })?;

    let mut frame = Frame::new(table.variables.iter().map(|v| v.name.clone()).collect());
    for row in &table.rows {
        let mut cells = Vec::with_capacity(row.len());
        for (index, value) in row.iter().enumerate() {
            if index == key_index {
                cells.push(cast_identifier(value, source_name)?);
                continue;
            }
            cells.push(match value {
                XportValue::Number(number) => format_number(*number),
                XportValue::Text(text) => text.clone(),
            });
        }
        frame.rows.push(cells);
    }
    Ok(frame)
}

fn cast_identifier(value: &XportValue, source_name: &str) -> Result<String> {
    let cast_error = |shown: String| EtlError::IdentifierCastError {
        source_name: source_name.to_string(),
        column: IDENTIFIER.to_string(),
        value: shown,
    };

    match value {
        XportValue::Number(Some(v)) if v.is_finite() && v.fract() == 0.0 => {
            Ok((*v as i64).to_string())
        }
        XportValue::Number(Some(v)) => Err(cast_error(v.to_string())),
        XportValue::Number(None) => Err(cast_error("missing".to_string())),
        XportValue::Text(text) => text
            .trim()
            .parse::<i64>()
            .map(|id| id.to_string())
            .map_err(|_| cast_error(text.clone())),
    }
}
