use crate::domain::model::{DatasetSpec, VariableDescriptor};
use crate::utils::error::{EtlError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RegistryRow {
    #[serde(rename = "Data Set")]
    data_set: String,
    #[serde(rename = "Data Set Name")]
    data_set_name: String,
    #[serde(rename = "Variable")]
    variable: String,
    #[serde(rename = "Variable Common Name")]
    variable_common_name: String,
}

/// Dataset groups from the variables file, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableRegistry {
    datasets: Vec<DatasetSpec>,
    index: HashMap<String, usize>,
}

impl VariableRegistry {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Rows are grouped by "Data Set". The dataset name is last-write-wins;
    /// variable codes are trimmed and upper-cased, common names trimmed.
    /// A blank cell in any of the four columns fails the whole load.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut registry = Self::default();

        for (index, row) in reader.deserialize().enumerate() {
            let row: RegistryRow = row?;
            // Header is line 1.
            let line = index + 2;
            let code = required(&row.data_set, "Data Set", line)?;
            let name = required(&row.data_set_name, "Data Set Name", line)?;
            let variable = required(&row.variable, "Variable", line)?;
            let common_name = required(&row.variable_common_name, "Variable Common Name", line)?;

            let position = match registry.index.get(code) {
                Some(&position) => position,
                None => {
                    registry.datasets.push(DatasetSpec::new(code, name));
                    registry.index.insert(code.to_string(), registry.datasets.len() - 1);
                    registry.datasets.len() - 1
                }
            };

            let dataset = &mut registry.datasets[position];
            dataset.name = name.to_string();
            dataset
                .variables
                .push(VariableDescriptor::new(variable.to_uppercase(), common_name));
        }

        tracing::debug!(
            "Loaded {} datasets from variables file",
            registry.datasets.len()
        );
        Ok(registry)
    }

    pub fn datasets(&self) -> &[DatasetSpec] {
        &self.datasets
    }

    pub fn get(&self, code: &str) -> Option<&DatasetSpec> {
        self.index.get(code).map(|&i| &self.datasets[i])
    }

    pub fn dataset_name(&self, code: &str) -> Option<&str> {
        self.get(code).map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

fn required<'a>(value: &'a str, column: &str, line: usize) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EtlError::ConfigValidationError {
            field: column.to_string(),
            message: format!("variables file line {} has an empty \"{}\" cell", line, column),
        });
    }
    Ok(trimmed)
}
