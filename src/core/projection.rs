use crate::core::table_io::{read_frame, write_keyed};
use crate::domain::model::{
    DatasetSpec, FetchedDataset, Frame, KeyedTable, ProjectedDataset, IDENTIFIER,
};
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};

/// Keeps the configured variables in configured order, renames them to their
/// display names and keys the result by identifier.
///
/// Any configured variable missing from the frame is a hard error naming the
/// variable and the dataset.
pub fn project(frame: &Frame, dataset: &DatasetSpec) -> Result<KeyedTable> {
    let mut indices = Vec::with_capacity(dataset.variables.len());
    for variable in &dataset.variables {
        let index = frame
            .column_index(&variable.code)
            .ok_or_else(|| EtlError::MissingVariableError {
                variable: variable.code.clone(),
                dataset_name: dataset.name.clone(),
            })?;
        indices.push(index);
    }

    let projected = Frame {
        columns: dataset
            .variables
            .iter()
            .map(|v| v.display_name.clone())
            .collect(),
        rows: frame
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect(),
    };

    KeyedTable::from_frame(projected, IDENTIFIER, &dataset.code)
}

/// Re-reads a fetched CSV, projects it and overwrites it with the identifier first.
pub async fn project_file<S: Storage>(
    storage: &S,
    fetched: &FetchedDataset,
    dataset: &DatasetSpec,
) -> Result<ProjectedDataset> {
    let frame = read_frame(&storage.read_file(&fetched.file_name).await?)?;
    let table = project(&frame, dataset)?;
    storage
        .write_file(&fetched.file_name, &write_keyed(&table, true)?)
        .await?;

    tracing::debug!(
        "Projected {} to {} columns over {} rows",
        fetched.file_name,
        table.columns().len(),
        table.len()
    );

    Ok(ProjectedDataset {
        code: fetched.code.clone(),
        file_name: fetched.file_name.clone(),
        rows: table.len(),
        columns: table.columns().to_vec(),
    })
}
