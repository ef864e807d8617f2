use crate::core::table_io::{read_keyed, write_keyed};
use crate::domain::model::{KeyedTable, IDENTIFIER};
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};

pub const COMBINED_FILE_NAME: &str = "combined.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineSummary {
    pub location: String,
    pub inputs: Vec<String>,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Per-dataset CSV files are joined; a previous combined output never is.
pub fn is_join_input(file_name: &str) -> bool {
    file_name.contains("csv") && !file_name.contains("combined")
}

/// Left fold of inner joins. `None` when there is nothing to fold.
pub fn join_all(tables: Vec<KeyedTable>) -> Option<Result<KeyedTable>> {
    let mut tables = tables.into_iter();
    let first = tables.next()?;
    Some(tables.try_fold(first, |combined, table| combined.inner_join(&table)))
}

/// Joins every dataset CSV in storage on the identifier and writes
/// [`COMBINED_FILE_NAME`] without the identifier column.
pub async fn combine<S: Storage>(storage: &S) -> Result<CombineSummary> {
    let mut inputs: Vec<String> = storage
        .list_files()
        .await?
        .into_iter()
        .filter(|name| is_join_input(name))
        .collect();
    inputs.sort();

    let mut tables = Vec::with_capacity(inputs.len());
    for name in &inputs {
        let table = read_keyed(&storage.read_file(name).await?, IDENTIFIER, name)?;
        tracing::debug!("Read {} with {} rows", name, table.len());
        tables.push(table);
    }

    let combined = join_all(tables).ok_or_else(|| EtlError::NoInputFilesError {
        directory: storage.location(""),
    })??;

    storage
        .write_file(COMBINED_FILE_NAME, &write_keyed(&combined, false)?)
        .await?;

    Ok(CombineSummary {
        location: storage.location(COMBINED_FILE_NAME),
        inputs,
        rows: combined.len(),
        columns: combined.columns().to_vec(),
    })
}
