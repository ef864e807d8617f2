use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Subject identifier column shared by every survey dataset.
pub const IDENTIFIER: &str = "SEQN";

pub type SubjectId = i64;

/// One variable to extract: source code in the dataset and the column name it gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub code: String,
    pub display_name: String,
}

impl VariableDescriptor {
    pub fn new(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
        }
    }

    pub fn identifier() -> Self {
        Self::new(IDENTIFIER, IDENTIFIER)
    }
}

/// A dataset group from the variables file. `variables` always starts with the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub code: String,
    pub name: String,
    pub variables: Vec<VariableDescriptor>,
}

impl DatasetSpec {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            variables: vec![VariableDescriptor::identifier()],
        }
    }

    pub fn with_variable(mut self, code: &str, display_name: &str) -> Self {
        self.variables.push(VariableDescriptor::new(code, display_name));
        self
    }
}

/// A dataset downloaded and converted to CSV in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDataset {
    pub code: String,
    pub file_name: String,
    pub location: String,
}

/// A dataset after projection, keyed by identifier and written back in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedDataset {
    pub code: String,
    pub file_name: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// Untyped table: a header and rows of cells, as read from or written to CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Table keyed by subject identifier. The key is not one of `columns`;
/// every row holds exactly `columns.len()` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedTable {
    key: String,
    columns: Vec<String>,
    rows: Vec<(SubjectId, Vec<String>)>,
}

impl KeyedTable {
    pub fn new(key: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            key: key.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, id: SubjectId, fields: Vec<String>) -> Result<()> {
        if fields.len() != self.columns.len() {
            return Err(EtlError::ProcessingError {
                message: format!(
                    "row {} has {} fields, expected {}",
                    id,
                    fields.len(),
                    self.columns.len()
                ),
            });
        }
        self.rows.push((id, fields));
        Ok(())
    }

    /// Moves column `key` out of the frame and uses it as the row key.
    pub fn from_frame(frame: Frame, key: &str, source_name: &str) -> Result<Self> {
        let key_index = frame
            .column_index(key)
            .ok_or_else(|| EtlError::MissingColumnError {
                source_name: source_name.to_string(),
                column: key.to_string(),
            })?;

        let width = frame.columns.len();
        let mut columns = frame.columns;
        columns.remove(key_index);

        let mut rows = Vec::with_capacity(frame.rows.len());
        for mut row in frame.rows {
            if row.len() != width {
                return Err(EtlError::ProcessingError {
                    message: format!(
                        "{}: row has {} fields, expected {}",
                        source_name,
                        row.len(),
                        width
                    ),
                });
            }
            let raw = row.remove(key_index);
            let id = parse_subject_id(&raw).ok_or_else(|| EtlError::IdentifierCastError {
                source_name: source_name.to_string(),
                column: key.to_string(),
                value: raw.clone(),
            })?;
            rows.push((id, row));
        }

        Ok(Self {
            key: key.to_string(),
            columns,
            rows,
        })
    }

    /// Flattens back to a frame, with the key as the first column when `include_key` is set.
    pub fn to_frame(&self, include_key: bool) -> Frame {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        if include_key {
            columns.push(self.key.clone());
        }
        columns.extend(self.columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .map(|(id, fields)| {
                let mut row = Vec::with_capacity(columns.len());
                if include_key {
                    row.push(id.to_string());
                }
                row.extend(fields.iter().cloned());
                row
            })
            .collect();

        Frame { columns, rows }
    }

    /// Rows whose key is on both sides, left order kept, fields concatenated.
    /// A key repeated on the right yields one row per match.
    pub fn inner_join(&self, other: &KeyedTable) -> Result<KeyedTable> {
        let left: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        let overlap: Vec<String> = other
            .columns
            .iter()
            .filter(|c| left.contains(c.as_str()))
            .cloned()
            .collect();
        if !overlap.is_empty() {
            return Err(EtlError::ColumnOverlapError { columns: overlap });
        }

        let mut right_index: HashMap<SubjectId, Vec<usize>> = HashMap::new();
        for (position, (id, _)) in other.rows.iter().enumerate() {
            right_index.entry(*id).or_default().push(position);
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());

        let mut rows = Vec::new();
        for (id, fields) in &self.rows {
            let Some(matches) = right_index.get(id) else {
                continue;
            };
            for &position in matches {
                let mut joined = fields.clone();
                joined.extend(other.rows[position].1.iter().cloned());
                rows.push((*id, joined));
            }
        }

        Ok(KeyedTable {
            key: self.key.clone(),
            columns,
            rows,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[(SubjectId, Vec<String>)] {
        &self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = SubjectId> + '_ {
        self.rows.iter().map(|(id, _)| *id)
    }

    pub fn get(&self, id: SubjectId) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, fields)| fields.as_slice())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Integers, or decimals with a zero fraction such as `73557.0`.
pub fn parse_subject_id(raw: &str) -> Option<SubjectId> {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<SubjectId>() {
        return Some(id);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as SubjectId)
    } else {
        None
    }
}
