use crate::domain::model::{Frame, KeyedTable};
use crate::utils::error::Result;

pub fn read_frame(data: &[u8]) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);

    let columns = reader.headers()?.iter().map(str::to_string).collect();
    let mut frame = Frame::new(columns);
    for record in reader.records() {
        let record = record?;
        frame.rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(frame)
}

pub fn write_frame(frame: &Frame) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&frame.columns)?;
    for row in &frame.rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

pub fn read_keyed(data: &[u8], key: &str, source_name: &str) -> Result<KeyedTable> {
    KeyedTable::from_frame(read_frame(data)?, key, source_name)
}

pub fn write_keyed(table: &KeyedTable, include_key: bool) -> Result<Vec<u8>> {
    write_frame(&table.to_frame(include_key))
}

/// Shortest round-trip text for a number, integral values keep a `.0`;
/// missing values are empty cells.
pub fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_nan() => String::new(),
        Some(v) => format!("{:?}", v),
        None => String::new(),
    }
}
