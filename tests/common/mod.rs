//! Builds small SAS transport (XPORT v5) files for tests.
#![allow(dead_code)]

const RECORD_LEN: usize = 80;

pub enum Cell {
    Num(f64),
    Missing,
    Text(&'static str),
}

pub struct Column {
    pub name: &'static str,
    pub text_len: Option<usize>,
}

pub fn num(name: &'static str) -> Column {
    Column {
        name,
        text_len: None,
    }
}

pub fn text(name: &'static str, len: usize) -> Column {
    Column {
        name,
        text_len: Some(len),
    }
}

fn record(prefix: &str) -> Vec<u8> {
    let mut bytes = prefix.as_bytes().to_vec();
    bytes.resize(RECORD_LEN, b' ');
    bytes
}

fn pad(mut bytes: Vec<u8>, fill: u8) -> Vec<u8> {
    let padded = bytes.len().div_ceil(RECORD_LEN) * RECORD_LEN;
    bytes.resize(padded, fill);
    bytes
}

pub fn ibm(value: f64) -> [u8; 8] {
    if value == 0.0 {
        return [0; 8];
    }
    let sign: u64 = if value < 0.0 { 1 << 63 } else { 0 };
    let mut v = value.abs();
    let mut exponent = 64u64;
    while v >= 1.0 {
        v /= 16.0;
        exponent += 1;
    }
    while v < 0.0625 {
        v *= 16.0;
        exponent -= 1;
    }
    let fraction = (v * 2f64.powi(56)) as u64;
    (sign | (exponent << 56) | fraction).to_be_bytes()
}

pub fn xpt(member: &str, columns: &[Column], rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut file = record(
        "HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!000000000000000000000000000000",
    );
    file.extend(record("SAS     SAS     SASLIB  9.4     X64_10PR"));
    file.extend(record("01JAN20:00:00:00"));
    file.extend(record(
        "HEADER RECORD*******MEMBER  HEADER RECORD!!!!!!!000000000000000001600000000140",
    ));
    file.extend(record(
        "HEADER RECORD*******DSCRPTR HEADER RECORD!!!!!!!000000000000000000000000000000",
    ));
    file.extend(record(&format!("SAS     {:<8}SASDATA 9.4", member)));
    file.extend(record("01JAN20:00:00:00"));
    file.extend(record(&format!(
        "HEADER RECORD*******NAMESTR HEADER RECORD!!!!!!!000000{:04}00000000000000000000",
        columns.len()
    )));

    let mut namestrs = Vec::new();
    let mut position = 0usize;
    for (i, column) in columns.iter().enumerate() {
        let (kind, length) = match column.text_len {
            Some(len) => (2i16, len),
            None => (1i16, 8),
        };
        let mut raw = vec![0u8; 140];
        raw[0..2].copy_from_slice(&kind.to_be_bytes());
        raw[4..6].copy_from_slice(&(length as i16).to_be_bytes());
        raw[6..8].copy_from_slice(&((i + 1) as i16).to_be_bytes());
        raw[8..16].copy_from_slice(format!("{:<8}", column.name).as_bytes());
        raw[16..56].copy_from_slice(format!("{:<40}", column.name).as_bytes());
        raw[84..88].copy_from_slice(&(position as i32).to_be_bytes());
        namestrs.extend(raw);
        position += length;
    }
    file.extend(pad(namestrs, 0));

    file.extend(record(
        "HEADER RECORD*******OBS     HEADER RECORD!!!!!!!000000000000000000000000000000",
    ));
    let mut observations = Vec::new();
    for row in rows {
        for (cell, column) in row.iter().zip(columns) {
            match cell {
                Cell::Num(v) => observations.extend_from_slice(&ibm(*v)),
                Cell::Missing => observations.extend_from_slice(&[b'.', 0, 0, 0, 0, 0, 0, 0]),
                Cell::Text(s) => {
                    let mut bytes = s.as_bytes().to_vec();
                    bytes.resize(column.text_len.unwrap_or(8), b' ');
                    observations.extend(bytes);
                }
            }
        }
    }
    file.extend(pad(observations, b' '));
    file
}
