//! Reader for SAS transport (XPORT v5) files, the `.XPT` format the survey
//! portal publishes.
//!
//! The file is a sequence of 80-byte records: library headers, one member
//! header block per dataset, the variable descriptors ("namestr" records)
//! and finally the packed observations. Numbers are stored as IBM/360
//! hexadecimal floating point. Only the first member is read.

use crate::utils::error::{EtlError, Result};

const RECORD_LEN: usize = 80;
const HEADER_PREFIX_LEN: usize = 48;

const LIBRARY_HEADER: &[u8] = b"HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!";
const MEMBER_HEADER: &[u8] = b"HEADER RECORD*******MEMBER  HEADER RECORD!!!!!!!";
const DESCRIPTOR_HEADER: &[u8] = b"HEADER RECORD*******DSCRPTR HEADER RECORD!!!!!!!";
const NAMESTR_HEADER: &[u8] = b"HEADER RECORD*******NAMESTR HEADER RECORD!!!!!!!";
const OBS_HEADER: &[u8] = b"HEADER RECORD*******OBS     HEADER RECORD!!!!!!!";

const DEFAULT_NAMESTR_LEN: usize = 140;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Numeric,
    Character,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XportVariable {
    pub name: String,
    pub label: String,
    pub kind: VariableKind,
    pub length: usize,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XportValue {
    /// `None` for any of the SAS missing values (`.`, `._`, `.A`-`.Z`).
    Number(Option<f64>),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XportDataset {
    pub name: String,
    pub variables: Vec<XportVariable>,
    pub rows: Vec<Vec<XportValue>>,
}

impl XportDataset {
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v.name == name)
    }
}

struct RecordCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> RecordCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.offset + len;
        if end > self.bytes.len() {
            return Err(xport_error(format!(
                "truncated file while reading {} at byte {}",
                what, self.offset
            )));
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn next_record(&mut self, what: &str) -> Result<&'a [u8]> {
        self.take(RECORD_LEN, what)
    }

    /// Reads `len` bytes and skips the padding up to the next record boundary.
    fn take_padded(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let padded = len.div_ceil(RECORD_LEN) * RECORD_LEN;
        let block = self.take(padded, what)?;
        Ok(&block[..len])
    }

    fn expect_header(&mut self, prefix: &[u8], what: &str) -> Result<&'a [u8]> {
        let record = self.next_record(what)?;
        if !record.starts_with(prefix) {
            return Err(xport_error(format!(
                "expected {} header at byte {}, found {:?}",
                what,
                self.offset - RECORD_LEN,
                String::from_utf8_lossy(&record[..HEADER_PREFIX_LEN])
            )));
        }
        Ok(record)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }
}

fn xport_error(message: String) -> EtlError {
    EtlError::XportError { message }
}

/// Decodes the first member of an XPORT v5 file.
pub fn parse(bytes: &[u8]) -> Result<XportDataset> {
    let mut cursor = RecordCursor::new(bytes);

    cursor.expect_header(LIBRARY_HEADER, "library")?;
    // Library descriptor and modification-date records.
    cursor.next_record("library descriptor")?;
    cursor.next_record("library descriptor")?;

    let member = cursor.expect_header(MEMBER_HEADER, "member")?;
    let namestr_len = parse_ascii_number(&member[74..78]).unwrap_or(DEFAULT_NAMESTR_LEN);
    if namestr_len != 140 && namestr_len != 136 {
        return Err(xport_error(format!(
            "unsupported namestr length {}",
            namestr_len
        )));
    }

    cursor.expect_header(DESCRIPTOR_HEADER, "descriptor")?;
    let descriptor = cursor.next_record("member descriptor")?;
    let name = decode_text(&descriptor[8..16]);
    cursor.next_record("member descriptor")?;

    let namestr_header = cursor.expect_header(NAMESTR_HEADER, "namestr")?;
    let variable_count = parse_ascii_number(&namestr_header[54..58])
        .ok_or_else(|| xport_error("unreadable variable count in namestr header".to_string()))?;

    let namestrs = cursor.take_padded(variable_count * namestr_len, "namestr records")?;
    let variables = namestrs
        .chunks_exact(namestr_len)
        .map(parse_namestr)
        .collect::<Result<Vec<_>>>()?;

    cursor.expect_header(OBS_HEADER, "observation")?;
    let rows = parse_observations(cursor.rest(), &variables)?;

    tracing::debug!(
        "Decoded XPORT member {} with {} variables and {} rows",
        name,
        variables.len(),
        rows.len()
    );

    Ok(XportDataset {
        name,
        variables,
        rows,
    })
}

fn parse_namestr(raw: &[u8]) -> Result<XportVariable> {
    let kind = match read_i16(&raw[0..2]) {
        1 => VariableKind::Numeric,
        2 => VariableKind::Character,
        other => return Err(xport_error(format!("unknown variable type {}", other))),
    };
    let length = read_i16(&raw[4..6]);
    let position = read_i32(&raw[84..88]);
    if length <= 0 || position < 0 {
        return Err(xport_error(format!(
            "invalid variable layout (length {}, position {})",
            length, position
        )));
    }
    let length = length as usize;
    if kind == VariableKind::Numeric && !(2..=8).contains(&length) {
        return Err(xport_error(format!("invalid numeric length {}", length)));
    }

    Ok(XportVariable {
        name: decode_text(&raw[8..16]),
        label: decode_text(&raw[16..56]),
        kind,
        length,
        position: position as usize,
    })
}

fn parse_observations(data: &[u8], variables: &[XportVariable]) -> Result<Vec<Vec<XportValue>>> {
    let row_len = variables
        .iter()
        .map(|v| v.position + v.length)
        .max()
        .unwrap_or(0);
    if row_len == 0 {
        return Ok(Vec::new());
    }

    let data = &data[..member_end(data)];
    let mut count = data.len() / row_len;

    // Blank padding at the end of the last record is not an observation.
    let padding_start = data.len().saturating_sub(RECORD_LEN);
    while count > 0 {
        let start = (count - 1) * row_len;
        let row = &data[start..start + row_len];
        if start >= padding_start && row.iter().all(|&b| b == b' ') {
            count -= 1;
        } else {
            break;
        }
    }

    let rows = data[..count * row_len]
        .chunks_exact(row_len)
        .map(|row| {
            variables
                .iter()
                .map(|v| {
                    let cell = &row[v.position..v.position + v.length];
                    match v.kind {
                        VariableKind::Numeric => XportValue::Number(decode_number(cell)),
                        VariableKind::Character => XportValue::Text(decode_text(cell)),
                    }
                })
                .collect()
        })
        .collect();

    Ok(rows)
}

/// Observation bytes stop where the next member begins, if there is one.
fn member_end(data: &[u8]) -> usize {
    (0..data.len())
        .step_by(RECORD_LEN)
        .find(|&offset| data[offset..].starts_with(MEMBER_HEADER))
        .unwrap_or(data.len())
}

fn decode_number(cell: &[u8]) -> Option<f64> {
    let mut bytes = [0u8; 8];
    bytes[..cell.len()].copy_from_slice(cell);

    let first = bytes[0];
    let is_missing_marker = first == b'.' || first == b'_' || first.is_ascii_uppercase();
    if is_missing_marker && bytes[1..].iter().all(|&b| b == 0) {
        return None;
    }

    Some(ibm_to_f64(bytes))
}

/// IBM hexadecimal float: sign bit, 7-bit base-16 exponent biased by 64,
/// 56-bit fraction with the radix point before the first digit.
pub fn ibm_to_f64(bytes: [u8; 8]) -> f64 {
    let bits = u64::from_be_bytes(bytes);
    let negative = bits >> 63 == 1;
    let exponent = ((bits >> 56) & 0x7f) as i32;
    let fraction = bits & 0x00ff_ffff_ffff_ffff;

    if fraction == 0 {
        return 0.0;
    }

    // Scaling by a power of two is exact, so the only rounding is the u64 -> f64 step.
    let magnitude = fraction as f64 * 2f64.powi(4 * (exponent - 64) - 56);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn decode_text(raw: &[u8]) -> String {
    let end = raw
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    let raw = &raw[..end];
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        // Transport files are usually Latin-1.
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}

fn parse_ascii_number(raw: &[u8]) -> Option<usize> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

fn read_i16(raw: &[u8]) -> i16 {
    i16::from_be_bytes([raw[0], raw[1]])
}

fn read_i32(raw: &[u8]) -> i32 {
    i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
}
