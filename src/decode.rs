//! Response body decoding into record batches.

use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;
use crate::types::{Record, RecordBatch};

/// Bodies shorter than this carry no records (`""`, `{}`, `[]`).
const MIN_PAYLOAD_LEN: usize = 3;

/// Shape of the response payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// A single JSON array of objects.
    #[default]
    Array,
    /// One JSON object per line.
    Lines,
}

/// Decode a successful response body.
pub fn decode(body: &[u8], format: BodyFormat) -> Result<RecordBatch, DecodeError> {
    if body.len() < MIN_PAYLOAD_LEN {
        return Ok(RecordBatch::default());
    }
    let records = match format {
        BodyFormat::Array => decode_array(body)?,
        BodyFormat::Lines => decode_lines(body)?,
    };
    Ok(RecordBatch::new(records))
}

fn decode_array(body: &[u8]) -> Result<Vec<Record>, DecodeError> {
    let Value::Array(items) = serde_json::from_slice::<Value>(body)? else {
        return Err(DecodeError::NotAnArray);
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(DecodeError::NotAnObject { index }),
        })
        .collect()
}

fn decode_lines(body: &[u8]) -> Result<Vec<Record>, DecodeError> {
    let mut records = Vec::new();
    for (idx, line) in body.split(|b| *b == b'\n').enumerate() {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_slice(line).map_err(|source| DecodeError::Line {
            line: idx + 1,
            source,
        })?;
        match value {
            Value::Object(record) => records.push(record),
            _ => {
                return Err(DecodeError::NotAnObject {
                    index: records.len(),
                })
            }
        }
    }
    Ok(records)
}
