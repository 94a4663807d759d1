//! Batch decoders.
//!
//! Row-level parsing of Parquet, CSV and IPC belongs to downstream plan
//! nodes; those formats are passed on as raw object bytes.

use bytes::Bytes;

use crate::domain::models::{FileFormat, ObjectMeta, RowBatch, RowPayload};
use crate::domain::ports::{BatchDecoder, DecodeError};

/// One raw batch per object, for every format.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBatchDecoder;

impl BatchDecoder for RawBatchDecoder {
    fn decode(
        &self,
        format: FileFormat,
        object: &ObjectMeta,
        bytes: Bytes,
    ) -> Result<Vec<RowBatch>, DecodeError> {
        Ok(vec![RowBatch {
            source: object.location.clone(),
            format,
            payload: RowPayload::Raw(bytes),
        }])
    }
}

/// Decodes NDJSON into records; other formats stay raw.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonDecoder;

impl BatchDecoder for NdjsonDecoder {
    fn decode(
        &self,
        format: FileFormat,
        object: &ObjectMeta,
        bytes: Bytes,
    ) -> Result<Vec<RowBatch>, DecodeError> {
        if format != FileFormat::Ndjson {
            return RawBatchDecoder.decode(format, object, bytes);
        }

        let malformed = |message: String| DecodeError::Malformed {
            location: object.location.clone(),
            format: format.to_string(),
            message,
        };
        let text = std::str::from_utf8(&bytes).map_err(|err| malformed(err.to_string()))?;

        let records = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line)
                    .map_err(|err| malformed(format!("line {}: {err}", index + 1)))
            })
            .collect::<Result<Vec<serde_json::Value>, _>>()?;

        Ok(vec![RowBatch {
            source: object.location.clone(),
            format,
            payload: RowPayload::Records(records),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(location: &str) -> ObjectMeta {
        ObjectMeta {
            location: location.to_string(),
            size: 0,
        }
    }

    #[test]
    fn test_ndjson_records() {
        let bytes = Bytes::from_static(b"{\"a\":1}\n\n{\"a\":2}\n");
        let batches = NdjsonDecoder
            .decode(FileFormat::Ndjson, &meta("rows.ndjson"), bytes)
            .unwrap();

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].num_rows(), Some(2));
        assert_eq!(
            batches[0].payload,
            RowPayload::Records(vec![json!({"a": 1}), json!({"a": 2})])
        );
    }

    #[test]
    fn test_ndjson_malformed_line_reports_location() {
        let bytes = Bytes::from_static(b"{\"a\":1}\n{oops\n");
        let err = NdjsonDecoder
            .decode(FileFormat::Ndjson, &meta("rows.ndjson"), bytes)
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("rows.ndjson"));
        assert!(message.contains("line 2"));
    }

    #[test]
    fn test_other_formats_pass_through() {
        let bytes = Bytes::from_static(b"PAR1");
        let batches = NdjsonDecoder
            .decode(FileFormat::Parquet, &meta("t.parquet"), bytes.clone())
            .unwrap();
        assert_eq!(batches[0].payload, RowPayload::Raw(bytes));
    }
}
