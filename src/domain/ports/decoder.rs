use bytes::Bytes;

use super::errors::DecodeError;
use crate::domain::models::{FileFormat, ObjectMeta, RowBatch};

/// Turns the bytes of one object into row batches.
pub trait BatchDecoder: Send + Sync {
    fn decode(
        &self,
        format: FileFormat,
        object: &ObjectMeta,
        bytes: Bytes,
    ) -> Result<Vec<RowBatch>, DecodeError>;
}
