//! Execution state and the data a scan produces.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::scan::FileFormat;

/// Phase of a single scan execution.
///
/// `Planned → Resolving → Opening → Reading → Succeeded`, with a direct
/// edge to `Failed` from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Planned,
    Resolving,
    Opening,
    Reading,
    Succeeded,
    Failed,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Resolving => "resolving",
            Self::Opening => "opening",
            Self::Reading => "reading",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn valid_transitions(&self) -> &'static [ExecutionState] {
        match self {
            Self::Planned => &[Self::Resolving, Self::Failed],
            Self::Resolving => &[Self::Opening, Self::Failed],
            Self::Opening => &[Self::Reading, Self::Failed],
            Self::Reading => &[Self::Succeeded, Self::Failed],
            Self::Succeeded | Self::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// An object found while opening a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Location within the store, as accepted by `ObjectStoreClient::get`.
    pub location: String,
    pub size: u64,
}

/// Rows handed to downstream plan nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum RowPayload {
    /// Undecoded object bytes, for decoders living further down the plan.
    Raw(Bytes),
    /// Decoded records.
    Records(Vec<serde_json::Value>),
}

/// One batch of rows read from one object.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    pub source: String,
    pub format: FileFormat,
    pub payload: RowPayload,
}

impl RowBatch {
    /// Number of decoded records, `None` for raw payloads.
    pub fn num_rows(&self) -> Option<usize> {
        match &self.payload {
            RowPayload::Raw(_) => None,
            RowPayload::Records(rows) => Some(rows.len()),
        }
    }

    pub fn byte_len(&self) -> Option<usize> {
        match &self.payload {
            RowPayload::Raw(bytes) => Some(bytes.len()),
            RowPayload::Records(_) => None,
        }
    }
}
