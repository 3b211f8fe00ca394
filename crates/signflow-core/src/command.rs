use serde::{Deserialize, Serialize};

use crate::operations::{EditRequest, SignatureRequest};
use crate::storage::DocumentStatus;

/// One edit action against a stored document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum EditCommand {
    Sign(SignatureRequest),
    ApplyEdits(EditRequest),
    SaveHtml { html: String },
}

impl EditCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EditCommand::Sign(_) => "Sign",
            EditCommand::ApplyEdits(_) => "ApplyEdits",
            EditCommand::SaveHtml { .. } => "SaveHtml",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub document_id: u64,
    pub status: DocumentStatus,
    pub output_size_bytes: usize,
    pub processing_time_ms: u64,
}
