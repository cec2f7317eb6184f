//! crates/document_history_core/src/domain.rs
//!
//! Defines the pure, core data structures for document metadata, users and
//! audit history. These structs are independent of any database or
//! serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Longest value accepted for any metadata field.
pub const MAX_METADATA_VALUE_LEN: usize = 255;

//=========================================================================================
// Metadata
//=========================================================================================

/// The editable metadata fields of a document, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    PolicyNumber,
    LossSequence,
    Claimant,
    Description,
    AssignedTo,
    ProducerNumber,
}

impl MetadataField {
    pub const ALL: [MetadataField; 6] = [
        MetadataField::PolicyNumber,
        MetadataField::LossSequence,
        MetadataField::Claimant,
        MetadataField::Description,
        MetadataField::AssignedTo,
        MetadataField::ProducerNumber,
    ];

    /// The name used for this field on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::PolicyNumber => "policyNumber",
            MetadataField::LossSequence => "lossSequence",
            MetadataField::Claimant => "claimant",
            MetadataField::Description => "description",
            MetadataField::AssignedTo => "assignedTo",
            MetadataField::ProducerNumber => "producerNumber",
        }
    }

    /// Human-readable label used in history descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            MetadataField::PolicyNumber => "Policy Number",
            MetadataField::LossSequence => "Loss Sequence",
            MetadataField::Claimant => "Claimant",
            MetadataField::Description => "Document Description",
            MetadataField::AssignedTo => "Assigned To",
            MetadataField::ProducerNumber => "Producer Number",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetadataField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownField(s.to_string()))
    }
}

/// The metadata attached to a document. Absent values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub policy_number: Option<String>,
    pub loss_sequence: Option<String>,
    pub claimant: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub producer_number: Option<String>,
}

impl DocumentMetadata {
    /// Builds initial metadata under the same rules as an edit: values are
    /// trimmed, empty values stay unset, and overlong values are rejected.
    pub fn from_changes(changes: &MetadataChanges) -> Result<Self, ValidationError> {
        let mut metadata = Self::default();
        for (&field, raw) in changes {
            metadata.set(field, normalize_value(field, raw)?);
        }
        Ok(metadata)
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: MetadataField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: MetadataField) -> &Option<String> {
        match field {
            MetadataField::PolicyNumber => &self.policy_number,
            MetadataField::LossSequence => &self.loss_sequence,
            MetadataField::Claimant => &self.claimant,
            MetadataField::Description => &self.description,
            MetadataField::AssignedTo => &self.assigned_to,
            MetadataField::ProducerNumber => &self.producer_number,
        }
    }

    fn slot_mut(&mut self, field: MetadataField) -> &mut Option<String> {
        match field {
            MetadataField::PolicyNumber => &mut self.policy_number,
            MetadataField::LossSequence => &mut self.loss_sequence,
            MetadataField::Claimant => &mut self.claimant,
            MetadataField::Description => &mut self.description,
            MetadataField::AssignedTo => &mut self.assigned_to,
            MetadataField::ProducerNumber => &mut self.producer_number,
        }
    }
}

/// Requested metadata edits. An empty string clears the field.
pub type MetadataChanges = BTreeMap<MetadataField, String>;

/// Trims a raw value, mapping empty to `None`.
pub fn normalize_value(field: MetadataField, raw: &str) -> Result<Option<String>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > MAX_METADATA_VALUE_LEN {
        return Err(ValidationError::ValueTooLong { field });
    }
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// The before and after value of one metadata field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// The fields that actually changed in one metadata update, in field order.
pub type FieldChanges = BTreeMap<MetadataField, FieldChange>;

//=========================================================================================
// Users
//=========================================================================================

/// A user who can act on documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub display_name: String,
}

//=========================================================================================
// Audit History
//=========================================================================================

/// The kind of action an audit history entry records.
///
/// `Other` keeps action strings read back from storage that this build does
/// not recognize, so they can still be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionType {
    View,
    Create,
    UpdateMetadata,
    Process,
    Unprocess,
    Trash,
    Restore,
    Other(String),
}

impl ActionType {
    pub fn as_str(&self) -> &str {
        match self {
            ActionType::View => "VIEW",
            ActionType::Create => "CREATE",
            ActionType::UpdateMetadata => "UPDATE_METADATA",
            ActionType::Process => "PROCESS",
            ActionType::Unprocess => "UNPROCESS",
            ActionType::Trash => "TRASH",
            ActionType::Restore => "RESTORE",
            ActionType::Other(raw) => raw,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ActionType::View => "eye",
            ActionType::Create => "plus-circle",
            ActionType::UpdateMetadata => "edit",
            ActionType::Process => "check-circle",
            ActionType::Unprocess => "undo",
            ActionType::Trash => "trash",
            ActionType::Restore => "restore",
            ActionType::Other(_) => "info-circle",
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            ActionType::View => "Document viewed",
            ActionType::Create => "Document uploaded",
            ActionType::UpdateMetadata => "Changed",
            ActionType::Process => "Marked as processed",
            ActionType::Unprocess => "Unmarked as processed",
            ActionType::Trash => "Moved to trash",
            ActionType::Restore => "Restored from trash",
            ActionType::Other(_) => "Unknown action",
        }
    }
}

impl From<&str> for ActionType {
    fn from(raw: &str) -> Self {
        match raw {
            "VIEW" => ActionType::View,
            "CREATE" => ActionType::Create,
            "UPDATE_METADATA" => ActionType::UpdateMetadata,
            "PROCESS" => ActionType::Process,
            "UNPROCESS" => ActionType::Unprocess,
            "TRASH" => ActionType::Trash,
            "RESTORE" => ActionType::Restore,
            other => ActionType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An audit entry that has not been sequenced yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub document_id: Uuid,
    pub action: ActionType,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub user: Option<User>,
}

/// A stored audit history entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub document_id: Uuid,
    /// Position within the document's history, starting at 1.
    pub sequence: u64,
    pub action: ActionType,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// `None` only when storage lost the acting user.
    pub user: Option<User>,
}

impl HistoryEntry {
    pub fn from_new(entry: NewHistoryEntry, sequence: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: entry.document_id,
            sequence,
            action: entry.action,
            description: entry.description,
            occurred_at: entry.occurred_at,
            user: entry.user,
        }
    }
}
