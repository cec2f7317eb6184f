//! crates/document_history_core/src/document.rs
//!
//! The document entity and its lifecycle operations.
//!
//! Operations validate their preconditions, mutate in-memory state, and hand
//! back what changed so the caller can build the matching lifecycle event.
//! Nothing here writes audit history.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{normalize_value, DocumentMetadata, FieldChange, FieldChanges, MetadataChanges};
use crate::error::ValidationError;

/// An uploaded insurance document.
///
/// `processed` and `trashed` are independent: trashing keeps the processed
/// value, and restoring brings it back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    pub metadata: DocumentMetadata,
    pub processed: bool,
    pub trashed: bool,
    pub trashed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a new, unprocessed and active document.
    pub fn new(filename: impl Into<String>, metadata: DocumentMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            metadata,
            processed: false,
            trashed: false,
            trashed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies metadata edits and returns the fields whose value changed.
    ///
    /// Values are trimmed and an empty value clears the field. Fails without
    /// touching the document if it is processed, if any value is too long, or
    /// if nothing would change.
    pub fn update_metadata(
        &mut self,
        changes: &MetadataChanges,
        now: DateTime<Utc>,
    ) -> Result<FieldChanges, ValidationError> {
        if self.processed {
            return Err(ValidationError::DocumentProcessed);
        }

        let mut applied = FieldChanges::new();
        for (&field, raw) in changes {
            let new = normalize_value(field, raw)?;
            let old = self.metadata.get(field).map(str::to_string);
            if old != new {
                applied.insert(field, FieldChange { old, new });
            }
        }

        if applied.is_empty() {
            return Err(ValidationError::NoChanges);
        }

        for (&field, change) in &applied {
            self.metadata.set(field, change.new.clone());
        }
        self.updated_at = now;
        Ok(applied)
    }

    /// Sets the processed flag, returning the resulting state.
    pub fn set_processed(&mut self, processed: bool, now: DateTime<Utc>) -> Result<bool, ValidationError> {
        if self.processed == processed {
            return Err(ValidationError::ProcessedUnchanged { processed });
        }
        self.processed = processed;
        self.updated_at = now;
        Ok(processed)
    }

    /// Moves the document to the trash.
    pub fn trash(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.trashed {
            return Err(ValidationError::AlreadyTrashed);
        }
        self.trashed = true;
        self.trashed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Brings a trashed document back.
    pub fn restore(&mut self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if !self.trashed {
            return Err(ValidationError::NotTrashed);
        }
        self.trashed = false;
        self.trashed_at = None;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MetadataField, MAX_METADATA_VALUE_LEN};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 5, 12, hour, 0, 0).unwrap()
    }

    fn doc() -> Document {
        let metadata = DocumentMetadata {
            description: Some("Policy Document".to_string()),
            ..Default::default()
        };
        Document::new("policy.pdf", metadata, at(8))
    }

    fn changes(pairs: &[(MetadataField, &str)]) -> MetadataChanges {
        pairs.iter().map(|(f, v)| (*f, v.to_string())).collect()
    }

    #[test]
    fn update_metadata_reports_old_and_new_values() {
        let mut d = doc();
        let applied = d
            .update_metadata(
                &changes(&[(MetadataField::Description, "Policy Renewal Notice")]),
                at(9),
            )
            .unwrap();

        assert_eq!(
            applied.get(&MetadataField::Description),
            Some(&FieldChange {
                old: Some("Policy Document".to_string()),
                new: Some("Policy Renewal Notice".to_string()),
            })
        );
        assert_eq!(d.metadata.description.as_deref(), Some("Policy Renewal Notice"));
        assert_eq!(d.updated_at, at(9));
    }

    #[test]
    fn unchanged_fields_are_not_reported() {
        let mut d = doc();
        let applied = d
            .update_metadata(
                &changes(&[
                    (MetadataField::Description, "  Policy Document "),
                    (MetadataField::AssignedTo, "456"),
                ]),
                at(9),
            )
            .unwrap();
        assert_eq!(applied.len(), 1);
        assert!(applied.contains_key(&MetadataField::AssignedTo));
    }

    #[test]
    fn empty_value_clears_a_field() {
        let mut d = doc();
        let applied = d
            .update_metadata(&changes(&[(MetadataField::Description, "")]), at(9))
            .unwrap();
        assert_eq!(applied[&MetadataField::Description].new, None);
        assert_eq!(d.metadata.description, None);
    }

    #[test]
    fn no_effective_change_is_rejected() {
        let mut d = doc();
        let err = d
            .update_metadata(&changes(&[(MetadataField::Description, "Policy Document")]), at(9))
            .unwrap_err();
        assert_eq!(err, ValidationError::NoChanges);
        assert_eq!(d.updated_at, at(8));
    }

    #[test]
    fn processed_document_rejects_metadata_edits_until_unprocessed() {
        let mut d = doc();
        d.set_processed(true, at(9)).unwrap();
        let edit = changes(&[(MetadataField::AssignedTo, "456")]);

        assert_eq!(
            d.update_metadata(&edit, at(10)).unwrap_err(),
            ValidationError::DocumentProcessed
        );
        assert_eq!(d.metadata.assigned_to, None);

        d.set_processed(false, at(11)).unwrap();
        assert!(d.update_metadata(&edit, at(12)).is_ok());
    }

    #[test]
    fn too_long_value_leaves_document_untouched() {
        let mut d = doc();
        let long = "x".repeat(MAX_METADATA_VALUE_LEN + 1);
        let err = d
            .update_metadata(
                &changes(&[(MetadataField::AssignedTo, "456"), (MetadataField::Claimant, &long)]),
                at(9),
            )
            .unwrap_err();
        assert_eq!(err, ValidationError::ValueTooLong { field: MetadataField::Claimant });
        assert_eq!(d.metadata.assigned_to, None);
    }

    #[test]
    fn setting_same_processed_state_is_rejected() {
        let mut d = doc();
        assert_eq!(
            d.set_processed(false, at(9)).unwrap_err(),
            ValidationError::ProcessedUnchanged { processed: false }
        );
    }

    #[test]
    fn trash_and_restore_keep_processed_flag() {
        let mut d = doc();
        d.set_processed(true, at(9)).unwrap();

        d.trash(at(10)).unwrap();
        assert!(d.trashed);
        assert!(d.processed);
        assert_eq!(d.trashed_at, Some(at(10)));
        assert_eq!(d.trash(at(11)).unwrap_err(), ValidationError::AlreadyTrashed);

        d.restore(at(12)).unwrap();
        assert!(!d.trashed);
        assert!(d.processed);
        assert_eq!(d.trashed_at, None);
        assert_eq!(d.restore(at(13)).unwrap_err(), ValidationError::NotTrashed);
    }
}
