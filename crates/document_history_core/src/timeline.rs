//! crates/document_history_core/src/timeline.rs
//!
//! The history read model: turns stored audit entries into a labeled,
//! display-ordered timeline.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{ActionType, HistoryEntry, User};
use crate::error::{DataIntegrityError, TimelineError};
use crate::history::AuditHistoryLog;

/// Format of `TimelineEntry::display_timestamp`, e.g. `05/12/2023 10:45 AM`.
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimelineOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl TimelineOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "newest_first" => Some(TimelineOrder::NewestFirst),
            "oldest_first" => Some(TimelineOrder::OldestFirst),
            _ => None,
        }
    }
}

/// One displayable row of a document's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub sequence: u64,
    pub action: ActionType,
    pub icon: &'static str,
    /// The description when present, otherwise the action's default label.
    pub label: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub display_timestamp: String,
    pub user: User,
}

pub struct HistoryTimeline {
    log: Arc<AuditHistoryLog>,
    display_offset: FixedOffset,
    order: TimelineOrder,
}

impl HistoryTimeline {
    /// Displays in UTC, newest first.
    pub fn new(log: Arc<AuditHistoryLog>) -> Self {
        Self {
            log,
            display_offset: utc_offset(),
            order: TimelineOrder::default(),
        }
    }

    pub fn with_display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    pub fn with_order(mut self, order: TimelineOrder) -> Self {
        self.order = order;
        self
    }

    /// Builds the document's timeline. Side-effect free.
    pub async fn build_timeline(&self, document_id: Uuid) -> Result<Vec<TimelineEntry>, TimelineError> {
        let entries = self
            .log
            .entries(document_id)
            .await
            .map_err(|e| TimelineError::from_port(document_id, e))?;
        let mut timeline = entries
            .into_iter()
            .map(|entry| self.format_entry(entry))
            .collect::<Result<Vec<_>, _>>()?;

        if self.order == TimelineOrder::NewestFirst {
            timeline.reverse();
        }
        Ok(timeline)
    }

    pub fn format_entry(&self, entry: HistoryEntry) -> Result<TimelineEntry, DataIntegrityError> {
        let user = entry.user.ok_or(DataIntegrityError {
            entry_id: entry.id,
            document_id: entry.document_id,
            missing: "acting user",
        })?;

        let label = entry
            .description
            .clone()
            .unwrap_or_else(|| entry.action.default_label().to_string());

        Ok(TimelineEntry {
            id: entry.id,
            sequence: entry.sequence,
            icon: entry.action.icon(),
            action: entry.action,
            label,
            description: entry.description,
            occurred_at: entry.occurred_at,
            display_timestamp: format_timestamp(entry.occurred_at, self.display_offset),
            user,
        })
    }
}

pub fn format_timestamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewHistoryEntry;
    use crate::memory::InMemoryStore;
    use crate::ports::{HistoryStore, HistoryStream, PortError, PortResult};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use futures::stream;

    fn dana() -> User {
        User {
            user_id: Uuid::new_v4(),
            display_name: "Dana Reyes".to_string(),
        }
    }

    fn entry(action: ActionType, description: Option<&str>, user: Option<User>) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            sequence: 1,
            action,
            description: description.map(str::to_string),
            occurred_at: Utc.with_ymd_and_hms(2023, 5, 12, 10, 45, 0).unwrap(),
            user,
        }
    }

    fn timeline() -> HistoryTimeline {
        HistoryTimeline::new(Arc::new(AuditHistoryLog::new(Arc::new(InMemoryStore::new()))))
    }

    #[test]
    fn timestamps_use_twelve_hour_clock() {
        let at = Utc.with_ymd_and_hms(2023, 5, 12, 10, 45, 0).unwrap();
        assert_eq!(format_timestamp(at, utc_offset()), "05/12/2023 10:45 AM");

        let evening = Utc.with_ymd_and_hms(2023, 5, 12, 22, 5, 0).unwrap();
        assert_eq!(format_timestamp(evening, utc_offset()), "05/12/2023 10:05 PM");
    }

    #[test]
    fn timestamps_follow_display_offset() {
        let at = Utc.with_ymd_and_hms(2023, 5, 12, 2, 30, 0).unwrap();
        let eastern = FixedOffset::west_opt(4 * 3600).unwrap();
        assert_eq!(format_timestamp(at, eastern), "05/11/2023 10:30 PM");
    }

    #[test]
    fn default_labels_and_icons() {
        let t = timeline();
        let cases = [
            (ActionType::View, "eye", "Document viewed"),
            (ActionType::Create, "plus-circle", "Document uploaded"),
            (ActionType::UpdateMetadata, "edit", "Changed"),
            (ActionType::Process, "check-circle", "Marked as processed"),
            (ActionType::Unprocess, "undo", "Unmarked as processed"),
            (ActionType::Trash, "trash", "Moved to trash"),
            (ActionType::Restore, "restore", "Restored from trash"),
            (ActionType::Other("SHARE".to_string()), "info-circle", "Unknown action"),
        ];
        for (action, icon, label) in cases {
            let row = t.format_entry(entry(action, None, Some(dana()))).unwrap();
            assert_eq!(row.icon, icon);
            assert_eq!(row.label, label);
            assert_eq!(row.display_timestamp, "05/12/2023 10:45 AM");
        }
    }

    #[test]
    fn description_overrides_label() {
        let description =
            "Changed Document Description from \"Policy Document\" to \"Policy Renewal Notice\"";
        let row = timeline()
            .format_entry(entry(ActionType::UpdateMetadata, Some(description), Some(dana())))
            .unwrap();
        assert_eq!(row.label, description);
        assert_eq!(row.icon, "edit");
    }

    #[test]
    fn missing_user_is_an_integrity_error() {
        let raw = entry(ActionType::Trash, None, None);
        let err = timeline().format_entry(raw.clone()).unwrap_err();
        assert_eq!(err.entry_id, raw.id);
        assert_eq!(err.missing, "acting user");
    }

    #[tokio::test]
    async fn order_is_configurable() {
        let log = Arc::new(AuditHistoryLog::new(Arc::new(InMemoryStore::new())));
        let document_id = Uuid::new_v4();
        for action in [ActionType::Create, ActionType::Process, ActionType::Trash] {
            log.append(NewHistoryEntry {
                document_id,
                action,
                description: None,
                occurred_at: Utc::now(),
                user: Some(dana()),
            })
            .await
            .unwrap();
        }

        let newest = HistoryTimeline::new(log.clone()).build_timeline(document_id).await.unwrap();
        let oldest = HistoryTimeline::new(log)
            .with_order(TimelineOrder::OldestFirst)
            .build_timeline(document_id)
            .await
            .unwrap();

        let seq = |rows: &[TimelineEntry]| rows.iter().map(|r| r.sequence).collect::<Vec<_>>();
        assert_eq!(seq(&newest), vec![3, 2, 1]);
        assert_eq!(seq(&oldest), vec![1, 2, 3]);
    }

    #[test]
    fn order_parses_from_config_strings() {
        assert_eq!(TimelineOrder::parse("oldest_first"), Some(TimelineOrder::OldestFirst));
        assert_eq!(TimelineOrder::parse("NEWEST_FIRST"), Some(TimelineOrder::NewestFirst));
        assert_eq!(TimelineOrder::parse("sideways"), None);
    }

    /// A history store that reports every read with the given error.
    struct FailingReads(PortError);

    #[async_trait]
    impl HistoryStore for FailingReads {
        async fn append_history_entry(&self, _entry: &HistoryEntry) -> PortResult<()> {
            Ok(())
        }

        fn query_history(&self, _document_id: Uuid) -> HistoryStream {
            Box::pin(stream::iter(vec![Err(self.0.clone())]))
        }

        async fn last_sequence(&self, _document_id: Uuid) -> PortResult<u64> {
            Ok(0)
        }

        async fn purge_history(&self, _document_id: Uuid) -> PortResult<()> {
            Ok(())
        }
    }

    async fn build_with(err: PortError, document_id: Uuid) -> TimelineError {
        let log = Arc::new(AuditHistoryLog::new(Arc::new(FailingReads(err))));
        HistoryTimeline::new(log).build_timeline(document_id).await.unwrap_err()
    }

    #[tokio::test]
    async fn store_errors_keep_their_kind() {
        let document_id = Uuid::new_v4();

        let missing = build_with(PortError::NotFound("gone".to_string()), document_id).await;
        assert!(matches!(missing, TimelineError::NotFound(id) if id == document_id));

        let down = build_with(PortError::Unavailable("timeout".to_string()), document_id).await;
        assert!(matches!(down, TimelineError::Unavailable(msg) if msg == "timeout"));
    }
}
