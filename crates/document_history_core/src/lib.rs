pub mod document;
pub mod domain;
pub mod emitter;
pub mod error;
pub mod events;
pub mod history;
pub mod listeners;
pub mod memory;
pub mod ports;
pub mod retention;
pub mod service;
pub mod timeline;

pub use document::Document;
pub use domain::{
    ActionType, DocumentMetadata, FieldChange, FieldChanges, HistoryEntry, MetadataChanges,
    MetadataField, NewHistoryEntry, User,
};
pub use emitter::{DispatchReport, EventEmitter};
pub use error::{DataIntegrityError, DocumentError, TimelineError, ValidationError};
pub use events::{LifecycleEvent, LifecycleEventKind};
pub use history::AuditHistoryLog;
pub use listeners::{AuditTrailListener, EventLogListener};
pub use memory::InMemoryStore;
pub use ports::{
    DocumentRepository, HistoryStore, HistoryStream, LifecycleListener, PortError, PortResult,
    UserDirectory,
};
pub use retention::{RetentionPolicy, RetentionSweeper, SweepReport};
pub use service::{DocumentService, MutationOutcome};
pub use timeline::{HistoryTimeline, TimelineEntry, TimelineOrder};
