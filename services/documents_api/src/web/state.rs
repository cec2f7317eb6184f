//! services/documents_api/src/web/state.rs
//!
//! Defines the application's shared state and the explicit wiring of the
//! core components behind it.

use chrono::FixedOffset;
use document_history_core::ports::{DocumentRepository, HistoryStore, LifecycleListener, UserDirectory};
use document_history_core::{
    AuditHistoryLog, AuditTrailListener, DocumentService, EventEmitter, EventLogListener,
    HistoryTimeline, TimelineOrder,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<DocumentService>,
    pub timeline: Arc<HistoryTimeline>,
    pub history: Arc<AuditHistoryLog>,
}

/// How history timelines are presented.
#[derive(Debug, Clone, Copy)]
pub struct TimelineSettings {
    pub display_offset: FixedOffset,
    pub order: TimelineOrder,
}

impl AppState {
    /// Wires the core around the given persistence adapters.
    ///
    /// Listeners run in the order registered here: history first, then the
    /// event log.
    pub fn build(
        documents: Arc<dyn DocumentRepository>,
        history_store: Arc<dyn HistoryStore>,
        users: Arc<dyn UserDirectory>,
        settings: TimelineSettings,
    ) -> Self {
        let history = Arc::new(AuditHistoryLog::new(history_store));
        let listeners: Vec<Arc<dyn LifecycleListener>> = vec![
            Arc::new(AuditTrailListener::new(history.clone(), users)),
            Arc::new(EventLogListener),
        ];
        let emitter = Arc::new(EventEmitter::new(listeners));

        let timeline = HistoryTimeline::new(history.clone())
            .with_display_offset(settings.display_offset)
            .with_order(settings.order);

        Self {
            documents: Arc::new(DocumentService::new(documents, emitter)),
            timeline: Arc::new(timeline),
            history,
        }
    }
}
