//! crates/document_history_core/src/emitter.rs
//!
//! Builds lifecycle events and hands them to an explicit, ordered list of
//! listeners.
//!
//! Dispatch is sequential and completes before `emit` returns. Each listener
//! is isolated: an error or a panic in one is logged and counted, and the
//! remaining listeners still run. The mutation that produced the event is
//! never rolled back.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::document::Document;
use crate::events::{LifecycleEvent, LifecycleEventKind};
use crate::ports::LifecycleListener;

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Names of listeners that failed, in registration order.
    pub failed: Vec<&'static str>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct EventEmitter {
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl EventEmitter {
    /// Creates an emitter that dispatches to `listeners` in the given order.
    pub fn new(listeners: Vec<Arc<dyn LifecycleListener>>) -> Self {
        Self { listeners }
    }

    /// Records `kind` as having happened to `document` at its `updated_at`.
    pub async fn emit(
        &self,
        document: &Document,
        user_id: Uuid,
        kind: LifecycleEventKind,
    ) -> DispatchReport {
        let event = LifecycleEvent {
            document_id: document.id,
            user_id,
            occurred_at: document.updated_at,
            kind,
        };
        self.dispatch(&event).await
    }

    pub async fn dispatch(&self, event: &LifecycleEvent) -> DispatchReport {
        let mut report = DispatchReport {
            delivered: 0,
            failed: Vec::new(),
        };

        for listener in &self.listeners {
            let outcome = AssertUnwindSafe(listener.handle(event)).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    error!(
                        listener = listener.name(),
                        event = event.event_type(),
                        document_id = %event.document_id,
                        error = %e,
                        "Lifecycle listener failed"
                    );
                    report.failed.push(listener.name());
                }
                Err(_) => {
                    error!(
                        listener = listener.name(),
                        event = event.event_type(),
                        document_id = %event.document_id,
                        "Lifecycle listener panicked"
                    );
                    report.failed.push(listener.name());
                }
            }
        }

        debug!(
            event = event.event_type(),
            document_id = %event.document_id,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Lifecycle event dispatched"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentMetadata;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl LifecycleListener for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, _event: &LifecycleEvent) -> PortResult<()> {
            self.seen.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl LifecycleListener for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _event: &LifecycleEvent) -> PortResult<()> {
            Err(PortError::Unavailable("store offline".to_string()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl LifecycleListener for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn handle(&self, _event: &LifecycleEvent) -> PortResult<()> {
            panic!("listener bug");
        }
    }

    fn recorder(name: &'static str, seen: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn LifecycleListener> {
        Arc::new(Recorder {
            name,
            seen: seen.clone(),
        })
    }

    fn document() -> Document {
        Document::new("claim.pdf", DocumentMetadata::default(), Utc::now())
    }

    #[tokio::test]
    async fn listeners_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let emitter = EventEmitter::new(vec![
            recorder("first", &seen),
            recorder("second", &seen),
            recorder("third", &seen),
        ]);

        let report = emitter
            .emit(&document(), Uuid::new_v4(), LifecycleEventKind::Trashed { trashed: true })
            .await;

        assert_eq!(report.delivered, 3);
        assert!(report.is_complete());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_listeners() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let listeners: Vec<Arc<dyn LifecycleListener>> = vec![
            Arc::new(Failing),
            recorder("after-error", &seen),
            Arc::new(Panicking),
            recorder("after-panic", &seen),
        ];
        let emitter = EventEmitter::new(listeners);

        let report = emitter
            .emit(&document(), Uuid::new_v4(), LifecycleEventKind::Processed { processed: true })
            .await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec!["failing", "panicking"]);
        assert_eq!(*seen.lock().unwrap(), vec!["after-error", "after-panic"]);
    }

    #[tokio::test]
    async fn dispatch_accepts_prebuilt_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let emitter = EventEmitter::new(vec![recorder("only", &seen)]);

        let doc = document();
        let user = Uuid::new_v4();
        let event = LifecycleEvent {
            document_id: doc.id,
            user_id: user,
            occurred_at: doc.updated_at,
            kind: LifecycleEventKind::Created {
                filename: doc.filename.clone(),
            },
        };
        assert_eq!(emitter.dispatch(&event).await.delivered, 1);
    }
}
