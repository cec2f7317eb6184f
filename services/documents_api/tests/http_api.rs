//! HTTP-level tests for the document routes, served over the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::FixedOffset;
use document_history_core::{InMemoryStore, TimelineOrder, User};
use documents_api_lib::web::middleware::USER_ID_HEADER;
use documents_api_lib::web::router;
use documents_api_lib::web::state::{AppState, TimelineSettings};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

// ── Helpers ───────────────────────────────────────────

struct TestApp {
    app: Router,
    store: Arc<InMemoryStore>,
    user_id: Uuid,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let user_id = Uuid::new_v4();
    store.add_user(User {
        user_id,
        display_name: "Dana Reyes".to_string(),
    });

    let state = AppState::build(
        store.clone(),
        store.clone(),
        store.clone(),
        TimelineSettings {
            display_offset: FixedOffset::east_opt(0).unwrap(),
            order: TimelineOrder::NewestFirst,
        },
    );
    TestApp {
        app: router(Arc::new(state)),
        store,
        user_id,
    }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, user_id: Uuid, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, user_id.to_string());
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(&self, filename: &str, metadata: Value) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/documents",
                self.user_id,
                Some(json!({ "filename": filename, "metadata": metadata })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["document"]["id"].as_str().unwrap().to_string()
    }
}

// ── Acting user ───────────────────────────────────────────

#[tokio::test]
async fn missing_user_header_is_unauthorized() {
    let t = test_app();
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri("/documents/00000000-0000-0000-0000-000000000001").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_user_header_is_bad_request() {
    let t = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/documents")
        .header(USER_ID_HEADER, "not-a-uuid")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"filename":"a.pdf"}"#))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ── Documents and history ───────────────────────────────────────────

#[tokio::test]
async fn metadata_edit_appears_in_history() {
    let t = test_app();
    let id = t
        .create("renewal.pdf", json!({ "description": "Policy Document" }))
        .await;

    let (status, body) = t
        .send(
            "PATCH",
            &format!("/documents/{id}/metadata"),
            t.user_id,
            Some(json!({ "changes": { "assignedTo": "456" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document"]["metadata"]["assignedTo"], "456");
    assert_eq!(body["history_recorded"], true);

    let (status, history) = t
        .send("GET", &format!("/documents/{id}/history"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = history["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let latest = &entries[0];
    assert_eq!(latest["action"], "UPDATE_METADATA");
    assert_eq!(latest["sequence"], 2);
    assert_eq!(latest["icon"], "edit");
    assert_eq!(latest["description"], "Set Assigned To to \"456\"");
    assert_eq!(latest["user"]["name"], "Dana Reyes");
    assert_eq!(latest["user"]["id"], t.user_id.to_string());

    assert_eq!(entries[1]["action"], "CREATE");
}

#[tokio::test]
async fn processed_document_rejects_metadata_edit() {
    let t = test_app();
    let id = t.create("claim.pdf", json!({})).await;

    let (status, _) = t
        .send(
            "PUT",
            &format!("/documents/{id}/processed"),
            t.user_id,
            Some(json!({ "processed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t
        .send(
            "PATCH",
            &format!("/documents/{id}/metadata"),
            t.user_id,
            Some(json!({ "changes": { "claimant": "J. Park" } })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("processed"));

    let (_, history) = t
        .send("GET", &format!("/documents/{id}/history"), t.user_id, None)
        .await;
    let actions: Vec<&str> = history["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["PROCESS", "CREATE"]);
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let t = test_app();
    let id = t.create("claim.pdf", json!({})).await;

    let (status, body) = t
        .send(
            "PATCH",
            &format!("/documents/{id}/metadata"),
            t.user_id,
            Some(json!({ "changes": { "claimant": "x".repeat(256) } })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field"], "claimant");

    let (status, body) = t
        .send(
            "PATCH",
            &format!("/documents/{id}/metadata"),
            t.user_id,
            Some(json!({ "changes": { "insuredName": "Acme" } })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.get("field").is_none());
}

#[tokio::test]
async fn empty_filename_is_rejected() {
    let t = test_app();
    let (status, _) = t
        .send("POST", "/documents", t.user_id, Some(json!({ "filename": "  " })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn trash_and_restore_round_trip() {
    let t = test_app();
    let id = t.create("claim.pdf", json!({})).await;

    let (status, body) = t
        .send("POST", &format!("/documents/{id}/trash"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document"]["trashed"], true);

    let (status, _) = t
        .send("POST", &format!("/documents/{id}/trash"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = t
        .send("POST", &format!("/documents/{id}/restore"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document"]["trashed"], false);
    assert_eq!(body["document"]["trashed_at"], Value::Null);

    let (_, history) = t
        .send("GET", &format!("/documents/{id}/history"), t.user_id, None)
        .await;
    assert_eq!(history["entries"][0]["action"], "RESTORE");
    assert_eq!(history["entries"][1]["action"], "TRASH");
}

#[tokio::test]
async fn unknown_document_is_not_found() {
    let t = test_app();
    let id = Uuid::new_v4();

    let (status, _) = t
        .send("GET", &format!("/documents/{id}"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .send("GET", &format!("/documents/{id}/history"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_outage_does_not_fail_the_mutation() {
    let t = test_app();
    let id = t.create("claim.pdf", json!({})).await;
    t.store.set_history_offline(true);

    let (status, body) = t
        .send(
            "PATCH",
            &format!("/documents/{id}/metadata"),
            t.user_id,
            Some(json!({ "changes": { "assignedTo": "456" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history_recorded"], false);

    let (status, body) = t
        .send("GET", &format!("/documents/{id}"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["assignedTo"], "456");
}

#[tokio::test]
async fn history_with_unknown_actor_is_an_integrity_error() {
    let t = test_app();
    let stranger = Uuid::new_v4();
    let (status, body) = t
        .send(
            "POST",
            "/documents",
            stranger,
            Some(json!({ "filename": "orphan.pdf" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["document"]["id"].as_str().unwrap();

    let (status, _) = t
        .send("GET", &format!("/documents/{id}/history"), t.user_id, None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
