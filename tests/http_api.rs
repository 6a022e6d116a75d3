//! HTTP contract tests, driven through the router without a socket

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{service, service_on, store, CAMPAIGN_NOTE};
use http_body_util::BodyExt;
use lorelink::http::create_router;
use lorelink::{
    HeuristicAnalyzer, Label, OpenStore, SqliteStore, TagService, VocabularySource,
    VocabularySources,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(service: TagService) -> Router {
    create_router(Arc::new(service))
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn post(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

/// Tag the campaign note for owner 1 and return the response array.
async fn tag_campaign_note(app: &Router) -> Vec<Value> {
    let (status, body) = post(
        app,
        "/tag",
        json!({"text": CAMPAIGN_NOTE, "note_id": 1, "owner_id": 1}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body.as_array().cloned().expect("array response")
}

fn id_of(tagged: &[Value], name: &str) -> i64 {
    tagged
        .iter()
        .find(|t| t["name"] == name)
        .and_then(|t| t["id"].as_i64())
        .expect("tagged node id")
}

// ── /health ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_ready_vocabulary() {
    let (status, body) = get(&app(service()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"], "heuristic");
    assert_eq!(body["vocabulary"]["ready"], true);
}

// ── /tag ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_tag_returns_one_summary_per_mention() {
    let tagged = tag_campaign_note(&app(service())).await;

    assert_eq!(tagged.len(), 3);
    assert_eq!(tagged[0]["name"], "Aria");
    assert_eq!(tagged[0]["type"], "PERSON");
    assert_eq!(tagged[0]["status"], "new");
    assert_eq!(tagged[1]["type"], "SPELL");
    assert_eq!(tagged[2]["name"], "Sunken Keep");
    assert_eq!(tagged[2]["type"], "LOCATION");
}

#[tokio::test]
async fn test_tag_accepts_string_ids_and_user_id() {
    let (status, body) = post(
        &app(service()),
        "/tag",
        json!({"text": "Aria cast Fireball", "note_id": "3", "user_id": "9"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_tag_rejects_missing_fields() {
    let app = app(service());
    for body in [
        json!({"note_id": 1, "owner_id": 1}),
        json!({"text": "Aria", "owner_id": 1}),
        json!({"text": "Aria", "note_id": 1}),
        json!({"text": "Aria", "note_id": "abc", "owner_id": 1}),
    ] {
        let (status, response) = post(&app, "/tag", body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(response["error"], "Invalid request");
    }
}

#[tokio::test]
async fn test_tag_rejects_malformed_json() {
    let (status, body) = post(&app(service()), "/tag", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
}

#[tokio::test]
async fn test_tag_unavailable_when_vocabulary_failed() {
    let sources = VocabularySources::empty()
        .with_source(Label::Spell, VocabularySource::new("grimoire", "name"));
    let service = TagService::new(store(), Arc::new(HeuristicAnalyzer::new()), sources);
    let app = app(service);

    let (status, body) = post(
        &app,
        "/tag",
        json!({"text": CAMPAIGN_NOTE, "note_id": 1, "owner_id": 1}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Tagger not ready");

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["vocabulary"]["ready"], false);
}

#[tokio::test]
async fn test_tag_store_failure_is_500_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("lorelink.db");
    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let app = app(service_on(store));

    // Break mention writes after the vocabulary is built
    let raw = rusqlite::Connection::open(&db_path).unwrap();
    raw.execute_batch("ALTER TABLE note_mentions RENAME TO note_mentions_moved")
        .unwrap();

    let (status, body) = post(
        &app,
        "/tag",
        json!({"text": CAMPAIGN_NOTE, "note_id": 1, "owner_id": 1}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", body);
    assert_eq!(body["error"], "Failed to tag text");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let nodes: i64 = raw
        .query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))
        .unwrap();
    assert_eq!(nodes, 0);
}

// ── /nodes ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_node() {
    let app = app(service());
    let tagged = tag_campaign_note(&app).await;
    let aria = id_of(&tagged, "Aria");

    let (status, body) = get(&app, &format!("/nodes/{}", aria)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Aria");
    assert_eq!(body["type"], "PERSON");
    assert_eq!(body["owner"], 1);

    let (status, _) = get(&app, &format!("/nodes/{}?owner_id=1", aria)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_get_node_errors() {
    let app = app(service());
    let tagged = tag_campaign_note(&app).await;
    let aria = id_of(&tagged, "Aria");

    let (status, body) = get(&app, "/nodes/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid node ID");

    let (status, _) = get(&app, "/nodes/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // another owner's node is indistinguishable from a missing one
    let (status, _) = get(&app, &format!("/nodes/{}?owner_id=2", aria)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_node_by_name() {
    let app = app(service());
    tag_campaign_note(&app).await;

    let (status, body) = get(&app, "/nodes/by-name/sunken%20keep?owner_id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Sunken Keep");
    assert_eq!(body["type"], "LOCATION");

    let (status, _) = get(&app, "/nodes/by-name/Aria?owner_id=1&type=SPELL").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/nodes/by-name/Aria?owner_id=2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/nodes/by-name/Aria").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing owner_id");
}

#[tokio::test]
async fn test_node_mentions_and_links() {
    let app = app(service());
    let tagged = tag_campaign_note(&app).await;
    let keep = id_of(&tagged, "Sunken Keep");
    let aria = id_of(&tagged, "Aria");

    let (status, body) = get(&app, &format!("/nodes/{}/mentions", keep)).await;
    assert_eq!(status, StatusCode::OK);
    let mentions = body.as_array().unwrap();
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0]["start_pos"], 44);
    assert_eq!(mentions[0]["end_pos"], 55);
    assert_eq!(mentions[0]["note_id"], 1);

    let (status, body) = get(&app, &format!("/nodes/{}/links", aria)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["links"].as_array().unwrap().len(), 2);
    let relationships = body["relationships"].as_array().unwrap();
    assert_eq!(relationships.len(), 1);
    assert_eq!(relationships[0]["parent_node_id"], keep);
    assert_eq!(relationships[0]["relationship_type"], "located_in");

    let (status, _) = get(&app, &format!("/nodes/{}/links?owner_id=2", aria)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── /admin ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rebuild_picks_up_tagged_names() {
    let app = app(service());
    tag_campaign_note(&app).await;

    let (status, body) = post(&app, "/admin/vocabulary/rebuild", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert_eq!(body["terms"], 3);
    assert_eq!(body["labels"]["LOCATION"], 1);
}
