use adventure_game::{Manifest, MemorySessionStore, Session};
use adventure_server::{FileSessionStore, app};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn memory_app() -> Router {
    app(MemorySessionStore::new(), Manifest::default())
}

async fn start(app: &Router) -> Session {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/session/start",
        Some(json!({"profileName": "Player", "charId": "bunny", "themeId": "forest"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_value(body).unwrap()
}

async fn update(app: &Router, id: &str, result: Value) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/session/update",
        Some(json!({"sessionId": id, "result": result})),
    )
    .await
}

#[tokio::test]
async fn manifest_lists_themes_characters_and_games() {
    let (status, body) = call(&memory_app(), Method::GET, "/api/manifest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["themes"][0]["id"], "forest");
    assert_eq!(body["themes"][1]["type"], "circular");
    assert_eq!(body["characters"].as_array().unwrap().len(), 6);
    assert_eq!(body["games"][0]["id"], "math_add");
}

#[tokio::test]
async fn start_returns_fresh_session() {
    let app = memory_app();
    let session = start(&app).await;
    assert_eq!(session.current_node, 0);
    assert_eq!(session.current_level, 1);
    assert_eq!(session.total_stars, 0);
    assert!(!session.mercy_mode);
    assert_eq!(session.character_id, "bunny");
}

#[tokio::test]
async fn update_applies_success_and_mercy() {
    let app = memory_app();
    let id = start(&app).await.session_id.to_string();

    let (status, body) = update(&app, &id, json!({"success": true, "stars": 99})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["state"]["currentNode"], 1);
    assert_eq!(body["state"]["totalStars"], 3);

    let (_, body) = update(
        &app,
        &id,
        json!({"success": false, "stars": 0, "usedMercy": true}),
    )
    .await;
    assert_eq!(body["state"]["currentNode"], 2);
    assert_eq!(body["state"]["totalStars"], 3);
    assert_eq!(body["state"]["mercyMode"], true);

    let (_, body) = update(&app, &id, json!({"success": false})).await;
    assert_eq!(body["state"]["currentNode"], 2);
}

#[tokio::test]
async fn unknown_and_offline_sessions_are_404() {
    let app = memory_app();
    for id in ["missing", "offline-1234"] {
        let (status, body) = update(&app, id, json!({"success": true})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Session not found"}));
    }
}

#[tokio::test]
async fn victory_is_terminal_over_http() {
    let app = memory_app();
    let id = start(&app).await.session_id.to_string();
    for _ in 0..9 {
        update(&app, &id, json!({"success": true, "stars": 3})).await;
    }
    let (status, body) = update(&app, &id, json!({"success": true, "stars": 3})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["currentNode"], 9);
    assert_eq!(body["state"]["totalStars"], 27);
}

#[tokio::test]
async fn admin_lists_and_clears_sessions() {
    let app = memory_app();
    start(&app).await;
    start(&app).await;
    let (_, body) = call(&app, Method::GET, "/api/admin/sessions", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = call(&app, Method::DELETE, "/api/admin/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "deleted": 2}));

    let (_, body) = call(&app, Method::GET, "/api/admin/sessions", None).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn file_store_persists_across_app_instances() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = app(FileSessionStore::open(dir.path()).unwrap(), Manifest::default());
    let id = start(&first).await.session_id.to_string();
    update(&first, &id, json!({"success": true, "stars": 3})).await;
    drop(first);

    let second = app(FileSessionStore::open(dir.path()).unwrap(), Manifest::default());
    let (status, body) = update(&second, &id, json!({"success": true, "stars": 3})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["currentNode"], 2);
    assert_eq!(body["state"]["totalStars"], 6);
    assert_eq!(body["state"]["nodeHistory"].as_array().unwrap().len(), 2);
}
