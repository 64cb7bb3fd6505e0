use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use coches_server::config::{Config, StoreBackend};
use coches_server::{app, build_store, AppState};
use coches_store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn memory_app() -> Router {
    app(AppState::new(Arc::new(MemoryStore::seeded()), true))
}

fn sqlite_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut config = Config::default();
    config.store.backend = StoreBackend::Sqlite;
    config.database.path = dir
        .path()
        .join("coches.db")
        .to_str()
        .expect("utf-8 temp path")
        .to_string();

    let store = build_store(&config).expect("sqlite store should build");
    (app(AppState::new(store, true)), dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// POST → GET → DELETE → GET, checking the full record at each step.
async fn audi_lifecycle(app: &Router) {
    let (status, created) = send(
        app,
        "POST",
        "/api/coches",
        Some(json!({"marca": "Audi", "modelo": "A4", "anio": 2020})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("created id");
    assert_eq!(created["coche"]["id"], id);
    assert_eq!(created["mensaje"], "Se ha agregado el nuevo coche exitosamente");
    assert!(created.get("message").is_none());

    let (status, car) = send(app, "GET", &format!("/api/coches/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        car,
        json!({"id": id, "marca": "Audi", "modelo": "A4", "anio": 2020})
    );

    let (status, deleted) = send(app, "DELETE", &format!("/api/coches/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        deleted,
        json!({"mensaje": "Coche eliminado exitosamente", "id": id})
    );

    let (status, body) = send(app, "GET", &format!("/api/coches/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string(), "404 should carry a JSON error");
}

#[tokio::test]
async fn test_lifecycle_memory() {
    audi_lifecycle(&memory_app()).await;
}

#[tokio::test]
async fn test_lifecycle_sqlite() {
    let (app, _dir) = sqlite_app();
    audi_lifecycle(&app).await;
}

#[tokio::test]
async fn test_list_returns_seed_set_in_memory() {
    let app = memory_app();
    let (status, body) = send(&app, "GET", "/api/coches", None).await;
    assert_eq!(status, StatusCode::OK);

    let cars = body.as_array().expect("array of cars");
    assert_eq!(cars.len(), 3);
    assert_eq!(cars[0], json!({"id": 1, "marca": "Toyota", "modelo": "Corolla", "anio": 2018}));
    assert_eq!(cars[2]["marca"], "Seat");
}

#[tokio::test]
async fn test_list_starts_empty_in_sqlite() {
    let (app, _dir) = sqlite_app();
    let (status, body) = send(&app, "GET", "/api/coches", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_ids_increase_across_creates() {
    let (sqlite, _dir) = sqlite_app();
    for app in [memory_app(), sqlite] {
        let mut last = 0;
        for modelo in ["Clio", "Megane", "Captur"] {
            let (status, body) = send(
                &app,
                "POST",
                "/api/coches",
                Some(json!({"marca": "Renault", "modelo": modelo, "anio": 2019})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            let id = body["id"].as_i64().unwrap();
            assert!(id > last, "id {id} should exceed {last}");
            last = id;
        }
    }
}

#[tokio::test]
async fn test_partial_update_merges_fields() {
    let (sqlite, _dir) = sqlite_app();
    for app in [memory_app(), sqlite] {
        let (_, created) = send(
            &app,
            "POST",
            "/api/coches",
            Some(json!({"marca": "Ford", "modelo": "Focus", "anio": 2015})),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            "PUT",
            &format!("/api/coches/{id}"),
            Some(json!({"anio": 2016})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mensaje"], "Se ha actualizado el coche exitosamente");
        assert_eq!(body["id"], id);
        assert_eq!(body["coche"]["anio"], 2016);

        let (status, car) = send(&app, "GET", &format!("/api/coches/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            car,
            json!({"id": id, "marca": "Ford", "modelo": "Focus", "anio": 2016})
        );
    }
}

#[tokio::test]
async fn test_update_missing_id_is_404() {
    let app = memory_app();
    let (status, body) = send(
        &app,
        "PUT",
        "/api/coches/999",
        Some(json!({"marca": "Opel"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_delete_missing_id_is_404_and_store_unchanged() {
    let (sqlite, _dir) = sqlite_app();
    for app in [memory_app(), sqlite] {
        let (_, before) = send(&app, "GET", "/api/coches", None).await;

        let (status, body) = send(&app, "DELETE", "/api/coches/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (_, after) = send(&app, "GET", "/api/coches", None).await;
        assert_eq!(before, after);
    }
}

#[tokio::test]
async fn test_repeat_delete_is_404() {
    let app = memory_app();
    let (status, _) = send(&app, "DELETE", "/api/coches/2", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", "/api/coches/2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/coches", None).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_sqlite_state_survives_restart() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut config = Config::default();
    config.database.path = dir
        .path()
        .join("coches.db")
        .to_str()
        .unwrap()
        .to_string();

    let id = {
        let app = app(AppState::new(build_store(&config).unwrap(), true));
        let (_, body) = send(
            &app,
            "POST",
            "/api/coches",
            Some(json!({"marca": "Mazda", "modelo": "MX-5", "anio": 2021})),
        )
        .await;
        body["id"].as_i64().unwrap()
    };

    let app = app(AppState::new(build_store(&config).unwrap(), true));
    let (status, car) = send(&app, "GET", &format!("/api/coches/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(car["modelo"], "MX-5");
}
