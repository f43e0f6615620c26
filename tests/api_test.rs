//! HTTP API tests driving the router in-process with `oneshot`.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use anilib::server::create_router;
use common::TestHarness;

fn router(h: &TestHarness) -> Router {
    create_router(h.app_context(), None)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let h = TestHarness::new();
    let (status, body) = send(router(&h), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn anime_listing_and_search() {
    let h = TestHarness::new();
    h.touch("Cowboy Bebop/01.mp4");
    h.touch("Trigun/01.mp4");
    h.scan().await;

    let (status, body) = send(router(&h), get("/api/anime")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(router(&h), get("/api/anime?search=bebop")).await;
    assert_eq!(status, StatusCode::OK);
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"]["romaji"], "Cowboy Bebop");
}

#[tokio::test]
async fn anime_lookup_by_id() {
    let h = TestHarness::new();
    h.touch("Cowboy Bebop/01.mp4");
    h.scan().await;
    let anime = h.animes().remove(0);

    let (status, body) = send(router(&h), get(&format!("/api/anime/{}", anime.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["folder_path"], anime.folder_path.to_string_lossy().as_ref());

    let missing = anilib_common::AnimeId::new();
    let (status, body) = send(router(&h), get(&format!("/api/anime/{missing}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, body) = send(router(&h), get("/api/anime/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
}

#[tokio::test]
async fn episodes_come_in_numeric_order_with_subtitles() {
    let h = TestHarness::new();
    for name in ["Episode 10.mp4", "Episode 2.mp4", "Episode 1.mp4"] {
        h.touch(&format!("Cowboy Bebop/{name}"));
    }
    h.touch("Cowboy Bebop/Episode 2.en.srt");
    h.scan().await;
    let anime = h.animes().remove(0);

    let (status, body) =
        send(router(&h), get(&format!("/api/anime/{}/episodes", anime.id))).await;
    assert_eq!(status, StatusCode::OK);
    let episodes = body.as_array().unwrap();
    let titles: Vec<&str> = episodes.iter().map(|e| e["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Episode 1", "Episode 2", "Episode 10"]);
    assert_eq!(episodes[1]["subtitles"].as_array().unwrap().len(), 1);
    assert_eq!(episodes[1]["subtitles"][0]["language"], "en");
}

#[tokio::test]
async fn episodes_of_unknown_anime_is_404() {
    let h = TestHarness::new();
    let id = anilib_common::AnimeId::new();
    let (status, _) = send(router(&h), get(&format!("/api/anime/{id}/episodes"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_is_accepted_then_conflicts() {
    let h = TestHarness::new();
    h.toolkit.set_delay(std::time::Duration::from_millis(300));
    h.touch("Cowboy Bebop/01.mp4");
    let mut rx = h.events.subscribe();

    let (status, body) = send(router(&h), get("/api/library/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");

    let post = || Request::post("/api/library/update").body(Body::empty()).unwrap();
    let (status, body) = send(router(&h), post()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "updating");

    let (status, body) = send(router(&h), post()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    TestHarness::wait_for_scan_end(&mut rx).await;
    assert_eq!(h.episodes().len(), 1);
}

#[tokio::test]
async fn cancel_without_update_reports_false() {
    let h = TestHarness::new();
    let req = Request::post("/api/library/cancel").body(Body::empty()).unwrap();
    let (status, body) = send(router(&h), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn watch_directories_can_be_added() {
    let h = TestHarness::new();

    let (status, body) = send(router(&h), get("/api/library/directories")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let extra = tempfile::TempDir::new().unwrap();
    let (status, body) = send(
        router(&h),
        json_request(
            "POST",
            "/api/library/directories",
            serde_json::json!({ "path": extra.path() }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = send(
        router(&h),
        json_request(
            "POST",
            "/api/library/directories",
            serde_json::json!({ "path": "relative/anime" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_default_then_stored() {
    let h = TestHarness::new();

    let (status, body) = send(router(&h), get("/api/settings")).await;
    assert_eq!(status, StatusCode::OK);
    let hw = &body.as_array().unwrap()[0];
    assert_eq!(hw["name"], "use_hardware_acceleration");
    assert_eq!(hw["value"], false);
    assert_eq!(hw["stored"], false);

    let (status, body) = send(
        router(&h),
        json_request(
            "PUT",
            "/api/settings/use_hardware_acceleration",
            serde_json::json!({ "value": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], true);

    let (_, body) = send(router(&h), get("/api/settings")).await;
    assert_eq!(body[0]["value"], true);
    assert_eq!(body[0]["stored"], true);

    let (status, _) = send(
        router(&h),
        json_request("PUT", "/api/settings/telemetry", serde_json::json!({ "value": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recent_events_include_messages() {
    let h = TestHarness::new();
    h.touch("Cowboy Bebop/01.mp4");
    h.library.update().await.unwrap();

    let (status, body) = send(router(&h), get("/api/library/events/recent?limit=2")).await;
    assert_eq!(status, StatusCode::OK);
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 2);
    // Newest first: the update ends with the idle status change.
    assert_eq!(events[0]["type"], "status_changed");
    assert_eq!(events[0]["message"], "Library is idle");
    assert_eq!(events[1]["type"], "scan_completed");
}
