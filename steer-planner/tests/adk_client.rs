mod common;

use serde_json::json;
use steer_common::EncodedImage;
use steer_planner::protocol::Part;
use steer_planner::{Author, Planner, PlannerError, Turn};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn run_posts_message_and_returns_events() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .and(body_json(json!({
            "app_name": "browser_controller",
            "user_id": "u_123",
            "session_id": "s_123",
            "new_message": {
                "role": "user",
                "parts": [
                    {"text": "report"},
                    {"inline_data": {"mime_type": "image/png", "data": "AAAA"}}
                ]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"author": "browser_controller", "content": {"parts": [{"text": "thinking"}]}},
            {"author": "scroll_agent", "content": {"parts": [{"text": "{\"relative_amount\": 0.5}"}]}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let planner = common::planner_for(&server.uri());
    let events = planner
        .run(
            "browser_controller",
            vec![
                Part::text("report"),
                Part::image(EncodedImage::new("image/png", "AAAA")),
            ],
        )
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(Turn::from_events(&events).unwrap().author, Author::ScrollAgent);
}

#[tokio::test]
async fn server_error_is_not_retried_and_keeps_status() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = common::planner_for(&server.uri())
        .run("browser_controller", vec![Part::text("x")])
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn empty_or_non_array_bodies_are_transport_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"author": "x"})))
        .mount(&server)
        .await;

    let planner = common::planner_for(&server.uri());
    assert!(matches!(
        planner.run("a", vec![Part::text("x")]).await,
        Err(PlannerError::EmptyResponse)
    ));
    assert!(matches!(
        planner.run("a", vec![Part::text("x")]).await,
        Err(PlannerError::Decode(_))
    ));
}

#[tokio::test]
async fn sessions_are_deleted_then_created_under_identity() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/apps/browser_controller/users/u_123/sessions/s_123"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/apps/browser_controller/users/u_123/sessions/s_123"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "s_123"})))
        .expect(1)
        .mount(&server)
        .await;

    let planner = common::planner_for(&server.uri());
    let deleted = planner.reset_session("browser_controller").await;
    assert_eq!(deleted.unwrap_err().status(), Some(404));
    planner.create_session("browser_controller").await.unwrap();
}
