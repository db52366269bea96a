//! Integration tests for the HTTP prediction client

use httpmock::prelude::*;
use pretty_assertions::assert_eq;

use face_vision::predict::{HttpPredictClient, PredictConfig, PredictError, PredictService};

fn client_for(server: &MockServer) -> HttpPredictClient {
    HttpPredictClient::new(
        PredictConfig::new(server.url("/predict"))
            .connect_timeout(5)
            .request_timeout(10),
    )
}

#[test]
fn test_predict_success_returns_body_json() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/predict")
            .header("content-type", "application/json");
        then.status(200)
            .json_body(serde_json::json!({"label": "cat"}));
    });

    let result = client_for(&server).predict(b"fake png bytes").unwrap();

    assert_eq!(result, serde_json::json!({"label": "cat"}));
    mock.assert();
}

#[test]
fn test_predict_accepts_realistically_sized_frames() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/predict")
            .header("content-type", "application/json");
        then.status(200)
            .json_body(serde_json::json!({"label": "person"}));
    });

    // A real webcam PNG is a few hundred KB - far past what a single
    // exec argument may carry, so the body must travel via file
    let image = vec![0xA7u8; 300 * 1024];
    let result = client_for(&server).predict(&image).unwrap();

    assert_eq!(result, serde_json::json!({"label": "person"}));
    mock.assert();
}

#[test]
fn test_predict_error_with_plain_text_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/predict");
        then.status(422).body("invalid image");
    });

    let err = client_for(&server).predict(b"fake png bytes").unwrap_err();

    match &err {
        PredictError::Service { status, payload } => {
            assert_eq!(*status, 422);
            assert_eq!(*payload, serde_json::Value::String("invalid image".into()));
        }
        other => panic!("expected Service error, got {:?}", other),
    }
    assert_eq!(err.display_payload(), "invalid image");
}

#[test]
fn test_predict_error_with_structured_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/predict");
        then.status(400)
            .json_body(serde_json::json!({"error": "no face detected"}));
    });

    let err = client_for(&server).predict(b"fake png bytes").unwrap_err();

    assert_eq!(
        err.display_payload(),
        "{\n  \"error\": \"no face detected\"\n}"
    );
}

#[test]
fn test_predict_connection_refused() {
    // Nothing listens on port 1
    let client = HttpPredictClient::new(
        PredictConfig::new("http://127.0.0.1:1/predict")
            .connect_timeout(2)
            .request_timeout(4),
    );

    let err = client.predict(b"fake png bytes").unwrap_err();
    assert!(matches!(
        err,
        PredictError::ConnectionFailed(_) | PredictError::Timeout(_)
    ));
}

#[test]
fn test_health_check() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.any_request();
        then.status(404);
    });

    // Any response means reachable, even a 404
    assert!(face_vision::predict::check_health(&server.url("/predict"), 2).unwrap());

    // A closed port is not reachable
    assert!(!face_vision::predict::check_health("http://127.0.0.1:1/predict", 2).unwrap());
}
