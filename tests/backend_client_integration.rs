//! BackendClient round trips against a mock HTTP server.

use std::io::Write;

use mockito::Matcher;
use serde_json::json;

use chartchat::api::{
    ApiError, BackendClient, ChartType, ChatOutcome, ChatRequest, PlotOutcome, PlotRequest,
    PlotSpec, UploadOutcome,
};

fn chat_request(prompt: &str) -> ChatRequest {
    ChatRequest {
        prompt: prompt.to_string(),
        image: None,
        selected_col: Some("Age".to_string()),
        plot_type: Some(ChartType::Count),
        dataset_id: Some("d1".to_string()),
    }
}

#[tokio::test]
async fn chat_reply_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "prompt": "hello",
            "selected_col": "Age",
            "plot_type": "count",
            "dataset_id": "d1",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"reply": "**hi there**"}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url()).unwrap();
    let outcome = client.chat(&chat_request("hello")).await.unwrap();
    assert_eq!(
        outcome,
        ChatOutcome::Reply {
            text: "**hi there**".into(),
            image_url: None
        }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn chat_non_2xx_carries_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(502)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let client = BackendClient::new(server.url()).unwrap();
    let error = client.chat(&chat_request("hello")).await.unwrap_err();
    match error {
        ApiError::Http { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn chat_unconfigured_diagnostic_shape() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "no key", "constructed": {"user": "prompt text"}}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url()).unwrap();
    let outcome = client.chat(&chat_request("hello")).await.unwrap();
    assert_eq!(
        outcome,
        ChatOutcome::Unconfigured {
            constructed_prompt: "prompt text".into()
        }
    );
}

#[tokio::test]
async fn columns_sends_dataset_id_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/columns")
        .match_query(Matcher::UrlEncoded("dataset_id".into(), "d1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"columns": ["Age", "Wage"]}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url()).unwrap();
    let columns = client.columns(Some("d1")).await.unwrap();
    assert_eq!(columns, vec!["Age".to_string(), "Wage".to_string()]);
    mock.assert_async().await;
}

#[tokio::test]
async fn columns_in_band_error_is_backend_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/columns")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "no dataset"}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url()).unwrap();
    let error = client.columns(None).await.unwrap_err();
    assert!(matches!(error, ApiError::Backend(message) if message == "no dataset"));
}

#[tokio::test]
async fn plot_round_trip_sends_specs() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/plot")
        .match_body(Matcher::PartialJson(json!({
            "plots": [{"col": "Age", "type": "percent", "show_values": true}],
            "dataset_id": "d1",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"images": ["iVBORw0KG"]}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url()).unwrap();
    let request = PlotRequest {
        plots: vec![PlotSpec::single("Age", ChartType::Percent, true)],
        dataset_id: Some("d1".to_string()),
    };
    let outcome = client.plot(&request).await.unwrap();
    assert_eq!(outcome, PlotOutcome::Images(vec!["iVBORw0KG".to_string()]));
    mock.assert_async().await;
}

#[tokio::test]
async fn plot_in_band_error_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/plot")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "unknown column"}"#)
        .create_async()
        .await;

    let client = BackendClient::new(server.url()).unwrap();
    let request = PlotRequest {
        plots: vec![PlotSpec::grouped(vec!["A".into(), "B".into()], false)],
        dataset_id: None,
    };
    let outcome = client.plot(&request).await.unwrap();
    assert_eq!(
        outcome,
        PlotOutcome::BackendError {
            message: "unknown column".into()
        }
    );
}

#[tokio::test]
async fn upload_classifies_dataset_registration() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/upload")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data.*".to_string()),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"dataset_id": "d1", "original_filename": "t.csv", "columns": ["A", "B"]}"#)
        .create_async()
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "A,B").unwrap();
    writeln!(file, "1,2").unwrap();

    let client = BackendClient::new(server.url()).unwrap();
    let outcome = client.upload(file.path()).await.unwrap();
    assert_eq!(
        outcome,
        UploadOutcome::DatasetRegistered {
            dataset_id: "d1".into(),
            original_filename: Some("t.csv".into()),
            columns: vec!["A".into(), "B".into()],
        }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn upload_missing_file_is_an_io_error() {
    let server = mockito::Server::new_async().await;
    let client = BackendClient::new(server.url()).unwrap();
    let error = client
        .upload(std::path::Path::new("does-not-exist.csv"))
        .await
        .unwrap_err();
    assert!(matches!(error, ApiError::Io(_)));
}
