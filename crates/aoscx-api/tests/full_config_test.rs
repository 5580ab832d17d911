// Full-configuration dry-run workflow tests against a wiremock switch.

use std::io::Write;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aoscx_api::{ApiVersion, DryRunState, Error, FullConfig, SwitchClient};

const CONFIG_PATH: &str = "/rest/v10.09/configs/running-config";

async fn setup() -> (MockServer, SwitchClient) {
    let server = MockServer::start().await;
    let client =
        SwitchClient::from_reqwest(&server.uri(), ApiVersion::V10_09, reqwest::Client::new())
            .unwrap();
    (server, client)
}

fn fast_config(text: &str) -> FullConfig {
    let mut config = FullConfig::new().with_poll_interval(Duration::from_millis(1));
    config.set_config(text);
    config
}

#[tokio::test]
async fn get_fetches_running_config_as_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(CONFIG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("hostname sw1\nvlan 42\n"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = FullConfig::new();
    config.get(&client).await.unwrap();
    assert_eq!(config.config, "hostname sw1\nvlan 42\n");
}

#[tokio::test]
async fn validate_polls_until_terminal_state() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(CONFIG_PATH))
        .and(query_param("dryrun", "validate"))
        .and(body_string("hostname sw1\n"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    // Three pending polls, then a terminal success: four GETs in total.
    Mock::given(method("GET"))
        .and(path(CONFIG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "pending" })))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONFIG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    let config = fast_config("hostname sw1\n");
    let outcome = config.validate_config(&client).await.unwrap();
    assert_eq!(outcome.state, DryRunState::Success);
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn never_terminal_run_stops_after_ten_polls() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(CONFIG_PATH))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONFIG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "pending" })))
        .expect(10)
        .mount(&server)
        .await;

    let config = fast_config("hostname sw1\n");
    let outcome = config.validate_config(&client).await.unwrap();
    assert_eq!(outcome.state, DryRunState::Pending);
}

#[tokio::test]
async fn apply_from_file_aggregates_device_line_errors() {
    let (server, client) = setup().await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "hostname sw1\nbad line\n").unwrap();

    Mock::given(method("POST"))
        .and(path(CONFIG_PATH))
        .and(query_param("dryrun", "validate"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONFIG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "error",
            "errors": [
                { "line": 1, "message": "syntax error" },
                { "line": 4, "message": "unknown vlan" },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;
    // A failed validation must stop the workflow before the apply stage.
    Mock::given(method("POST"))
        .and(path(CONFIG_PATH))
        .and(query_param("dryrun", "apply"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = FullConfig::new().with_poll_interval(Duration::from_millis(1));
    let err = config.apply_from_file(&client, file.path()).await.unwrap_err();

    match err {
        Error::Remote { status, detail } => {
            assert!(status.contains("validate"), "{status}");
            assert!(detail.contains("line 1 | syntax error"), "{detail}");
            assert!(detail.contains("line 4 | unknown vlan"), "{detail}");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn apply_from_file_validates_applies_and_refreshes() {
    let (server, client) = setup().await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "hostname sw1\n").unwrap();

    Mock::given(method("POST"))
        .and(path(CONFIG_PATH))
        .and(query_param("dryrun", "validate"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CONFIG_PATH))
        .and(query_param("dryrun", "apply"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    // One status poll per stage, plus the final text refresh which is
    // told apart by its accept header.
    Mock::given(method("GET"))
        .and(path(CONFIG_PATH))
        .and(header("accept", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hostname sw1\n"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CONFIG_PATH))
        .and(header("accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "success" })))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = FullConfig::new().with_poll_interval(Duration::from_millis(1));
    config.apply_from_file(&client, file.path()).await.unwrap();
    assert_eq!(config.config, "hostname sw1\n");
}

#[tokio::test]
async fn missing_config_file_is_a_local_error() {
    let mut config = FullConfig::new();
    let err = config.read_from_file("/nonexistent/running.cfg").unwrap_err();
    assert!(matches!(err, Error::ConfigFile { .. }), "got {err:?}");
}
