use std::io::Write;
use std::sync::Once;
use std::time::Duration;

use intake_core::{
    CreateInputRequest, InputPayload, LifecycleAction, StatusCode, SurfaceId, UploadOutcome,
    UploadResponse,
};
use intake_engine::{FailureKind, ProjectService, ReqwestService, ServiceSettings};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(intake_logging::initialize_for_tests);
}

const ACCEPTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<clamupload>
<upload source="notes.txt" filename="notes.txt" inputtemplate="plaintext" templatelabel="Plain text" format="PlainTextFormat">
<parameters errors="no"></parameters><valid>yes</valid></upload>
</clamupload>"#;

fn service(server: &MockServer) -> ReqwestService {
    init_logging();
    ReqwestService::new(ServiceSettings {
        base_url: server.uri(),
        project: "run1".to_string(),
        user: Some("alice".to_string()),
        access_token: Some("secret".to_string()),
        ..ServiceSettings::default()
    })
    .expect("service")
}

fn request(payload: InputPayload) -> CreateInputRequest {
    CreateInputRequest {
        surface: SurfaceId::Editor,
        filename: "notes.txt".to_string(),
        template_id: "plaintext".to_string(),
        payload,
        converter: None,
        parameters: vec![("encoding".to_string(), "utf-8".to_string())],
    }
}

#[tokio::test]
async fn editor_contents_are_posted_as_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run1/input/notes.txt"))
        .and(query_param("user", "alice"))
        .and(query_param("accesstoken", "secret"))
        .and(body_string_contains("contents=hello"))
        .and(body_string_contains("inputtemplate=plaintext"))
        .and(body_string_contains("encoding=utf-8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ACCEPTED))
        .expect(1)
        .mount(&server)
        .await;

    let response = service(&server)
        .create_input(&request(InputPayload::Contents("hello".to_string())))
        .await
        .expect("upload");
    let UploadResponse::Files(batch) = response else {
        panic!("expected files");
    };
    assert_eq!(batch.records[0].outcome(), UploadOutcome::Accepted);
}

#[tokio::test]
async fn forbidden_response_body_is_still_decoded() {
    let server = MockServer::start().await;
    let body = ACCEPTED.replace(
        "<parameters errors=\"no\"></parameters><valid>yes</valid>",
        "<parameters errors=\"yes\"><StringParameter id=\"encoding\" name=\"Encoding\" description=\"\" value=\"x\" error=\"Unknown encoding\" /></parameters>",
    );
    Mock::given(method("POST"))
        .and(path("/run1/input/notes.txt"))
        .respond_with(ResponseTemplate::new(403).set_body_string(body))
        .mount(&server)
        .await;

    let response = service(&server)
        .create_input(&request(InputPayload::Url(
            "http://example.org/notes.txt".to_string(),
        )))
        .await
        .expect("decoded despite 403");
    let UploadResponse::Files(batch) = response else {
        panic!("expected files");
    };
    assert!(matches!(
        batch.records[0].outcome(),
        UploadOutcome::RejectedParameters(_)
    ));
}

#[tokio::test]
async fn truncated_upload_body_is_a_protocol_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run1/input/notes.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<clamupload><upload filename="notes.txt" inputtemplate="plaintext" templatelabel="Plain text">"#,
        ))
        .mount(&server)
        .await;

    let err = service(&server)
        .create_input(&request(InputPayload::Contents("hello".to_string())))
        .await
        .expect_err("truncated result");
    assert_eq!(err.kind, FailureKind::Protocol);
}

#[tokio::test]
async fn plain_error_body_becomes_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/run1/input/notes.txt"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Invalid input source"))
        .mount(&server)
        .await;

    let err = service(&server)
        .create_input(&request(InputPayload::InputSource("nope".to_string())))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(403));
    assert_eq!(err.message, "Invalid input source");
}

#[tokio::test]
async fn local_file_goes_through_the_uploader() {
    let server = MockServer::start().await;
    let envelope = serde_json::json!({"success": true, "isarchive": false, "xml": ACCEPTED});
    Mock::given(method("POST"))
        .and(path("/run1/upload/"))
        .and(body_string_contains("local file body"))
        .and(body_string_contains("name=\"inputtemplate\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "local file body").expect("write");
    let mut req = request(InputPayload::LocalFile(file.path().to_path_buf()));
    req.surface = SurfaceId::Upload;

    let response = service(&server).create_input(&req).await.expect("upload");
    assert!(matches!(response, UploadResponse::Files(_)));
}

#[tokio::test]
async fn missing_local_file_is_an_io_failure() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let req = request(InputPayload::LocalFile(dir.path().join("absent.txt")));
    let err = service(&server).create_input(&req).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Io);
}

#[tokio::test]
async fn status_poll_forwards_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/run1/status/"))
        .and(query_param("user", "alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"success": true, "statuscode": 2, "statusmsg": "Done", "completion": 100, "statuslog": []}"#,
        ))
        .mount(&server)
        .await;

    let status = service(&server).poll_status().await.expect("status");
    assert_eq!(status.code, StatusCode::Done);
    assert_eq!(status.completion, 100);
}

#[tokio::test]
async fn status_poll_reports_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/run1/status/"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = service(&server).poll_status().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
    assert_eq!(err.status(), Some(502));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/run1/status/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let service = ReqwestService::new(ServiceSettings {
        base_url: server.uri(),
        project: "run1".to_string(),
        request_timeout: Duration::from_millis(200),
        ..ServiceSettings::default()
    })
    .expect("service");
    let err = service.poll_status().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn session_bootstrap_reads_interface_data_and_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"systemid = 'demo'; baseurl = 'x';
 inputtemplates = [ {"id": "plaintext", "label": "Plain text", "extension": "txt", "parametersxml": "<parameters></parameters>", "converters": [], "inputsources": []} ];"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/run1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<clam><status code="0" message="Accepting input" completion="0"/><input><file template="plaintext"><name>a.txt</name></file></input></clam>"#,
        ))
        .mount(&server)
        .await;

    let bootstrap = service(&server).load_session().await.expect("bootstrap");
    assert_eq!(bootstrap.templates.len(), 1);
    assert_eq!(bootstrap.project.status.code, StatusCode::NotStarted);
    assert_eq!(bootstrap.project.input_files[0].filename, "a.txt");
}

#[tokio::test]
async fn transform_is_fetched_from_static_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/static/parameters.xsl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"/>"#,
        ))
        .mount(&server)
        .await;

    let transform = service(&server).load_transform().await.expect("transform");
    assert!(transform.stylesheet().contains("xsl:stylesheet"));
}

#[tokio::test]
async fn lifecycle_actions_use_their_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/new_run/"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/run1/"))
        .and(query_param("abortonly", "true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/run1/output/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server);
    service
        .lifecycle(&LifecycleAction::Create {
            project: "new_run".to_string(),
        })
        .await
        .expect("create");
    service
        .lifecycle(&LifecycleAction::Abort)
        .await
        .expect("abort");
    service
        .lifecycle(&LifecycleAction::Restart)
        .await
        .expect("restart");
}

#[tokio::test]
async fn lifecycle_failure_keeps_server_text() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/run1/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Project is locked"))
        .mount(&server)
        .await;

    let err = service(&server)
        .lifecycle(&LifecycleAction::Delete)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(403));
    assert_eq!(err.message, "Project is locked");
}

#[tokio::test]
async fn input_deletion_and_source_selection() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/run1/input/sub/a.txt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/run1/input/"))
        .and(body_string_contains("inputsource=corpus1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not xml"))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server);
    service.delete_input("sub/a.txt").await.expect("delete");
    service.select_input_source("corpus1").await.expect("select");
}
