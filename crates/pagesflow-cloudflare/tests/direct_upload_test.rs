use pagesflow_cloudflare::{
    DirectUploadPublisher, MissingHashPolicy, PagesClient, content_hash,
};
use pagesflow_config::Credentials;
use pagesflow_core::{PublishError, Publisher};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{any, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const CREATE_PATH: &str = "/accounts/acc/pages/projects/blog/deployments";
const UPLOAD_PATH: &str = "/accounts/acc/pages/projects/blog/deployments/dep-1/files";

fn publisher(server: &MockServer) -> DirectUploadPublisher {
    let credentials = Credentials::new("acc", "token", "blog").unwrap();
    DirectUploadPublisher::new(PagesClient::new(credentials).with_api_base(server.uri()))
}

fn publisher_with_timeouts(
    server: &MockServer,
    create: Duration,
    upload: Duration,
) -> DirectUploadPublisher {
    let credentials = Credentials::new("acc", "token", "blog").unwrap();
    DirectUploadPublisher::new(
        PagesClient::new(credentials)
            .with_api_base(server.uri())
            .with_timeouts(create, upload),
    )
}

fn site(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

fn created(missing: &[String], url: Option<&str>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "result": {
            "id": "dep-1",
            "missing_hashes": missing,
            "url": url,
        }
    }))
}

fn uploaded() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "result": null
    }))
}

async fn requests_to(server: &MockServer, target: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == target)
        .collect()
}

fn body(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}

/// 空のディレクトリでは API を一切呼ばない
#[tokio::test]
async fn test_empty_directory_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("assets")).unwrap();

    let err = publisher(&server).publish(dir.path()).await.unwrap_err();
    assert!(matches!(err, PublishError::NoFiles(ref p) if p == dir.path()));
}

#[tokio::test]
async fn test_nothing_missing_skips_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .and(header("authorization", "Bearer token"))
        .respond_with(created(&[], Some("https://dep-1.blog.pages.dev")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(any())
        .and(path(UPLOAD_PATH))
        .respond_with(uploaded())
        .expect(0)
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "<h1>home</h1>")]);
    let outcome = publisher(&server).publish(dir.path()).await.unwrap();

    assert_eq!(outcome.url, "https://dep-1.blog.pages.dev");
    assert_eq!(outcome.deployment_id.as_deref(), Some("dep-1"));
}

#[tokio::test]
async fn test_manifest_lists_every_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .and(body_string_contains("name=\"manifest\""))
        .respond_with(created(&[], None))
        .expect(1)
        .mount(&server)
        .await;

    let dir = site(&[
        ("index.html", "same"),
        ("copy/index.html", "same"),
        ("css/site.css", "body{}"),
    ]);
    publisher(&server).publish(dir.path()).await.unwrap();

    let create = requests_to(&server, CREATE_PATH).await;
    let text = body(&create[0]);
    let start = text.find('{').unwrap();
    let end = text.rfind('}').unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&text[start..=end]).unwrap();

    let same = content_hash(b"same");
    assert_eq!(manifest["/index.html"], json!(same));
    assert_eq!(manifest["/copy/index.html"], json!(same));
    assert_eq!(manifest["/css/site.css"], json!(content_hash(b"body{}")));
    assert_eq!(manifest.as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_url_falls_back_to_pages_dev() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[], None))
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let outcome = publisher(&server).publish(dir.path()).await.unwrap();

    assert_eq!(outcome.url, "https://blog.pages.dev");
}

#[tokio::test]
async fn test_uploads_only_missing_content() {
    let server = MockServer::start().await;
    let home = content_hash(b"<h1>home</h1>");
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[home.clone()], Some("https://dep-1.blog.pages.dev")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header("authorization", "Bearer token"))
        .respond_with(uploaded())
        .expect(1)
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "<h1>home</h1>"), ("robots.txt", "User-agent: *")]);
    publisher(&server).publish(dir.path()).await.unwrap();

    let upload = requests_to(&server, UPLOAD_PATH).await;
    let text = body(&upload[0]);
    assert_eq!(text.matches("name=\"files\"").count(), 1);
    assert!(text.contains(&format!("filename=\"{}\"", home)));
    assert!(text.contains("text/html"));
    assert!(text.contains("<h1>home</h1>"));
    assert!(!text.contains("User-agent"));
}

/// ローカルに存在しないハッシュは既定では黙って送らない
#[tokio::test]
async fn test_unknown_missing_hash_is_skipped() {
    let server = MockServer::start().await;
    let h1 = content_hash(b"body{}");
    let h2 = "0".repeat(64);
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[h1.clone(), h2.clone()], None))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(uploaded())
        .expect(1)
        .mount(&server)
        .await;

    let dir = site(&[("style.CSS", "body{}")]);
    publisher(&server).publish(dir.path()).await.unwrap();

    let upload = requests_to(&server, UPLOAD_PATH).await;
    let text = body(&upload[0]);
    assert_eq!(text.matches("name=\"files\"").count(), 1);
    assert!(text.contains(&format!("filename=\"{}\"", h1)));
    assert!(!text.contains(&h2));
    assert!(text.contains("text/css"));
}

#[tokio::test]
async fn test_unknown_missing_hash_fails_when_strict() {
    let server = MockServer::start().await;
    let h2 = "0".repeat(64);
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[content_hash(b"home"), h2.clone()], None))
        .mount(&server)
        .await;
    Mock::given(any())
        .and(path(UPLOAD_PATH))
        .respond_with(uploaded())
        .expect(0)
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let err = publisher(&server)
        .with_policy(MissingHashPolicy::Fail)
        .publish(dir.path())
        .await
        .unwrap_err();

    match err {
        PublishError::MissingLocalContent(hashes) => assert_eq!(hashes, vec![h2]),
        other => panic!("expected MissingLocalContent, got {:?}", other),
    }
}

#[tokio::test]
async fn test_duplicate_content_uploaded_once() {
    let server = MockServer::start().await;
    let same = content_hash(b"same");
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[same.clone()], None))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(uploaded())
        .expect(1)
        .mount(&server)
        .await;

    let dir = site(&[("a.html", "same"), ("b.html", "same")]);
    publisher(&server).publish(dir.path()).await.unwrap();

    let upload = requests_to(&server, UPLOAD_PATH).await;
    assert_eq!(body(&upload[0]).matches("name=\"files\"").count(), 1);
}

#[tokio::test]
async fn test_create_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "errors": [{"code": 10000, "message": "Authentication error"}],
            "result": null
        })))
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let err = publisher(&server).publish(dir.path()).await.unwrap_err();

    match err {
        PublishError::Remote {
            operation,
            message,
            status,
        } => {
            assert_eq!(operation, "create");
            assert_eq!(message, "Authentication error");
            assert_eq!(status, 403);
        }
        other => panic!("expected Remote, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_success_flag_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{"code": 8000007, "message": "Project not found"}]
        })))
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let err = publisher(&server).publish(dir.path()).await.unwrap_err();

    assert!(matches!(
        err,
        PublishError::Remote { status: 200, ref message, .. } if message == "Project not found"
    ));
}

#[tokio::test]
async fn test_non_json_error_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let err = publisher(&server).publish(dir.path()).await.unwrap_err();

    assert!(matches!(
        err,
        PublishError::Remote { status: 502, ref message, .. } if message == "Bad Gateway"
    ));
}

#[tokio::test]
async fn test_upload_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[content_hash(b"home")], None))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(ResponseTemplate::new(413).set_body_json(json!({
            "success": false,
            "errors": [{"code": 8000096, "message": "Upload too large"}]
        })))
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let err = publisher(&server).publish(dir.path()).await.unwrap_err();

    assert!(matches!(
        err,
        PublishError::Remote { operation: "upload", status: 413, .. }
    ));
}

#[tokio::test]
async fn test_missing_directory_is_io_error() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let err = publisher(&server)
        .publish(Path::new("/nonexistent/pagesflow/static"))
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Io(_)));
}

/// missing_hashes が null でも「不足なし」として扱う
#[tokio::test]
async fn test_null_missing_hashes_means_nothing_missing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": {"id": "dep-1", "missing_hashes": null, "url": "https://x.pages.dev"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(any())
        .and(path(UPLOAD_PATH))
        .respond_with(uploaded())
        .expect(0)
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let outcome = publisher(&server).publish(dir.path()).await.unwrap();

    assert_eq!(outcome.url, "https://x.pages.dev");
    assert_eq!(outcome.deployment_id.as_deref(), Some("dep-1"));
}

/// 2xx だが解釈できない応答はリモートのエラーとしては扱わない
#[tokio::test]
async fn test_undecodable_success_body_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let err = publisher(&server).publish(dir.path()).await.unwrap_err();

    assert!(matches!(err, PublishError::Transport(ref message) if message.contains("create")));
}

#[tokio::test]
async fn test_create_timeout_is_applied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[], None).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let err = publisher_with_timeouts(&server, Duration::from_millis(200), Duration::from_secs(10))
        .publish(dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Transport(_)));
}

/// アップロードには作成より長いタイムアウトが使われる
#[tokio::test]
async fn test_upload_uses_its_own_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CREATE_PATH))
        .respond_with(created(&[content_hash(b"home")], None))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .respond_with(uploaded().set_delay(Duration::from_millis(800)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = site(&[("index.html", "home")]);
    let outcome = publisher_with_timeouts(&server, Duration::from_millis(300), Duration::from_secs(10))
        .publish(dir.path())
        .await
        .unwrap();

    assert_eq!(outcome.url, "https://blog.pages.dev");
}
