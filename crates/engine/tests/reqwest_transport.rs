use std::time::Duration;

use tanoshi_engine::config::DEFAULT_USER_AGENT;
use tanoshi_engine::{ConnectorEngine, EngineConfig, Error, TransportErrorKind};
use tanoshi_types::{Credentials, Filters};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connector_script(base_url: &str) -> String {
    format!(
        r#"
local json = require("json")

function name() return "wiremock" end
function base_url() return "{base_url}" end

function fetch_manga_request(filters)
    return {{
        method = "GET",
        url = base_url() .. "/search?genre=" .. filters.genre .. "&page=" .. filters.page,
    }}
end

function fetch_manga(body)
    local out = {{}}
    for _, item in ipairs(json.decode(body)) do
        table.insert(out, Manga{{ title = item.title, path = item.path }})
    end
    return out
end

function login_request(credentials)
    return {{
        method = "POST",
        url = base_url() .. "/login",
        header = {{ ["Content-Type"] = "multipart/form-data" }},
        data = {{ username = credentials.username, password = credentials.password }},
    }}
end

function login(headers, body)
    return {{ Cookie = headers["set-cookie"] }}
end

function get_latest_updates_request(page)
    return {{ method = "GET", url = base_url() .. "/slow" }}
end

function get_latest_updates(body) return {{}} end
"#
    )
}

#[tokio::test]
async fn test_fetch_manga_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("genre", "action"))
        .and(query_param("page", "2"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"title": "Knights of Sidonia", "path": "/manga/sidonia"}]"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = ConnectorEngine::with_default_transport(EngineConfig::default()).unwrap();
    let connector = engine
        .load_connector_from_source("wiremock.lua", &connector_script(&server.uri()))
        .unwrap();

    let mut filters = Filters::new();
    filters.insert("genre".to_string(), "action".into());
    filters.insert("page".to_string(), 2i64.into());

    let manga = connector.fetch_manga(&filters).await.unwrap();
    assert_eq!(manga.len(), 1);
    assert_eq!(manga[0].title, "Knights of Sidonia");
}

#[tokio::test]
async fn test_login_sends_multipart_and_keeps_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "sid=abc"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .and(header("cookie", "sid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ConnectorEngine::with_default_transport(EngineConfig::default()).unwrap();
    let connector = engine
        .load_connector_from_source("wiremock.lua", &connector_script(&server.uri()))
        .unwrap();

    let credentials = Credentials {
        username: "reader".to_string(),
        password: "hunter2".to_string(),
        ..Credentials::default()
    };
    connector.login(&credentials).await.unwrap();
    connector.get_latest_updates(1).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let login = requests
        .iter()
        .find(|request| request.url.path() == "/login")
        .unwrap();

    let content_type = login
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data; boundary="));

    let body = String::from_utf8_lossy(&login.body);
    assert!(body.contains(r#"name="username""#));
    assert!(body.contains("reader"));
    assert!(body.contains(r#"name="password""#));
}

#[tokio::test]
async fn test_empty_multipart_form_carries_boundary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let script = format!(
        r#"
function name() return "wiremock" end
function base_url() return "{}" end

function login_request(credentials)
    return {{
        method = "POST",
        url = base_url() .. "/logout",
        header = {{ ["Content-Type"] = "multipart/form-data" }},
        data = {{}},
    }}
end

function login(headers, body) return {{}} end
"#,
        server.uri()
    );

    let engine = ConnectorEngine::with_default_transport(EngineConfig::default()).unwrap();
    let connector = engine
        .load_connector_from_source("wiremock.lua", &script)
        .unwrap();
    connector.login(&Credentials::default()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = EngineConfig {
        request_timeout_secs: Some(1),
        ..EngineConfig::default()
    };
    let engine = ConnectorEngine::with_default_transport(config).unwrap();
    let connector = engine
        .load_connector_from_source("wiremock.lua", &connector_script(&server.uri()))
        .unwrap();

    match connector.get_latest_updates(1).await {
        Err(Error::Transport(e)) => assert_eq!(e.kind, TransportErrorKind::Timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
}
