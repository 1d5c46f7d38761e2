#![allow(dead_code)]

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use gitlab_pkg_migrate::config::{Config, MigrationConfig, RegistryEndpoint};
use gitlab_pkg_migrate::models::PackageType;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SOURCE_TOKEN: &str = "source-token";
pub const DESTINATION_TOKEN: &str = "destination-token";
pub const PROJECT_ID: &str = "1";
pub const PROJECT_PATH: &str = "/api/v4/projects/1";

/// A request as seen by the fake registry
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub token: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query.as_deref()?.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == key).then(|| v.to_string())
        })
    }
}

#[derive(Debug, Clone)]
struct CannedResponse {
    status: StatusCode,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

#[derive(Default)]
struct RegistryState {
    /// Per (method, path) queue; the last entry is reused once the queue runs dry
    responses: HashMap<(Method, String), Vec<CannedResponse>>,
    requests: Vec<RecordedRequest>,
    /// Bodies stored by successful PUTs, served back on GET
    stored: HashMap<String, Vec<u8>>,
}

/// In-process stand-in for a GitLab package registry
pub struct FakeRegistry {
    pub base_address: String,
    state: Arc<Mutex<RegistryState>>,
}

impl FakeRegistry {
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(RegistryState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_address: format!("http://{addr}"),
            state,
        }
    }

    pub fn endpoint(&self, token: &str) -> RegistryEndpoint {
        RegistryEndpoint {
            base_address: self.base_address.clone(),
            project_id: PROJECT_ID.to_string(),
            private_token: token.to_string(),
        }
    }

    fn push(&self, method: Method, path: &str, response: CannedResponse) {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry((method, path.to_string()))
            .or_default()
            .push(response);
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.push(
            method,
            path,
            CannedResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers: Vec::new(),
                body: body.into(),
            },
        );
    }

    pub fn respond_json(&self, path: &str, value: Value) {
        self.respond(Method::GET, path, 200, serde_json::to_vec(&value).unwrap());
    }

    /// JSON page that announces a following page via `x-next-page`
    pub fn respond_json_page(&self, path: &str, value: Value, next_page: Option<u32>) {
        let headers = match next_page {
            Some(page) => vec![("x-next-page", page.to_string())],
            None => vec![("x-next-page", String::new())],
        };
        self.push(
            Method::GET,
            path,
            CannedResponse {
                status: StatusCode::OK,
                headers,
                body: serde_json::to_vec(&value).unwrap(),
            },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

async fn handle(
    State(state): State<Arc<Mutex<RegistryState>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let mut state = state.lock().unwrap();

    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        token: headers
            .get("private-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    });

    let canned = state
        .responses
        .get_mut(&(method.clone(), path.clone()))
        .and_then(|queue| {
            if queue.len() > 1 {
                Some(queue.remove(0))
            } else {
                queue.first().cloned()
            }
        });

    if method == Method::PUT {
        let status = canned.as_ref().map_or(StatusCode::CREATED, |c| c.status);
        if status.is_success() {
            state.stored.insert(path, body.to_vec());
        }
        return status.into_response();
    }

    if let Some(canned) = canned {
        let mut response_headers = HeaderMap::new();
        for (name, value) in canned.headers {
            response_headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(&value).unwrap(),
            );
        }
        return (canned.status, response_headers, canned.body).into_response();
    }

    match state.stored.get(&path) {
        Some(data) => (StatusCode::OK, data.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn package_json(id: u64, name: &str, version: &str, package_type: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "version": version,
        "package_type": package_type,
        "status": "default",
        "created_at": "2022-11-09T11:17:03.736+01:00"
    })
}

pub fn package_file_json(id: u64, package_id: u64, file_name: &str, size: u64) -> Value {
    json!({
        "id": id,
        "package_id": package_id,
        "created_at": "2022-11-09T11:17:03.736+01:00",
        "file_name": file_name,
        "size": size,
        "file_md5": "d41d8cd98f00b204e9800998ecf8427e",
        "file_sha1": "da39a3ee5e6b4b0d3255bfef95601890afd80709",
        "file_sha256": null
    })
}

pub fn packages_path() -> String {
    format!("{PROJECT_PATH}/packages")
}

pub fn package_files_path(package_id: u64) -> String {
    format!("{PROJECT_PATH}/packages/{package_id}/package_files")
}

pub fn file_path(package_type: &str, name: &str, version: &str, file_name: &str) -> String {
    format!("{PROJECT_PATH}/packages/{package_type}/{name}/{version}/{file_name}")
}

pub fn test_config(
    source: &FakeRegistry,
    destination: &FakeRegistry,
    package_types: Vec<PackageType>,
    dry_run: bool,
) -> Config {
    Config {
        source: source.endpoint(SOURCE_TOKEN),
        destination: destination.endpoint(DESTINATION_TOKEN),
        migration: MigrationConfig {
            package_types,
            dry_run,
            ..MigrationConfig::default()
        },
    }
    .validated()
    .unwrap()
}

/// Source with the single Maven package `lib` 0.6.0 holding `lib-0.6.0.jar`
/// declared as 100 bytes, served with `content`
pub fn seed_single_maven_package(source: &FakeRegistry, content: Vec<u8>) {
    source.respond_json(
        &packages_path(),
        json!([package_json(60449, "lib", "0.6.0", "maven")]),
    );
    source.respond_json(
        &package_files_path(60449),
        json!([package_file_json(1, 60449, "lib-0.6.0.jar", 100)]),
    );
    source.respond(
        Method::GET,
        &file_path("maven", "lib", "0.6.0", "lib-0.6.0.jar"),
        200,
        content,
    );
}
