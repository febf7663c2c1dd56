//! In-process stand-in for the GitHub Contents API
//!
//! Serves `/repos/:owner/:repo/contents/*path` from a map of path to blob,
//! enforcing the blob SHA rules of the real API so commit logic is exercised
//! end to end.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{
        header::{ACCEPT, AUTHORIZATION},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

use filesaver_server::{Config, GitHubConfig};

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_REPO_OWNER: &str = "octo";
pub const TEST_REPO_NAME: &str = "files";

/// Largest blob the real API inlines in a contents response (1 MB)
pub const INLINE_CONTENT_LIMIT: usize = 1_048_576;

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

struct StoredBlob {
    sha: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct Repo {
    files: BTreeMap<String, StoredBlob>,
    put_bodies: Vec<Value>,
    commits: u64,
    fail_writes: bool,
    delay: Option<Duration>,
    inline_limit: Option<usize>,
    raw_fetches: usize,
}

#[derive(Clone, Default)]
pub struct FakeGitHub {
    repo: Arc<Mutex<Repo>>,
}

impl FakeGitHub {
    /// Start serving on an ephemeral port; returns the API base URL
    pub async fn spawn() -> (FakeGitHub, String) {
        let fake = FakeGitHub::default();
        let app = Router::new()
            .route(
                "/repos/:owner/:repo/contents/*path",
                get(get_contents).put(put_contents).delete(delete_contents),
            )
            .layer(DefaultBodyLimit::disable())
            .with_state(fake.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (fake, format!("http://{}", addr))
    }

    /// Bytes currently committed at `path`
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        let repo = self.repo.lock().unwrap();
        repo.files.get(path).map(|blob| blob.bytes.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.repo.lock().unwrap().files.keys().cloned().collect()
    }

    /// Every PUT body received so far, in order
    pub fn put_bodies(&self) -> Vec<Value> {
        self.repo.lock().unwrap().put_bodies.clone()
    }

    /// Make every PUT and DELETE answer 500
    pub fn fail_writes(&self) {
        self.repo.lock().unwrap().fail_writes = true;
    }

    /// Hold every response for `delay`
    pub fn slow_down(&self, delay: Duration) {
        self.repo.lock().unwrap().delay = Some(delay);
    }

    /// Answer blobs larger than `bytes` like the real API does for files over
    /// 1 MB: `encoding: "none"`, no content, raw bytes only on request
    pub fn inline_content_up_to(&self, bytes: usize) {
        self.repo.lock().unwrap().inline_limit = Some(bytes);
    }

    /// GETs served with the raw media type
    pub fn raw_fetches(&self) -> usize {
        self.repo.lock().unwrap().raw_fetches
    }

    fn delay(&self) -> Option<Duration> {
        self.repo.lock().unwrap().delay
    }
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn check_auth(headers: &HeaderMap) -> Option<Response> {
    let expected = format!("Bearer {}", TEST_TOKEN);
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => None,
        _ => Some(message(StatusCode::UNAUTHORIZED, "Bad credentials")),
    }
}

fn file_entry(path: &str, blob: &StoredBlob, inline_limit: Option<usize>) -> Value {
    let name = path.rsplit('/').next().unwrap_or(path);
    let mut entry = json!({
        "name": name,
        "path": path,
        "sha": blob.sha,
        "size": blob.bytes.len(),
        "type": "file",
        "html_url": format!("https://github.test/{}/{}/blob/main/{}", TEST_REPO_OWNER, TEST_REPO_NAME, path),
    });
    match inline_limit {
        None => {}
        Some(limit) if blob.bytes.len() > limit => {
            entry["content"] = json!("");
            entry["encoding"] = json!("none");
        }
        Some(_) => {
            // The real API wraps base64 at 60 columns
            let encoded = BASE64.encode(&blob.bytes);
            let wrapped: Vec<String> = encoded
                .as_bytes()
                .chunks(60)
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect();
            entry["content"] = json!(wrapped.join("\n"));
            entry["encoding"] = json!("base64");
        }
    }
    entry
}

async fn get_contents(
    State(fake): State<FakeGitHub>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
) -> Response {
    if let Some(delay) = fake.delay() {
        tokio::time::sleep(delay).await;
    }
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }

    let wants_raw = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == RAW_MEDIA_TYPE);

    let mut repo = fake.repo.lock().unwrap();
    if wants_raw {
        repo.raw_fetches += 1;
    }
    if let Some(blob) = repo.files.get(&path) {
        if wants_raw {
            return blob.bytes.clone().into_response();
        }
        let limit = repo.inline_limit.unwrap_or(INLINE_CONTENT_LIMIT);
        return Json(file_entry(&path, blob, Some(limit))).into_response();
    }

    let prefix = format!("{}/", path);
    let mut dirs = BTreeSet::new();
    let mut entries = Vec::new();
    for (file_path, blob) in repo.files.range(prefix.clone()..) {
        let Some(rest) = file_path.strip_prefix(&prefix) else {
            break;
        };
        match rest.split_once('/') {
            Some((dir, _)) => {
                dirs.insert(dir.to_string());
            }
            None => entries.push(file_entry(file_path, blob, None)),
        }
    }
    if entries.is_empty() && dirs.is_empty() {
        return message(StatusCode::NOT_FOUND, "Not Found");
    }
    for dir in dirs {
        entries.push(json!({
            "name": dir,
            "path": format!("{}{}", prefix, dir),
            "sha": "0000000000000000000000000000000000000000",
            "size": 0,
            "type": "dir",
        }));
    }
    Json(Value::Array(entries)).into_response()
}

async fn put_contents(
    State(fake): State<FakeGitHub>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }

    let mut repo = fake.repo.lock().unwrap();
    repo.put_bodies.push(body.clone());
    if repo.fail_writes {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");
    }

    let Some(bytes) = body["content"]
        .as_str()
        .and_then(|content| BASE64.decode(content).ok())
    else {
        return message(StatusCode::UNPROCESSABLE_ENTITY, "content is not valid Base64");
    };

    let current_sha = repo.files.get(&path).map(|blob| blob.sha.clone());
    let status = match (current_sha, body["sha"].as_str()) {
        (Some(_), None) => {
            return message(StatusCode::UNPROCESSABLE_ENTITY, "\"sha\" wasn't supplied.")
        }
        (Some(existing), Some(sha)) if existing != sha => {
            return message(StatusCode::CONFLICT, "sha does not match")
        }
        (Some(_), Some(_)) => StatusCode::OK,
        (None, _) => StatusCode::CREATED,
    };

    repo.commits += 1;
    let blob = StoredBlob {
        sha: format!("{:040x}", repo.commits),
        bytes,
    };
    let entry = file_entry(&path, &blob, None);
    repo.files.insert(path, blob);

    (status, Json(json!({ "content": entry }))).into_response()
}

async fn delete_contents(
    State(fake): State<FakeGitHub>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(denied) = check_auth(&headers) {
        return denied;
    }

    let mut repo = fake.repo.lock().unwrap();
    if repo.fail_writes {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");
    }

    let current_sha = repo.files.get(&path).map(|blob| blob.sha.clone());
    match current_sha {
        None => message(StatusCode::NOT_FOUND, "Not Found"),
        Some(sha) if Some(sha.as_str()) != body["sha"].as_str() => {
            message(StatusCode::CONFLICT, "sha does not match")
        }
        Some(_) => {
            repo.files.remove(&path);
            Json(json!({ "content": null })).into_response()
        }
    }
}

/// GitHub settings pointing at a fake served from `api_url`
pub fn github_config(api_url: &str) -> GitHubConfig {
    GitHubConfig {
        api_url: api_url.to_string(),
        token: TEST_TOKEN.to_string(),
        repo_owner: TEST_REPO_OWNER.to_string(),
        repo_name: TEST_REPO_NAME.to_string(),
        branch: "main".to_string(),
        target_path: "saving".to_string(),
        timeout_secs: 5,
    }
}

/// Full configuration with all files under `dir`
pub fn test_config(dir: &FsPath, api_url: &str) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        allowed_origins: vec!["http://localhost:5173".to_string()],
        environment: "test".to_string(),
        users_csv: dir.join("users.csv"),
        local_root: dir.join("local_backup"),
        github: github_config(api_url),
    }
}
