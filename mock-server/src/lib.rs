use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// What the server saw of a request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub name: String,
    pub file_name: Option<String>,
    pub content: String,
}

/// A decoded multipart upload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormEcho {
    pub content_type: String,
    pub fields: Vec<FormField>,
}

/// WebDAV collections created so far.
pub type Collections = Arc<RwLock<HashSet<String>>>;

pub fn app() -> Router {
    let collections: Collections = Arc::default();
    Router::new()
        .route("/echo", any(echo))
        .route("/upload/multipart", post(upload_multipart).put(upload_multipart))
        .route("/delay/{secs}", get(delay))
        .route("/status/{code}", any(status))
        .route("/negotiate", any(negotiate))
        .route("/dav/{*path}", any(dav))
        .with_state(collections)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for name in headers.keys() {
        let values: Vec<_> = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        out.insert(name.as_str().to_string(), values.join(","));
    }
    out
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: header_map(&headers),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn upload_multipart(
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<FormEcho>, (StatusCode, String)> {
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        (StatusCode::BAD_REQUEST, e.to_string())
    };
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content = field.text().await.map_err(bad_request)?;
        fields.push(FormField {
            name,
            file_name,
            content,
        });
    }
    Ok(Json(FormEcho {
        content_type: content_type(&headers),
        fields,
    }))
}

async fn delay(Path(secs): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_secs(secs)).await;
    "done"
}

async fn status(Path(code): Path<u16>) -> (StatusCode, String) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, format!("status {code}"))
}

async fn negotiate(headers: HeaderMap) -> (StatusCode, &'static str) {
    if content_type(&headers).starts_with("application/json") {
        (StatusCode::OK, "accepted")
    } else {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported media type")
    }
}

async fn dav(
    State(collections): State<Collections>,
    method: Method,
    Path(path): Path<String>,
) -> StatusCode {
    let path = path.trim_end_matches('/').to_string();
    match method.as_str() {
        "MKCOL" => {
            if collections.write().await.insert(path) {
                StatusCode::CREATED
            } else {
                StatusCode::METHOD_NOT_ALLOWED
            }
        }
        "GET" | "HEAD" | "PROPFIND" => {
            if collections.read().await.contains(&path) {
                StatusCode::OK
            } else {
                StatusCode::NOT_FOUND
            }
        }
        _ => StatusCode::METHOD_NOT_ALLOWED,
    }
}
