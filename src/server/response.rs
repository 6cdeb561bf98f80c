use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::collections::HashMap;

pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn header_string(mut self, name: &str, value: String) -> Self {
        self.headers.insert(name.to_string(), value);
        self
    }

    pub fn json(self, value: &serde_json::Value) -> Self {
        let body = Bytes::from(value.to_string());
        self.header("content-type", "application/json").body(body)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Response<Full<Bytes>> {
        let mut response = Response::builder().status(self.status);

        for (name, value) in self.headers {
            response = response.header(&name, value);
        }

        response
            .body(Full::new(self.body))
            .expect("Failed to build response")
    }
}

/// Canonical responses for the documented wire contract.
pub struct ApiResponse;

impl ApiResponse {
    /// 404 for GET/DELETE against a path that names no file.
    pub fn file_not_found() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::NOT_FOUND)
            .json(&serde_json::json!({"error": "File not found"}))
    }

    pub fn file_deleted() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::OK).json(&serde_json::json!({"message": "File deleted"}))
    }

    /// 200 envelope echoing a parsed JSON upload.
    pub fn upload_received(method: &hyper::Method, data: serde_json::Value) -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::OK).json(&serde_json::json!({
            "message": format!("{} request received", method),
            "data": data,
        }))
    }

    /// 401 challenge; the wrapped handler is never reached.
    pub fn unauthorized() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::UNAUTHORIZED)
            .header("www-authenticate", "Basic realm=\"Restricted\"")
            .header("content-type", "text/plain")
            .body(Bytes::from_static(b"Unauthorized"))
    }

    /// 413, sent before the body is read.
    pub fn payload_too_large() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::PAYLOAD_TOO_LARGE)
    }

    pub fn method_not_allowed() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// 204 preflight answer; CORS headers are layered on by the caller.
    pub fn no_content() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::NO_CONTENT)
    }

    /// The single 500 escalation path: the failure's text as the body.
    pub fn internal_error(message: &str) -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
            .header("content-type", "text/plain")
            .body(Bytes::from(message.to_string()))
    }
}

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Stamps the fixed CORS allow-list onto a response. Applied uniformly to
/// every response from the request listener when CORS is enabled.
pub fn apply_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    headers.insert(
        "access-control-allow-origin",
        CORS_ALLOW_ORIGIN.parse().expect("static header value"),
    );
    headers.insert(
        "access-control-allow-methods",
        CORS_ALLOW_METHODS.parse().expect("static header value"),
    );
    headers.insert(
        "access-control-allow-headers",
        CORS_ALLOW_HEADERS.parse().expect("static header value"),
    );
    response
}
