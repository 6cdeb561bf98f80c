use crate::config::Config;
use crate::server::response::ApiResponse;
use crate::store::RecordStore;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use http::request::Parts;
use http_body_util::Full;
use hyper::header::{HeaderMap, AUTHORIZATION};
use hyper::{Method, Response};
use std::sync::Arc;
use tracing::info;

/// Outcome of one middleware stage: either hand the request on, or
/// short-circuit with a finished response.
pub enum Flow {
    Continue,
    Respond(Response<Full<Bytes>>),
}

/// A cross-cutting check applied ahead of every method handler. The
/// dispatcher runs stages in order and stops at the first response.
pub enum Stage {
    Log(LogStage),
    Auth(AuthStage),
}

impl Stage {
    pub async fn apply(&self, parts: &Parts) -> Flow {
        match self {
            Stage::Log(stage) => stage.apply(parts).await,
            Stage::Auth(stage) => stage.apply(parts),
        }
    }
}

/// Fixed stage order: log always, authenticate conditionally. Not
/// configurable.
pub struct MiddlewareChain {
    stages: Vec<Stage>,
}

impl MiddlewareChain {
    pub fn new(config: Arc<Config>, store: Arc<RecordStore>) -> Self {
        Self {
            stages: vec![
                Stage::Log(LogStage::new(store)),
                Stage::Auth(AuthStage::new(config)),
            ],
        }
    }

    pub async fn run(&self, parts: &Parts) -> Flow {
        for stage in &self.stages {
            if let Flow::Respond(response) = stage.apply(parts).await {
                return Flow::Respond(response);
            }
        }
        Flow::Continue
    }
}

/// Records every request: a tracing event plus an append to the record
/// store. Side effect only; never blocks dispatch or alters the request.
pub struct LogStage {
    store: Arc<RecordStore>,
}

impl LogStage {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    async fn apply(&self, parts: &Parts) -> Flow {
        info!("{} {}", parts.method, parts.uri);
        self.store.append(&parts.method, parts.uri.path()).await;
        Flow::Continue
    }
}

/// Basic-auth gate. A no-op unless both a username and a password are
/// configured; `OPTIONS` is exempt so pre-flight checks always succeed.
pub struct AuthStage {
    config: Arc<Config>,
}

impl AuthStage {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn apply(&self, parts: &Parts) -> Flow {
        if parts.method == Method::OPTIONS {
            return Flow::Continue;
        }

        if self.authorized(&parts.headers) {
            Flow::Continue
        } else {
            Flow::Respond(ApiResponse::unauthorized().build())
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some((username, password)) = self.config.credentials() else {
            return true;
        };

        let Some(value) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) else {
            return false;
        };
        let Some(encoded) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = BASE64.decode(encoded) else {
            return false;
        };
        let Ok(text) = String::from_utf8(decoded) else {
            return false;
        };

        match text.split_once(':') {
            Some((user, pass)) => user == username && pass == password,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::{Request, StatusCode};

    fn auth_stage(username: Option<&str>, password: Option<&str>) -> AuthStage {
        let mut config = Config::default();
        config.auth.username = username.map(String::from);
        config.auth.password = password.map(String::from);
        AuthStage::new(Arc::new(config))
    }

    fn parts(method: Method, auth_header: Option<&str>) -> Parts {
        let mut builder = Request::builder().method(method).uri("/file.txt");
        if let Some(value) = auth_header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn encode(credentials: &str) -> String {
        format!("Basic {}", BASE64.encode(credentials))
    }

    #[test]
    fn test_no_credentials_is_pass_through() {
        let stage = auth_stage(None, None);
        assert!(matches!(
            stage.apply(&parts(Method::GET, None)),
            Flow::Continue
        ));
    }

    #[test]
    fn test_correct_credentials_pass() {
        let stage = auth_stage(Some("admin"), Some("secret"));
        let header = encode("admin:secret");
        assert!(matches!(
            stage.apply(&parts(Method::GET, Some(&header))),
            Flow::Continue
        ));
    }

    #[test]
    fn test_wrong_password_rejected() {
        let stage = auth_stage(Some("admin"), Some("secret"));
        let header = encode("admin:wrong");
        match stage.apply(&parts(Method::GET, Some(&header))) {
            Flow::Respond(response) => {
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
                assert!(response.headers().contains_key("www-authenticate"));
            }
            Flow::Continue => panic!("wrong password must not pass"),
        }
    }

    #[test]
    fn test_missing_header_rejected() {
        let stage = auth_stage(Some("admin"), Some("secret"));
        assert!(matches!(
            stage.apply(&parts(Method::GET, None)),
            Flow::Respond(_)
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let stage = auth_stage(Some("admin"), Some("secret"));
        for header in ["Basic !!!not-base64!!!", "Bearer abc", "Basic "] {
            assert!(matches!(
                stage.apply(&parts(Method::GET, Some(header))),
                Flow::Respond(_)
            ));
        }
        // Decodes but carries no colon separator.
        let no_colon = encode("admin");
        assert!(matches!(
            stage.apply(&parts(Method::GET, Some(&no_colon))),
            Flow::Respond(_)
        ));
    }

    #[test]
    fn test_password_may_contain_colons() {
        let stage = auth_stage(Some("admin"), Some("se:cr:et"));
        let header = encode("admin:se:cr:et");
        assert!(matches!(
            stage.apply(&parts(Method::GET, Some(&header))),
            Flow::Continue
        ));
    }

    #[test]
    fn test_options_is_exempt_from_auth() {
        let stage = auth_stage(Some("admin"), Some("secret"));
        assert!(matches!(
            stage.apply(&parts(Method::OPTIONS, None)),
            Flow::Continue
        ));
    }
}
