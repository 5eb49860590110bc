//! Scripted in-memory transport for pipeline tests.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use netdesk_types::{
    ApiRequest, ApiResponse, NetdeskError, NetworkErrorKind, Notifier, Transport, traits::Result,
};
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A JWT-shaped token whose `exp` is `secs` from now (wall clock).
pub(crate) fn jwt_expiring_in(secs: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        .cast_signed();
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"op","exp":{}}}"#, now + secs));
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig")
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: String,
    },
    Timeout,
}

impl Reply {
    pub(crate) fn status(status: u16) -> Self {
        Self::Status {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub(crate) fn json(status: u16, body: &Value) -> Self {
        Self::Status {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub(crate) fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let Self::Status { headers, .. } = &mut self {
            headers.push((name, value.into()));
        }
        self
    }

    fn into_response(self) -> Result<ApiResponse> {
        match self {
            Self::Timeout => Err(NetdeskError::network(
                NetworkErrorKind::Timeout,
                "operation timed out",
            )),
            Self::Status {
                status,
                headers,
                body,
            } => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.insert(
                        HeaderName::from_static(name),
                        HeaderValue::from_str(&value).unwrap(),
                    );
                }
                Ok(ApiResponse::new(
                    StatusCode::from_u16(status).unwrap(),
                    map,
                    body,
                ))
            }
        }
    }
}

#[derive(Default)]
struct Route {
    replies: VecDeque<Reply>,
    last: Option<Reply>,
    delay: Duration,
}

/// Replies from per-route scripts; the last scripted reply repeats once the
/// script runs out, unknown routes answer 404. Every request is recorded.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<String, Route>>,
    sent: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(&self, path: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        routes
            .entry(path.to_string())
            .or_default()
            .replies
            .extend(replies);
        self
    }

    pub(crate) fn delay(&self, path: &str, delay: Duration) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .delay = delay;
        self
    }

    pub(crate) fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_to(&self, path: &str) -> Vec<ApiRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.route() == path)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.sent.lock().unwrap().push(request.clone());

        let (reply, delay) = {
            let mut routes = self.routes.lock().unwrap();
            match routes.get_mut(request.route()) {
                Some(route) => {
                    let reply = match route.replies.pop_front() {
                        Some(reply) => {
                            route.last = Some(reply.clone());
                            reply
                        }
                        None => route.last.clone().unwrap_or_else(|| Reply::status(404)),
                    };
                    (reply, route.delay)
                }
                None => (Reply::status(404), Duration::ZERO),
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply.into_response()
    }
}

/// Notifier that remembers what it was told.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) seen: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, error: &NetdeskError) {
        self.seen.lock().unwrap().push(error.to_string());
    }
}
