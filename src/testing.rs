//! In-memory [`Transport`] used by the unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;

use crate::download::{Request, Response, Transport, TransportError};

enum Reply {
    Status(u16, Bytes),
    /// The request never gets an answer.
    Unreachable,
}

struct Route {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    reply: Reply,
}

impl Route {
    fn matches(&self, request: &Request) -> bool {
        self.method == request.method
            && self.url == request.url
            && self
                .query
                .iter()
                .all(|(k, v)| request.query_value(k) == Some(v.as_str()))
    }
}

/// Answers with the most specific matching route (the one constraining the
/// most query parameters), 404 if none match.
#[derive(Default)]
pub struct FakeTransport {
    routes: Vec<Route>,
    requests: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new() -> FakeTransport {
        Self::default()
    }

    pub fn route(self, method: Method, url: &str, status: u16, body: impl Into<Bytes>) -> Self {
        self.route_query(method, url, &[], status, body)
    }

    pub fn route_query(
        self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        status: u16,
        body: impl Into<Bytes>,
    ) -> Self {
        self.push(method, url, query, Reply::Status(status, body.into()))
    }

    /// Requests to `url` fail at the transport level.
    pub fn unreachable(self, method: Method, url: &str) -> Self {
        self.push(method, url, &[], Reply::Unreachable)
    }

    fn push(mut self, method: Method, url: &str, query: &[(&str, &str)], reply: Reply) -> Self {
        self.routes.push(Route {
            method,
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            reply,
        });
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let reply = self
            .routes
            .iter()
            .filter(|route| route.matches(&request))
            .max_by_key(|route| route.query.len())
            .map(|route| &route.reply);
        let response = match reply {
            Some(Reply::Status(status, body)) => Ok(Response {
                status: *status,
                body: body.clone(),
            }),
            Some(Reply::Unreachable) => Err(unreachable_error()),
            None => Ok(Response {
                status: 404,
                body: Bytes::new(),
            }),
        };
        self.requests.lock().unwrap().push(request);
        response
    }
}

/// Relative urls never build, which yields a real `reqwest::Error`.
fn unreachable_error() -> TransportError {
    let err = reqwest::Client::new()
        .get("no-host")
        .build()
        .expect_err("relative url must not build");
    TransportError::Http(err)
}
