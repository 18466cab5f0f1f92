use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::Method;
use thiserror::Error;

const USER_AGENT: &str = "\
    Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) \
    Chrome/110.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("couldn't build http client: {0}")]
    Build(reqwest::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server answered with status {0}")]
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Request {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }
    pub fn get(url: impl Into<String>) -> Request {
        Self::new(Method::GET, url)
    }
    pub fn post(url: impl Into<String>) -> Request {
        Self::new(Method::POST, url)
    }
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Request {
        self.query.push((key.into(), value.into()));
        self
    }
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Request {
        self.headers.push((name, value.into()));
        self
    }
    #[cfg(test)]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and hands back the status and the full body.
///
/// Non-success statuses are *not* errors at this level, callers decide.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<HttpTransport, TransportError> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(Response { status, body })
    }
}

/// Single GET for an image rendition, no retries.
pub async fn download<T>(transport: &T, url: &str) -> Result<Bytes, DownloadError>
where
    T: Transport + ?Sized,
{
    let response = transport.send(Request::get(url)).await?;
    if !response.is_success() {
        return Err(DownloadError::Status(response.status));
    }
    debug!("downloaded `{url}` ({} bytes)", response.body.len());
    Ok(response.body)
}
