//! Client for the three Helix endpoints the pipeline needs: app token
//! issuance, user lookup and emote listing.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::{Credentials, Endpoints};
use crate::download::{Request, Transport, TransportError};
use crate::emote::EmoteRecord;
use crate::template::UrlTemplate;

const PAGE_SIZE: &str = "100";

#[derive(Error, Debug)]
pub enum HelixError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("`{url}` answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("couldn't parse response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("listing returned the same cursor `{0}` twice")]
    StuckCursor(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct Pagination {
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmotePage {
    #[serde(default)]
    data: Vec<EmoteRecord>,
    template: Option<String>,
    #[serde(default)]
    pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct AppToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Broadcaster(String),
    Global,
}

#[derive(Debug)]
pub struct EmoteListing {
    pub records: Vec<EmoteRecord>,
    /// Template of the first page, already normalized.
    pub template: Option<UrlTemplate>,
}

pub struct Helix<'a, T: ?Sized> {
    transport: &'a T,
    endpoints: &'a Endpoints,
    client_id: &'a str,
}

impl<'a, T> Helix<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(transport: &'a T, endpoints: &'a Endpoints, client_id: &'a str) -> Self {
        Self {
            transport,
            endpoints,
            client_id,
        }
    }

    async fn send_json<R: DeserializeOwned>(&self, request: Request) -> Result<R, HelixError> {
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(HelixError::Status {
                url,
                status: response.status,
            });
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    fn authorized(&self, request: Request, token: &AppToken) -> Request {
        request
            .header("Client-ID", self.client_id)
            .header("Authorization", format!("Bearer {}", token.access_token))
    }

    /// Client-credentials grant.
    pub async fn app_token(&self, credentials: &Credentials) -> Result<AppToken, HelixError> {
        let request = Request::post(&self.endpoints.token_url)
            .query("client_id", &credentials.client_id)
            .query("client_secret", &credentials.client_secret)
            .query("grant_type", "client_credentials");
        let token: TokenResponse = self.send_json(request).await?;
        let now = Utc::now();
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|valid_for| now.checked_add_signed(valid_for))
            .unwrap_or(now);
        Ok(AppToken {
            access_token: token.access_token,
            expires_at,
        })
    }

    pub async fn user_id(&self, token: &AppToken, login: &str) -> Result<String, HelixError> {
        let request = self.authorized(
            Request::get(&self.endpoints.users_url).query("login", login),
            token,
        );
        let users: DataResponse<User> = self.send_json(request).await?;
        users
            .data
            .into_iter()
            .next()
            .map(|user| user.id)
            .ok_or_else(|| HelixError::UserNotFound(login.to_string()))
    }

    fn emotes_request(&self, token: &AppToken, scope: &Scope, cursor: Option<&str>) -> Request {
        let mut request = match scope {
            Scope::Broadcaster(id) => {
                Request::get(&self.endpoints.channel_emotes_url).query("broadcaster_id", id)
            }
            Scope::Global => {
                Request::get(&self.endpoints.global_emotes_url).query("first", PAGE_SIZE)
            }
        };
        if let Some(cursor) = cursor {
            request = request.query("after", cursor);
        }
        self.authorized(request, token)
    }

    /// Follows `pagination.cursor` until a page comes back without one.
    pub async fn emotes(
        &self,
        token: &AppToken,
        scope: &Scope,
    ) -> Result<EmoteListing, HelixError> {
        let mut records = Vec::new();
        let mut template = None;
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let request = self.emotes_request(token, scope, cursor.as_deref());
            let page: EmotePage = self.send_json(request).await?;
            pages += 1;

            if pages == 1 {
                template = page.template.as_deref().map(UrlTemplate::normalize);
            }
            records.extend(page.data);

            let next = page.pagination.cursor.filter(|c| !c.is_empty());
            match next {
                None => break,
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(HelixError::StuckCursor(next));
                }
                Some(next) => {
                    debug!("following cursor `{next}` after page {pages}");
                    cursor = Some(next);
                }
            }
        }

        debug!("listed {} emotes over {pages} page(s)", records.len());
        Ok(EmoteListing { records, template })
    }
}
