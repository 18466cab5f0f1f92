use std::collections::HashSet;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use lazy_regex::regex_is_match;
use log::warn;
use thiserror::Error;

use crate::template::UrlTemplate;

pub const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const USERS_URL: &str = "https://api.twitch.tv/helix/users";
pub const CHANNEL_EMOTES_URL: &str = "https://api.twitch.tv/helix/chat/emotes";
pub const GLOBAL_EMOTES_URL: &str = "https://api.twitch.tv/helix/chat/emotes/global";
pub const CHANNEL_CDN_TEMPLATE: &str =
    "https://static-cdn.jtvnw.net/emoticons/v2/{{id}}/{{format}}/{{theme_mode}}/{{scale}}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable `{name}` is missing: {source}")]
    MissingVar {
        name: &'static str,
        source: dotenv::Error,
    },
    #[error("couldn't read channel list `{}`: {source}", path.display())]
    ChannelList {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no channels given")]
    NoChannels,
}

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &'static str| {
            dotenv::var(name).map_err(|source| ConfigError::MissingVar { name, source })
        };
        Ok(Self {
            client_id: var("TWITCH_CLIENT_ID")?,
            client_secret: var("TWITCH_CLIENT_SECRET")?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct Endpoints {
    #[builder(default = "TOKEN_URL.to_string()")]
    pub token_url: String,
    #[builder(default = "USERS_URL.to_string()")]
    pub users_url: String,
    #[builder(default = "CHANNEL_EMOTES_URL.to_string()")]
    pub channel_emotes_url: String,
    #[builder(default = "GLOBAL_EMOTES_URL.to_string()")]
    pub global_emotes_url: String,
    #[builder(default = "UrlTemplate::normalize(CHANNEL_CDN_TEMPLATE)")]
    pub cdn_template: UrlTemplate,
}

impl Endpoints {
    pub fn builder() -> EndpointsBuilder {
        EndpointsBuilder::default()
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        // SAFETY: Every field has a default
        Self::builder().build().unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct ChannelRun {
    pub channels: Vec<String>,
    pub out_dir: PathBuf,
    pub csv_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GlobalRun {
    pub out_dir: PathBuf,
    pub csv_path: PathBuf,
}

pub fn is_login(input: &str) -> bool {
    regex_is_match!(r"^[A-Za-z0-9_]{1,25}$", input)
}

/// Parses a newline-separated list of channel logins, skipping blanks and
/// `#` comments.
pub fn logins_from_str(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            let valid = is_login(line);
            if !valid {
                warn!("ignoring invalid channel login `{line}`");
            }
            valid
        })
        .map(str::to_string)
        .collect()
}

pub async fn logins_from_file<P>(path: P) -> Result<Vec<String>, ConfigError>
where
    P: AsRef<Path>,
{
    let data = tokio::fs::read_to_string(path.as_ref())
        .await
        .map_err(|source| ConfigError::ChannelList {
            path: path.as_ref().to_owned(),
            source,
        })?;
    Ok(logins_from_str(&data))
}

/// Lower-cases and drops repeated logins, keeping first-seen order.
pub fn dedup_logins<I>(logins: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    logins
        .into_iter()
        .map(|login| login.as_ref().to_lowercase())
        .filter(|login| seen.insert(login.clone()))
        .collect()
}
