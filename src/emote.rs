use std::path::{Path, PathBuf};

use lazy_regex::regex_is_match;
use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::download::{download, DownloadError, Transport};
use crate::rendition::{Rendition, SelectionPolicy};
use crate::template::UrlTemplate;
use crate::transcode::{self, TranscodeError};

/// One entry of a Helix emote listing, kept as returned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmoteRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub format: Vec<String>,
    #[serde(default)]
    pub scale: Vec<String>,
    #[serde(default)]
    pub theme_mode: Vec<String>,
}

#[derive(Error, Debug)]
pub enum EmoteError {
    #[error("refusing emote id `{0}`")]
    InvalidId(String),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("save failed: {0}")]
    Transcode(#[from] TranscodeError),
    #[error("save failed: {0}")]
    Write(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct Emote {
    pub rendition: Rendition,
    pub path: PathBuf,
    pub size: (u32, u32),
}

impl Emote {
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    async fn save(data: &[u8], rendition: &Rendition, path: &Path) -> Result<(), EmoteError> {
        if rendition.format.is_animated() {
            let out = transcode::to_looping_gif(data)?;
            tokio::fs::write(path, &out.data).await?;
            match out.delay_ms {
                Some(delay) if out.is_animated() => debug!(
                    "wrote `{}` with {} frame(s) at {delay}ms",
                    path.display(),
                    out.frame_count
                ),
                _ => debug!("wrote `{}` as a still", path.display()),
            }
        } else {
            tokio::fs::write(path, data).await?;
        }
        Ok(())
    }

    /// Selects, downloads and stores one emote below `dir`.
    ///
    /// The size falls back to `0x0` when the downloaded bytes can't be probed,
    /// that alone never fails the emote.
    pub async fn fetch<T, P>(
        transport: &T,
        policy: &P,
        template: &UrlTemplate,
        record: &EmoteRecord,
        dir: &Path,
    ) -> Result<Emote, EmoteError>
    where
        T: Transport + ?Sized,
        P: SelectionPolicy + ?Sized,
    {
        if !regex_is_match!(r"^[A-Za-z0-9_]+$", &record.id) {
            return Err(EmoteError::InvalidId(record.id.clone()));
        }
        let rendition = policy.select(record);
        let url = template.render(&record.id, &rendition);
        let data = download(transport, &url).await?;

        let path = dir.join(rendition.file_name(&record.id));
        Self::save(&data, &rendition, &path).await?;

        let size = transcode::probe_size(&data).unwrap_or_else(|err| {
            warn!("couldn't read size of emote `{}`: {err}", record.id);
            (0, 0)
        });

        Ok(Emote {
            rendition,
            path,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::rendition::{ChannelPolicy, Format, GlobalPolicy};
    use crate::testing::FakeTransport;
    use crate::transcode::tests::{gif_fixture, png_fixture};

    fn template() -> UrlTemplate {
        UrlTemplate::normalize("https://cdn/{{id}}/{{format}}/{{theme_mode}}/{{scale}}")
    }

    fn record(id: &str, format: &[&str]) -> EmoteRecord {
        EmoteRecord {
            id: id.into(),
            name: "Kappa".into(),
            format: format.iter().map(|s| s.to_string()).collect(),
            scale: vec!["1.0".into(), "2.0".into()],
            theme_mode: vec!["light".into(), "dark".into()],
        }
    }

    #[test]
    fn record_fields_default_when_missing() {
        let record: EmoteRecord = serde_json::from_str(r#"{"id":"1","name":"a"}"#).unwrap();
        assert!(record.format.is_empty());
        assert!(record.scale.is_empty());
        assert!(record.theme_mode.is_empty());
    }

    #[tokio::test]
    async fn static_emote_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let png = png_fixture(28, 28);
        let transport = FakeTransport::new().route(
            Method::GET,
            "https://cdn/e1/static/light/2.0",
            200,
            png.clone(),
        );

        let record = record("e1", &["static"]);
        let emote = Emote::fetch(&transport, &ChannelPolicy, &template(), &record, dir.path())
            .await
            .unwrap();

        assert_eq!(emote.rendition.format, Format::Static);
        assert_eq!(emote.file_name(), "e1.png");
        assert_eq!(emote.size, (28, 28));
        assert_eq!(std::fs::read(dir.path().join("e1.png")).unwrap(), png);
    }

    #[tokio::test]
    async fn animated_emote_is_transcoded() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new().route(
            Method::GET,
            "https://cdn/e2/animated/dark/2.0",
            200,
            gif_fixture(16, 16, &[4, 4, 4]),
        );

        let emote = Emote::fetch(
            &transport,
            &GlobalPolicy,
            &template(),
            &record("e2", &["static", "animated"]),
            dir.path(),
        )
        .await
        .unwrap();

        assert_eq!(emote.file_name(), "e2.gif");
        assert_eq!(emote.size, (16, 16));
        let written = std::fs::read(dir.path().join("e2.gif")).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), image::ImageFormat::Gif);
    }

    #[tokio::test]
    async fn unprobeable_static_emote_keeps_zero_size() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new().route(
            Method::GET,
            "https://cdn/e3/static/light/2.0",
            200,
            "not an image",
        );

        let record = record("e3", &["static"]);
        let emote = Emote::fetch(&transport, &ChannelPolicy, &template(), &record, dir.path())
            .await
            .unwrap();
        assert_eq!(emote.size, (0, 0));
        assert!(dir.path().join("e3.png").exists());
    }

    #[tokio::test]
    async fn failed_download_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new();

        let record = record("e4", &["static"]);
        let err = Emote::fetch(&transport, &ChannelPolicy, &template(), &record, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, EmoteError::Download(DownloadError::Status(404))));
        assert!(!dir.path().join("e4.png").exists());
    }

    #[tokio::test]
    async fn broken_animation_is_a_save_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new().route(
            Method::GET,
            "https://cdn/e5/animated/light/2.0",
            200,
            "garbage",
        );

        let record = record("e5", &["animated"]);
        let err = Emote::fetch(&transport, &ChannelPolicy, &template(), &record, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, EmoteError::Transcode(_)));
        assert!(err.to_string().starts_with("save failed"));
    }

    #[tokio::test]
    async fn unreachable_cdn_is_a_download_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transport =
            FakeTransport::new().unreachable(Method::GET, "https://cdn/e6/static/light/2.0");

        let record = record("e6", &["static"]);
        let err = Emote::fetch(&transport, &ChannelPolicy, &template(), &record, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmoteError::Download(DownloadError::Transport(_))
        ));
        assert!(!dir.path().join("e6.png").exists());
    }

    #[tokio::test]
    async fn path_like_ids_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new();

        for id in ["../escape", "a/b", ""] {
            let record = record(id, &["static"]);
            let err = Emote::fetch(&transport, &ChannelPolicy, &template(), &record, dir.path())
                .await
                .unwrap_err();
            assert!(matches!(err, EmoteError::InvalidId(got) if got == id));
        }
        assert!(transport.requests().is_empty());
    }
}
