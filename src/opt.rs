use std::path::PathBuf;

use structopt::StructOpt;
use thiserror::Error;

use crate::config::{self, ChannelRun, ConfigError, GlobalRun};

#[derive(Error, Debug)]
pub enum DirPathParseError {
    #[error("exists, but is not a directory")]
    InvalidType,
}

#[derive(Error, Debug)]
pub enum LoginParseError {
    #[error("`{0}` is not a valid channel login")]
    Invalid(String),
}

/// Accepts missing paths, they get created before the run starts.
fn valid_dir_path<P>(src: P) -> Result<PathBuf, DirPathParseError>
where
    P: AsRef<str>,
{
    let path = PathBuf::from(src.as_ref());
    match path.metadata() {
        Ok(meta) if !meta.is_dir() => Err(DirPathParseError::InvalidType),
        _ => Ok(path),
    }
}

fn valid_login<P>(src: P) -> Result<String, LoginParseError>
where
    P: AsRef<str>,
{
    let login = src.as_ref().trim();
    if config::is_login(login) {
        Ok(login.to_string())
    } else {
        Err(LoginParseError::Invalid(login.to_string()))
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "emoteoid",
    about = "Download Twitch emotes and write a catalog for asset import."
)]
pub struct Opt {
    /// Log debug output
    #[structopt(short, long, global = true)]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Download the custom emotes of one or more channels
    Channels {
        /// Login name of a channel, may be repeated
        #[structopt(long = "channel", parse(try_from_str = valid_login))]
        channels: Vec<String>,

        /// File with one channel login per line
        #[structopt(long = "channels-file")]
        channels_file: Option<PathBuf>,

        /// Where to save the emotes, one directory per channel
        #[structopt(long = "out-dir", default_value = "ChannelEmotes", parse(try_from_str = valid_dir_path))]
        out_dir: PathBuf,

        /// Where to write the catalog
        #[structopt(long, default_value = "channel_emotes.csv")]
        csv: PathBuf,
    },
    /// Download the globally available emotes
    Global {
        /// Where to save the emotes
        #[structopt(long = "out-dir", default_value = "twitch_emotes", parse(try_from_str = valid_dir_path))]
        out_dir: PathBuf,

        /// Where to write the catalog [default: <out-dir>/global_emotes.csv]
        #[structopt(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Debug)]
pub enum Run {
    Channels(ChannelRun),
    Global(GlobalRun),
}

impl Command {
    pub async fn into_run(self) -> Result<Run, ConfigError> {
        match self {
            Command::Channels {
                mut channels,
                channels_file,
                out_dir,
                csv,
            } => {
                if let Some(path) = channels_file {
                    channels.extend(config::logins_from_file(path).await?);
                }
                let channels = config::dedup_logins(channels);
                if channels.is_empty() {
                    return Err(ConfigError::NoChannels);
                }
                Ok(Run::Channels(ChannelRun {
                    channels,
                    out_dir,
                    csv_path: csv,
                }))
            }
            Command::Global { out_dir, csv } => {
                let csv_path = csv.unwrap_or_else(|| out_dir.join("global_emotes.csv"));
                Ok(Run::Global(GlobalRun { out_dir, csv_path }))
            }
        }
    }
}
