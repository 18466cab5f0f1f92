use std::collections::HashSet;
use std::fmt::Display;
use std::fs::File;
use std::path::Path;

use anyhow::{Context as _, Result};
use log::{debug, info, warn};

use crate::catalog::{Catalog, RowNaming};
use crate::config::{ChannelRun, Credentials, Endpoints, GlobalRun};
use crate::download::Transport;
use crate::emote::{Emote, EmoteRecord};
use crate::helix::{AppToken, Helix, HelixError, Scope};
use crate::rendition::{ChannelPolicy, GlobalPolicy, SelectionPolicy};
use crate::skip_ext::SkipLog;
use crate::template::UrlTemplate;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    pub emotes_skipped: usize,
    pub channels_skipped: usize,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} row(s) written, {} emote(s) skipped, {} channel(s) skipped",
            self.rows, self.emotes_skipped, self.channels_skipped
        )
    }
}

/// Everything one batch of emotes shares while being written out.
struct Batch<'a, P: ?Sized> {
    label: &'a str,
    policy: &'a P,
    template: &'a UrlTemplate,
    dir: &'a Path,
    naming: RowNaming,
    /// Ids that already have a row.
    seen: HashSet<String>,
}

pub struct Context<'a, T: ?Sized> {
    transport: &'a T,
    endpoints: Endpoints,
    credentials: Credentials,
}

impl<'a, T> Context<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(transport: &'a T, endpoints: Endpoints, credentials: Credentials) -> Self {
        Self {
            transport,
            endpoints,
            credentials,
        }
    }

    fn helix(&self) -> Helix<'_, T> {
        Helix::new(self.transport, &self.endpoints, &self.credentials.client_id)
    }

    pub async fn authenticate(&self) -> Result<AppToken, HelixError> {
        let token = self.helix().app_token(&self.credentials).await?;
        info!("got app access token, valid until {}", token.expires_at);
        Ok(token)
    }

    async fn open_catalog(out_dir: &Path, csv_path: &Path) -> Result<Catalog<File>> {
        crate::fs::assert_dir(out_dir).await?;
        crate::fs::assert_parent_dir(csv_path).await?;
        Catalog::create(csv_path)
            .with_context(|| format!("couldn't create catalog `{}`", csv_path.display()))
    }

    /// Runs every record through select, download, save and appends a row for
    /// the ones that made it. Only a failing catalog write is returned.
    async fn write_batch<P>(
        &self,
        batch: &mut Batch<'_, P>,
        records: &[EmoteRecord],
        catalog: &mut Catalog<File>,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        P: SelectionPolicy + ?Sized,
    {
        let label = batch.label;
        for record in records {
            if batch.seen.contains(&record.id) {
                warn!("[{label}] skipping repeated emote `{}`", record.id);
                summary.emotes_skipped += 1;
                continue;
            }

            let fetched = Emote::fetch(
                self.transport,
                batch.policy,
                batch.template,
                record,
                batch.dir,
            )
            .await
            .skip_log(|| format!("[{label}] {}", record.id));
            let Some(emote) = fetched else {
                summary.emotes_skipped += 1;
                continue;
            };

            let row = batch.naming.row(record, emote.size);
            catalog
                .append(&row)
                .with_context(|| format!("couldn't write row `{}`", row.row_name))?;
            batch.seen.insert(record.id.clone());
            summary.rows += 1;

            let (w, h) = emote.size;
            debug!("[{label}] {} picked {:?}", record.id, emote.rendition);
            info!(
                "[{label}] • {} '{}' → {w}×{h} ({})",
                row.row_name,
                row.code,
                emote.file_name()
            );
        }
        Ok(())
    }

    async fn channel(
        &self,
        token: &AppToken,
        run: &ChannelRun,
        channel: &str,
        catalog: &mut Catalog<File>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let helix = self.helix();

        let user_id = helix
            .user_id(token, channel)
            .await
            .skip_log(|| format!("[{channel}]"));
        let Some(user_id) = user_id else {
            summary.channels_skipped += 1;
            return Ok(());
        };
        let listing = helix
            .emotes(token, &Scope::Broadcaster(user_id))
            .await
            .skip_log(|| format!("[{channel}] couldn't list emotes"));
        let Some(listing) = listing else {
            summary.channels_skipped += 1;
            return Ok(());
        };

        let dir = run.out_dir.join(channel);
        if crate::fs::assert_dir(&dir)
            .await
            .skip_log(|| format!("[{channel}] couldn't create `{}`", dir.display()))
            .is_none()
        {
            summary.channels_skipped += 1;
            return Ok(());
        }
        info!("[{channel}] {} emote(s) listed", listing.records.len());

        let mut batch = Batch {
            label: channel,
            policy: &ChannelPolicy,
            template: &self.endpoints.cdn_template,
            dir: &dir,
            naming: RowNaming::channel(channel),
            seen: HashSet::new(),
        };
        self.write_batch(&mut batch, &listing.records, catalog, summary)
            .await
    }

    /// Channel entry point. Only authentication and catalog failures abort.
    pub async fn run_channels(&self, run: &ChannelRun) -> Result<RunSummary> {
        let token = self.authenticate().await.context("authentication failed")?;
        let mut catalog = Self::open_catalog(&run.out_dir, &run.csv_path).await?;
        let mut summary = RunSummary::default();

        for channel in &run.channels {
            self.channel(&token, run, channel, &mut catalog, &mut summary)
                .await?;
        }

        debug!("catalog `{}` holds {} row(s)", run.csv_path.display(), catalog.rows());
        catalog.finish()?;
        info!("done, channel emotes saved into `{}`: {summary}", run.out_dir.display());
        Ok(summary)
    }

    /// Global entry point. Without a listing there is nothing to do, so a
    /// failed listing aborts too.
    pub async fn run_global(&self, run: &GlobalRun) -> Result<RunSummary> {
        let token = self.authenticate().await.context("authentication failed")?;
        let listing = self
            .helix()
            .emotes(&token, &Scope::Global)
            .await
            .context("couldn't list global emotes")?;
        let template = listing.template.unwrap_or_else(|| {
            warn!("global listing has no template, using `{}`", self.endpoints.cdn_template);
            self.endpoints.cdn_template.clone()
        });
        info!("{} global emote(s) listed", listing.records.len());

        let mut catalog = Self::open_catalog(&run.out_dir, &run.csv_path).await?;
        let mut summary = RunSummary::default();
        let mut batch = Batch {
            label: "global",
            policy: &GlobalPolicy,
            template: &template,
            dir: &run.out_dir,
            naming: RowNaming::Global,
            seen: HashSet::new(),
        };
        self.write_batch(&mut batch, &listing.records, &mut catalog, &mut summary)
            .await?;

        debug!("catalog `{}` holds {} row(s)", run.csv_path.display(), catalog.rows());
        catalog.finish()?;
        info!("done, global emotes saved into `{}`: {summary}", run.out_dir.display());
        Ok(summary)
    }
}
