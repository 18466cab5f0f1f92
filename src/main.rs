mod catalog;
mod config;
mod context;
mod download;
mod emote;
mod fs;
mod helix;
mod logging;
mod opt;
mod rendition;
mod skip_ext;
mod template;
#[cfg(test)]
mod testing;
mod transcode;

use anyhow::Result;
use log::error;
use structopt::StructOpt;

use config::{Credentials, Endpoints};
use context::Context;
use download::HttpTransport;
use opt::{Opt, Run};

async fn run(opt: Opt) -> Result<()> {
    let credentials = Credentials::from_env()?;
    let run = opt.cmd.into_run().await?;
    let transport = HttpTransport::new()?;
    let ctx = Context::new(&transport, Endpoints::default(), credentials);

    match run {
        Run::Channels(run) => ctx.run_channels(&run).await?,
        Run::Global(run) => ctx.run_global(&run).await?,
    };
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opt = Opt::from_args();

    if let Err(err) = logging::init(opt.verbose) {
        eprintln!("couldn't initialize logging: {err}");
    }

    if let Err(err) = run(opt).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}
