use anyhow::Context;
use clap::Parser;
use page_wait::scenario::{FileSink, HuluScenario};
use page_wait::utils::FailureSnapshots;
use page_wait::{harness, BrowserSession, Config, Viewport};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Log into a streaming account and save the titles on its movies tab.
#[derive(Parser, Debug)]
#[command(name = "hulu-titles", version)]
struct Cli {
    /// Account email
    #[arg(long, env = "HULU_USERNAME")]
    username: String,

    /// Account password
    #[arg(long, env = "HULU_PASSWORD", hide_env_values = true)]
    password: String,

    /// Viewing profile to switch to after login
    #[arg(long)]
    profile: String,

    /// File that receives one title per line
    #[arg(long, default_value = "titles.txt")]
    output: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Browser window size, e.g. 1280x720
    #[arg(long)]
    resolution: Option<Viewport>,

    /// Override the wait timeout, in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(viewport) = cli.resolution {
        config.browser.viewport = viewport;
    }
    if let Some(seconds) = cli.timeout {
        config.wait.timeout = Duration::from_secs(seconds);
    }

    let snapshots = FailureSnapshots::prepare(&config.artifacts)
        .context("preparing the failure screenshot directory")?;
    let session = BrowserSession::launch(config).context("launching Chrome")?;
    let mut sink = FileSink::new(&cli.output);

    let count = harness::run_scenario("movie_tab_titles", session, &snapshots, |session| {
        let scenario = HuluScenario::new(session.engine())?;
        scenario.login(&cli.username, &cli.password, &cli.profile)?;
        scenario.navigate_to_movie_tab()?;
        let count = scenario.export_titles(&mut sink)?;
        scenario.close()?;
        Ok(count)
    })?;

    info!(count, output = %cli.output.display(), "done");
    Ok(())
}
