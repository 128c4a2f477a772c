use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use crate::config::{Config, SourceKind};
use crate::document::{ChromeSource, DocumentSource, HtmlDocument};
use crate::session::{ExtractionPlan, ExtractionSession, SessionOptions, SessionReport};
use crate::sinks::{FileExport, HttpDocumentStore, PersistenceSink, RemoteStoreSink};

mod config;
mod document;
mod locators;
mod session;
mod sinks;
mod sites;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".into());
    let config = Config::load(&config_path).with_context(|| format!("Failed to load {config_path}"))?;
    let base_url = config.base_url().context("base_url should have been validated")?;
    let plan = config.plan()?;
    let options = config.session_options();

    let report = match config.source {
        SourceKind::Chrome => {
            let source = ChromeSource::launch(config.headless, options.wait_timeout)
                .context("Failed to start Chrome")?;
            run(source, &config, base_url, plan, options).await?
        }
        SourceKind::Replay => {
            let source = HtmlDocument::from_files(&config.replay.pages)?;
            run(source, &config, base_url, plan, options).await?
        }
    };

    report.log_summary();
    Ok(())
}


/// Extracts on the rayon pool, since every document source blocks, then persists
async fn run<S>(source: S, config: &Config, base_url: Url, plan: ExtractionPlan, options: SessionOptions) -> anyhow::Result<SessionReport>
where
    S: DocumentSource + Send + 'static
{
    let mut session = ExtractionSession::new(source, config.source_label.clone(), base_url, plan, options);
    let (mut session, extraction) = tokio_rayon::spawn(move || {
        let extraction = session.extract();
        (session, extraction)
    }).await;

    let file_export = FileExport::new(config.output_dir.clone(), config.export_stem.clone());
    let store = match &config.remote_store {
        Some(remote) => {
            let endpoint = Url::parse(&remote.endpoint).context("remote_store.endpoint should have been validated")?;
            let token = remote.token_env.as_ref().and_then(|var| std::env::var(var).ok());
            Some(HttpDocumentStore::new(endpoint, token))
        }
        None => None
    };
    let remote = store.as_ref().map(|store| RemoteStoreSink::new(store));

    let mut sinks: Vec<&dyn PersistenceSink> = vec![];
    if config.enabled_sinks.contains(FileExport::NAME) {
        sinks.push(&file_export);
    }
    if config.enabled_sinks.contains(RemoteStoreSink::NAME) {
        match &remote {
            Some(remote) => sinks.push(remote),
            None => tracing::warn!("{} is enabled but [remote_store] is not configured, skipping it", RemoteStoreSink::NAME)
        }
    }

    let report = session.persist(extraction, &sinks).await;
    if report.sinks.iter().any(|outcome| outcome.sink == FileExport::NAME && outcome.succeeded()) {
        tracing::info!(dir = %file_export.dir().display(), "Exports written");
    }
    Ok(report)
}
