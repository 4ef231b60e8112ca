use model_prefetch::{default_catalog, Fetcher, HfHubClient, PrefetchSettings, Report};
use tracing::metadata::LevelFilter;

fn setup_logging() {
    let filter = std::env::var("PREFETCH_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LevelFilter::INFO);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
    setup_logging();

    let settings = PrefetchSettings::from_env();
    match serde_json::to_string(&settings) {
        Ok(json) => tracing::debug!("Hub settings: {json}"),
        Err(error) => tracing::warn!("Failed to render hub settings: {error:?}"),
    }

    let specs = default_catalog();
    let fetcher = Fetcher::new(HfHubClient::from_settings(settings));
    let summary = fetcher.run(&specs, &mut Report::stdout());

    if summary.failed() > 0 {
        tracing::warn!(
            "{} of {} models failed; rerun to retry them",
            summary.failed(),
            summary.outcomes.len()
        );
    }
}
