use anyhow::Result;

use super::output::print_results;
use super::App;
use crate::OutputFormat;

pub async fn cmd_search(app: &App, query: &str, only: &[String], format: OutputFormat) -> Result<()> {
    let sources: Vec<_> = app
        .settings
        .active_sources()
        .into_iter()
        .filter(|s| only.is_empty() || only.contains(&s.key))
        .collect();

    if sources.is_empty() {
        eprintln!("⚠️  No enabled sources configured. Add [[sources]] to your settings file,");
        eprintln!("   or generate them with: reelgate ingest <subscription-url>");
        return Ok(());
    }

    let outcome = app.orchestrator.search(&sources, query).await;
    print_results(&outcome.results, format)
}
