use anyhow::{Context, Result};
use url::Url;

use reelgate::{SourceBook, SubscriptionIngester};

use super::App;

/// Ingest `url` against the configured sources and print the new
/// subscription with its derived sources, ready to paste into the
/// settings file.
pub async fn cmd_ingest(app: &App, url: &str, name: Option<&str>) -> Result<()> {
    let name = match name {
        Some(name) => name.to_string(),
        None => Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string()),
    };

    let ingester = SubscriptionIngester::new(app.client.clone());
    let mut book = SourceBook::new(
        app.settings.subscriptions.clone(),
        app.settings.sources.clone(),
    );

    let subscription = book.add(&ingester, &name, url).await?.clone();
    if let Some(error) = &subscription.last_error {
        eprintln!("⚠️  {error}");
    }

    let derived = SourceBook::new(
        vec![subscription.clone()],
        book.derived_sources(&subscription.id).cloned().collect(),
    );
    eprintln!(
        "✅ {} sources derived from {}",
        derived.sources.len(),
        subscription.url
    );

    let rendered = toml::to_string_pretty(&derived).context("rendering sources as TOML")?;
    println!("{rendered}");
    Ok(())
}
