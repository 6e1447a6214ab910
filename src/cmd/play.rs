use anyhow::{Context, Result};

use super::App;

/// Print the URL only, so the output can be piped to a player.
pub async fn cmd_play(app: &App, source: &str, id: &str, episode: usize) -> Result<()> {
    let config = app.source(source)?;
    let url = app
        .orchestrator
        .get_play_url(config, id, episode)
        .await
        .with_context(|| format!("episode {episode} of {id} on {source}"))?;
    println!("{url}");
    Ok(())
}
