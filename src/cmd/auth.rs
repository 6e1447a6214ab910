use anyhow::Result;

use super::App;

pub async fn cmd_auth(app: &App, source: &str) -> Result<()> {
    let config = app.source(source)?;

    if !config.source_type.is_netdrive() {
        println!("✅ {} ({}) needs no session", config.name, config.source_type);
        return Ok(());
    }

    println!("🔐 Checking session for {} ({})", config.name, config.source_type);

    let adapter = app.orchestrator.registry().get_adapter(config)?;
    if let Err(e) = adapter.refresh_auth().await {
        println!("   Refresh failed: {e}");
    }

    if adapter.is_authenticated().await {
        println!("\n✅ Session is valid");
    } else {
        println!("\n❌ Not authenticated");
        println!("   Set [sources.auth] cookie for '{source}' in your settings file");
    }

    Ok(())
}
