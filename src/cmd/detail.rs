use anyhow::{Context, Result};

use super::output::print_detail;
use super::App;
use crate::OutputFormat;

pub async fn cmd_detail(app: &App, source: &str, id: &str, format: OutputFormat) -> Result<()> {
    let config = app.source(source)?;
    let detail = app
        .orchestrator
        .get_detail(config, id)
        .await
        .with_context(|| format!("detail of {id} on {source}"))?;
    print_detail(&detail, format)
}
