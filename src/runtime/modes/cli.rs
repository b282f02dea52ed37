//! CLI mode
//!
//! One-shot commands that run without starting the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::StaticConfig;
use crate::services::geoip::{
    ActiveHandleSlot, DatabaseHandle, Language, LookupService, TranslationTables,
};

/// Look up one address against the configured database and print JSON
///
/// `raw` prints the undecoded record instead of the localized one.
pub async fn run_lookup(config: &StaticConfig, ip: &str, lang: &str, raw: bool) -> Result<()> {
    let output = lookup_json(config, ip, Language::parse(lang), raw).await?;
    println!("{}", output);
    Ok(())
}

async fn lookup_json(
    config: &StaticConfig,
    ip: &str,
    language: Language,
    raw: bool,
) -> Result<String> {
    let path = config.database.path.clone();
    let load_mode = config.database.load_mode;
    let handle = tokio::task::spawn_blocking(move || DatabaseHandle::open(&path, load_mode))
        .await
        .context("Database open task failed")?
        .with_context(|| format!("Failed to open database {}", config.database.path))?;

    let lookup = LookupService::new(
        Arc::new(ActiveHandleSlot::new(handle)),
        Arc::new(TranslationTables::builtin()),
    );

    let json = if raw {
        serde_json::to_string_pretty(&lookup.report(ip)?)?
    } else {
        serde_json::to_string_pretty(&lookup.lookup(ip, language)?)?
    };
    Ok(json)
}

/// Print a sample configuration file
pub fn run_config() {
    print!("{}", StaticConfig::generate_sample_config());
}
