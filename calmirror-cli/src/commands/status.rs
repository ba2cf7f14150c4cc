use anyhow::Result;
use calmirror_core::MirrorConfig;
use calmirror_core::store::SyncStore;
use owo_colors::OwoColorize;

use super::open_store;

pub fn run(config: &MirrorConfig) -> Result<()> {
    let store = SyncStore::new(open_store(config)?);
    let summary = store.summary()?;

    println!("State: {}", store.inner().path().display().dimmed());

    if summary.sync_tokens.is_empty() {
        println!(
            "{}",
            "   Not synced yet. The next sync starts with a reset.".yellow()
        );
    } else {
        for (calendar_id, token) in &summary.sync_tokens {
            println!("   {} {}", calendar_id, token.dimmed());
        }
    }

    println!(
        "\nMapped events: {} ({} copies)",
        summary.mapped_events, summary.replicas
    );

    Ok(())
}
