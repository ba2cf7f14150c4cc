use anyhow::Result;
use calmirror_core::provider::{CalendarProvider, SubprocessProvider};
use calmirror_core::{CalendarSet, MirrorConfig};
use owo_colors::OwoColorize;

use crate::render::Render;

pub async fn run(config: &MirrorConfig) -> Result<()> {
    let provider = SubprocessProvider::new(&config.provider, config.provider_config.clone());
    let entries = provider.list_calendars().await?;
    let calendars = CalendarSet::resolve(entries, &config.enrollment_marker);

    if calendars.all().is_empty() {
        println!("{}", "No calendars found".dimmed());
        return Ok(());
    }

    for calendar in calendars.all() {
        println!("{}", calendar.render());
    }

    if calendars.primary().is_err() {
        println!("\n{}", "No primary calendar, nothing will be synced".red());
    } else if calendars.targets().next().is_none() {
        println!(
            "\n{}",
            format!(
                "No calendar is enrolled. Start a calendar's description with \"{}\" to enroll it.",
                config.enrollment_marker
            )
            .yellow()
        );
    }

    Ok(())
}
