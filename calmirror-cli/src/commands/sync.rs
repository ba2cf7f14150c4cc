use anyhow::Result;
use calmirror_core::MirrorConfig;
use calmirror_core::sync::{RunOutcome, RunReport};
use owo_colors::OwoColorize;

use super::open_mirror;
use crate::render::{
    BootstrapRender, Render, SyncReportRender, render_failure_warning, render_totals,
};

pub async fn run(config: &MirrorConfig, calendar: Option<String>, verbose: bool) -> Result<()> {
    let mirror = open_mirror(config)?;

    let report = match calendar {
        Some(id) => match mirror.run(&id).await? {
            RunOutcome::Synced(report) => report,
            RunOutcome::NotPrimary { primary_id } => {
                println!(
                    "{}",
                    format!("{id} is not the primary calendar ({primary_id}), nothing to do")
                        .dimmed()
                );
                return Ok(());
            }
        },
        None => mirror.run_primary().await?,
    };

    print_report(&report, verbose);

    if let Some(warning) = render_failure_warning(&report.counts()) {
        println!("{warning}");
    }

    Ok(())
}

fn print_report(report: &RunReport, verbose: bool) {
    println!("{}", report.render());

    if let Some(bootstrap) = &report.bootstrap {
        println!("{}", bootstrap.render(verbose));
        if !report.changes.is_empty() {
            println!();
        }
    }

    if report.bootstrap.is_none() || !report.changes.is_empty() {
        println!("{}", report.changes.render(verbose));
    }

    let counts = report.counts();
    if counts.has_changes() || counts.failed > 0 {
        println!("\n{}", render_totals(&counts));
    }
}
