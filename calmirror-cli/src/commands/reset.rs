use anyhow::Result;
use calmirror_core::MirrorConfig;

use super::open_mirror;
use crate::render::{BootstrapRender, render_failure_warning, render_totals};

pub async fn run(config: &MirrorConfig, verbose: bool) -> Result<()> {
    let mirror = open_mirror(config)?;
    let report = mirror.reset().await?;

    println!("{}", report.render(verbose));

    let counts = report.seeded.counts();
    if counts.has_changes() || counts.failed > 0 {
        println!("\n{}", render_totals(&counts));
    }
    if let Some(warning) = render_failure_warning(&counts) {
        println!("{warning}");
    }

    Ok(())
}
