//! `jrnl index rebuild | reindex | status`.

use anyhow::Result;

use crate::app::{self, Needs};
use crate::config::Config;
use crate::index_store::FileIndexStore;

pub async fn run_rebuild(config: &Config, owner: &str) -> Result<()> {
    let engine = app::open_engine(config, Needs::EMBEDDING).await?;
    match engine.rebuild_index(owner).await? {
        Some(count) => println!("Rebuilt index for {}: {} vectors", owner, count),
        None => println!("No chunks for {}; index removed.", owner),
    }
    Ok(())
}

pub async fn run_reindex(config: &Config, owner: &str) -> Result<()> {
    let engine = app::open_engine(config, Needs::EMBEDDING).await?;
    let report = engine.reindex(owner).await?;
    println!("Reindexed journal for {}", owner);
    println!("  entries: {}", report.entries);
    println!("  chunks:  {}", report.chunks);
    match report.indexed {
        Some(count) => println!("  indexed: {}", count),
        None => println!("  indexed: none (no chunks)"),
    }
    Ok(())
}

/// Staleness report. Needs no embedding provider: nothing is embedded.
pub async fn run_status(config: &Config, owner: &str) -> Result<()> {
    let engine = app::open_engine(config, Needs::NONE).await?;
    let path = FileIndexStore::new(&config.index.dir).path_for(owner);

    println!("Index for {}", owner);
    println!("  file:     {}", path.display());
    let Some(status) = engine.index_status(owner).await? else {
        println!("  status:   not built");
        return Ok(());
    };
    println!("  indexed:  {}", status.indexed);
    println!("  current:  {}", status.current);
    println!("  missing:  {}", status.missing);
    println!("  orphaned: {}", status.orphaned);
    if status.is_stale() {
        println!("  status:   stale (run `jrnl index rebuild`)");
    } else {
        println!("  status:   up to date");
    }
    Ok(())
}
