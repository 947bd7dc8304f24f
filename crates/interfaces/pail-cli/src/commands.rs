use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use pail_core::tree::TreeView;
use pail_core::{Classification, DiffEntry};
use pail_pipeline::sync::{
    FileCollection, LocalTree, Outcome, RemoteStore, SyncEngine, SyncOptions,
};
use std::time::Duration;

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(msg.to_string());
    pb
}

fn open_store(store: &str) -> Result<RemoteStore> {
    let client = pail_infra::net::default_http_client().context("Failed to build HTTP client")?;
    Ok(RemoteStore::new(client, store)?)
}

/// Classification label as seen from the local side (the left side of
/// every pass).
fn label(c: Classification) -> &'static str {
    match c {
        Classification::Equal => "equal",
        Classification::LeftOnly => "pull",
        Classification::RightOnly => "push",
        Classification::Conflict => "conflict",
        Classification::LeftNewer => "push (newer)",
        Classification::RightNewer => "pull (newer)",
    }
}

fn print_plan(entries: &[DiffEntry]) {
    if entries.is_empty() {
        println!("   Collections match.");
        return;
    }
    for e in entries {
        println!("   {:<12} {}", label(e.classification), e.path);
    }
    let conflicts = entries
        .iter()
        .filter(|e| e.classification == Classification::Conflict)
        .count();
    println!(
        "\n   {} path(s) differ, {} conflict(s)",
        entries.len(),
        conflicts
    );
}

pub async fn cmd_sync(
    store: String,
    path: Utf8PathBuf,
    options: SyncOptions,
    dry_run: bool,
) -> Result<()> {
    println!(":: Synchronizing...");
    println!("   Local: {path}");
    println!("   Store: {store}");

    let local = LocalTree::new(path);
    let remote = open_store(&store)?;
    let engine = SyncEngine::new(options);

    if dry_run {
        let pb = spinner("Comparing collections...");
        let entries = engine.plan(&local, &remote).await?;
        pb.finish_and_clear();

        println!("\n:: Dry Run");
        print_plan(&entries);
        return Ok(());
    }

    let pb = spinner("Reconciling...");
    let report = engine.run(&local, &remote, None).await?;
    pb.finish_and_clear();

    println!("\n:: Sync Result");
    println!(
        "   Transferred: {} file(s), {}",
        report.stats.files_transferred,
        format_size(report.stats.bytes_transferred, DECIMAL)
    );
    println!("   Conflicts:   {}", report.stats.conflicts);
    println!("   Failures:    {}", report.stats.failures);

    for o in report.conflicts() {
        eprintln!("conflict: {} (resolve manually or rerun with --policy)", o.path);
    }
    for o in report.failures() {
        if let Outcome::Failed { reason } = &o.outcome {
            eprintln!("failed: {} ({reason})", o.path);
        }
    }

    if !report.is_clean() {
        anyhow::bail!("{} transfer(s) failed", report.stats.failures);
    }
    Ok(())
}

pub async fn cmd_diff(store: String, path: Utf8PathBuf, window: u64, full: bool) -> Result<()> {
    println!(":: Comparing...");
    println!("   Local: {path}");
    println!("   Store: {store}");

    let local = LocalTree::new(path);
    let remote = open_store(&store)?;
    let engine = SyncEngine::new(SyncOptions {
        conflict_window_secs: window,
        ..SyncOptions::default()
    });

    let pb = spinner("Comparing collections...");
    let entries = if full {
        engine.plan_full(&local, &remote).await?
    } else {
        engine.plan(&local, &remote).await?
    };
    pb.finish_and_clear();

    println!("\n:: Comparison Result");
    print_plan(&entries);
    Ok(())
}

pub async fn cmd_tree(path: Option<Utf8PathBuf>, store: Option<String>) -> Result<()> {
    let snapshot = match (path, store) {
        (Some(path), _) => {
            println!(":: Local tree: {path}");
            LocalTree::new(path).snapshot(pail_config::DEFAULT_WORKERS).await?
        }
        (None, Some(store)) => {
            println!(":: Store tree: {store}");
            open_store(&store)?
                .snapshot(pail_config::DEFAULT_WORKERS)
                .await?
        }
        (None, None) => anyhow::bail!("pass --path or --store"),
    };

    let view = TreeView::from_snapshot(&snapshot);
    if view.is_empty() {
        println!("   (empty)");
    } else {
        print!("{view}");
    }
    Ok(())
}
