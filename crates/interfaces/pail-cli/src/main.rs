use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use pail_cli::{commands, profiles, CliConflictPolicy};
use pail_pipeline::sync::SyncOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage profiles (saved store/path pairs)
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Run one reconciliation pass between a local root and a store
    Sync {
        #[arg(long, required_unless_present = "profile")]
        store: Option<String>,
        #[arg(long, required_unless_present = "profile")]
        path: Option<Utf8PathBuf>,
        #[arg(short, long, help = "Use settings from a named profile")]
        profile: Option<String>,
        #[arg(long, default_value_t = pail_config::DEFAULT_CONFLICT_WINDOW_SECS)]
        window: u64,
        #[arg(long, default_value_t = pail_config::DEFAULT_WORKERS)]
        workers: usize,
        #[arg(long, value_enum, default_value_t = CliConflictPolicy::Skip)]
        policy: CliConflictPolicy,
        #[arg(long, help = "Classify only; transfer nothing")]
        dry_run: bool,
    },
    /// Show per-path classifications without transferring
    #[command(alias = "check")]
    Diff {
        #[arg(long, required_unless_present = "profile")]
        store: Option<String>,
        #[arg(long, required_unless_present = "profile")]
        path: Option<Utf8PathBuf>,
        #[arg(short, long, help = "Use settings from a named profile")]
        profile: Option<String>,
        #[arg(long, default_value_t = pail_config::DEFAULT_CONFLICT_WINDOW_SECS)]
        window: u64,
        #[arg(long, help = "Include paths whose content already matches")]
        full: bool,
    },
    /// Render a collection's paths as a nested tree
    Tree {
        #[arg(long, conflicts_with = "store")]
        path: Option<Utf8PathBuf>,
        #[arg(long)]
        store: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    List,
    Add {
        #[arg(long, help = "Unique slug ID for the profile")]
        id: String,
        name: String,
        store: String,
        path: Utf8PathBuf,
    },
    Remove {
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("default subscriber");

    let resolve_profile = |name: &str| -> anyhow::Result<(String, Utf8PathBuf)> {
        let mgr = profiles::ProfileManager::new();
        let p = mgr.find(name)?;
        Ok((p.store_url, Utf8PathBuf::from(p.local_path)))
    };

    match cli.command {
        Commands::Profile { command } => match command {
            ProfileCommands::List => profiles::handle_list()?,
            ProfileCommands::Add {
                id,
                name,
                store,
                path,
            } => profiles::handle_add(id, name, store, path)?,
            ProfileCommands::Remove { name } => profiles::handle_remove(name)?,
        },
        Commands::Sync {
            store,
            path,
            profile,
            window,
            workers,
            policy,
            dry_run,
        } => {
            let (final_store, final_path) = if let Some(p_name) = profile {
                resolve_profile(&p_name)?
            } else {
                (store.unwrap(), path.unwrap())
            };
            let options = SyncOptions {
                conflict_window_secs: window,
                workers: pail_config::clamp_workers(workers),
                policy: policy.into(),
            };
            commands::cmd_sync(final_store, final_path, options, dry_run).await?;
        }
        Commands::Diff {
            store,
            path,
            profile,
            window,
            full,
        } => {
            let (final_store, final_path) = if let Some(p_name) = profile {
                resolve_profile(&p_name)?
            } else {
                (store.unwrap(), path.unwrap())
            };
            commands::cmd_diff(final_store, final_path, window, full).await?;
        }
        Commands::Tree { path, store } => {
            commands::cmd_tree(path, store).await?;
        }
    }

    Ok(())
}
