//! Agromech console diagnostics.
//!
//! Wires the core library to a live API so scope resolution and list queries
//! can be checked from a terminal.
//!
//! ```text
//! agromech hubs
//! agromech list <resource> [--page N] [--per-page N] [--state ID] [--lga ID] [--search TEXT]
//! ```
//!
//! The acting identity comes from `--role`, `--state-id` and `--community-id`,
//! or `AGROMECH_ROLE`, `AGROMECH_STATE_ID` and `AGROMECH_COMMUNITY_ID`.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use agromech_core::cache::CacheManager;
use agromech_core::models::{Identity, ListFilters, Role};
use agromech_core::{
    Applied, ApiClient, Cascade, Config, ListRequest, LocationDirectory, QueryExecutor, RoleScope,
};

#[derive(Parser)]
#[command(name = "agromech")]
#[command(about = "Inspect role-scoped locations and resource lists against the console API")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Role name or numeric code of the acting user
    #[arg(long, global = true, env = "AGROMECH_ROLE")]
    role: Option<String>,

    /// State assigned to the acting user
    #[arg(long, global = true, env = "AGROMECH_STATE_ID")]
    state_id: Option<String>,

    /// Community hub assigned to the acting user
    #[arg(long, global = true, env = "AGROMECH_COMMUNITY_ID")]
    community_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the location tree visible to the acting user
    Hubs,

    /// Print one page of a resource list
    List(ListArgs),
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    /// Resource path, e.g. `farmers`
    resource: String,

    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Page size; defaults to the configured size
    #[arg(long)]
    per_page: Option<u32>,

    #[arg(long)]
    state: Option<String>,

    #[arg(long)]
    lga: Option<String>,

    #[arg(long)]
    search: Option<String>,
}

impl Cli {
    fn identity(&self) -> Identity {
        let role = self
            .role
            .as_deref()
            .map(Role::from_name)
            .unwrap_or(Role::UnrestrictedAdmin);
        let mut identity = Identity::new(role);
        if let Some(ref state) = self.state_id {
            identity = identity.with_state(state);
        }
        if let Some(ref community) = self.community_id {
            identity = identity.with_community(community);
        }
        identity
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first so it can feed the env-backed arguments
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    let identity = cli.identity();
    match cli.command {
        Commands::Hubs => print_hubs(&identity).await,
        Commands::List(ref args) => list_resource(args, &identity).await,
    }
}

/// Load the hub directory from the cache when fresh, otherwise from the API.
async fn load_directory(config: &Config, api: &ApiClient) -> Result<LocationDirectory> {
    let cache = config
        .cache_dir()
        .and_then(CacheManager::new)
        .map_err(|e| warn!(error = %e, "Hub cache unavailable"))
        .ok();

    if let Some(hubs) = cache
        .as_ref()
        .and_then(|c| c.fresh_hubs(config.hub_cache_minutes()))
    {
        return Ok(LocationDirectory::load(hubs));
    }

    let fetched = api.fetch_active_hubs().await;
    if let (Some(cache), Ok(hubs)) = (cache.as_ref(), fetched.as_ref()) {
        if let Err(e) = cache.save_hubs(hubs) {
            warn!(error = %e, "Failed to cache hubs");
        }
    }

    let load = LocationDirectory::from_fetch(fetched);
    if let Some(banner) = load.banner {
        eprintln!("{}", banner);
    }
    Ok(load.directory)
}

async fn print_hubs(identity: &Identity) -> Result<()> {
    let config = Config::load()?;
    let api = ApiClient::from_config(&config)?;
    let directory = Arc::new(load_directory(&config, &api).await?);

    let scope = RoleScope::resolve(identity)
        .reconcile(&directory)
        .context("Role scope does not match the hub directory")?;
    info!(role = %scope.role(), "Resolved role scope");

    // Walk the tree through the cascade so locks apply exactly as in the console
    let mut cascade = Cascade::new(Arc::clone(&directory), scope);
    let states = cascade.state_candidates().to_vec();
    for state in &states {
        cascade.on_state_change(Some(state.id.as_str()));
        println!("{} ({})", state.name, state.id);

        let lgas = cascade.lga_candidates().to_vec();
        for lga in &lgas {
            cascade.on_lga_change(Some(lga.id.as_str()));
            println!("  {} ({})", lga.name, lga.id);
            for hub in cascade.sub_hub_candidates() {
                println!("    {} [{}]", hub.name, hub.id);
            }
        }
    }
    Ok(())
}

/// Apply every list option to a fresh executor, then issue the single request
/// that reflects all of them.
fn prepare_list(
    args: &ListArgs,
    default_per_page: u32,
    scope: &RoleScope,
) -> (QueryExecutor<serde_json::Value>, Option<ListRequest>) {
    let mut executor = QueryExecutor::new(args.resource.as_str())
        .with_per_page(args.per_page.unwrap_or(default_per_page))
        .scoped(scope);

    executor.set_filters(ListFilters {
        state: args.state.clone(),
        lga: args.lga.clone(),
        search: args.search.clone(),
        ..ListFilters::default()
    });
    executor.set_page(args.page);

    let request = executor.start();
    (executor, request)
}

async fn list_resource(args: &ListArgs, identity: &Identity) -> Result<()> {
    let config = Config::load()?;
    let api = ApiClient::from_config(&config)?;
    let scope = RoleScope::resolve(identity);

    let (mut executor, request) = prepare_list(args, config.per_page(), &scope);
    if executor.run(&api, request).await == Applied::Stale {
        warn!("Discarded a superseded response");
    }

    if let Some(message) = executor.error() {
        bail!("{}", message);
    }

    let view = executor.view();
    println!("{}", serde_json::to_string_pretty(view.items.as_slice())?);
    eprintln!(
        "page {} of {} ({} total, {:?})",
        view.current_page,
        view.total_pages,
        view.total,
        executor.mode()
    );
    Ok(())
}
