//! crm-console: command-line front end for the consultancy CRM.
//!
//! Loads the session's permissions, then lists, inspects and deletes records,
//! follows notifications live and prints the dashboard overview.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use crm_client::{ApiClient, NotificationApi, PushSource, SsePushSource};
use crm_console::{
    load_overview, visible_entries, GateDecision, LoadState, LogToasts, Mutation, MutationRunner,
    NotificationSync, PermissionGate, QueryCache, SessionContext, SyncOptions,
};
use crm_core::config::{AppConfig, LoggingConfig};
use crm_core::types::{ListQuery, SortOrder};
use crm_core::{Action, Module, Resource};
use crm_entities as entities;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "crm-console")]
#[command(about = "Consultancy CRM console: records, notifications and dashboard")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CRM_CONSOLE_CONFIG")]
    config: Option<String>,

    /// API base URL (overrides config)
    #[arg(long, env = "CRM_CONSOLE__API__BASE_URL")]
    base_url: Option<String>,

    /// Bearer token (overrides config)
    #[arg(long, env = "CRM_CONSOLE__API__TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Human-readable logs instead of JSON
    #[arg(long, default_value_t = false)]
    plain_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the signed-in user and their permissions
    Whoami,

    /// Show the navigation menu visible to the signed-in user
    Nav,

    /// List one page of a resource
    List {
        resource: ResourceArg,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Page size (default from config)
        #[arg(long)]
        limit: Option<u32>,

        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        sort_by: Option<String>,

        /// Sort ascending instead of descending
        #[arg(long, default_value_t = false)]
        asc: bool,
    },

    /// Show one record
    Get { resource: ResourceArg, id: String },

    /// Delete one record
    Delete { resource: ResourceArg, id: String },

    /// Notification menu
    Notifications {
        #[command(subcommand)]
        action: NotificationAction,
    },

    /// Print the overview cards
    Dashboard,
}

#[derive(Subcommand, Debug)]
enum NotificationAction {
    /// Follow the notification menu until interrupted
    Watch {
        /// Fetch the recent list as if the menu were open
        #[arg(long, default_value_t = false)]
        open: bool,

        /// Unread-count poll interval in seconds (overrides config)
        #[arg(long)]
        poll_secs: Option<u64>,

        /// Do not subscribe to the push stream
        #[arg(long, default_value_t = false)]
        no_push: bool,
    },

    /// Mark every notification as read
    MarkAllRead,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ResourceArg {
    Leads,
    Students,
    Countries,
    Universities,
    Courses,
    VisaTypes,
    Workflows,
    Steps,
    Scholarships,
    Services,
    Faqs,
    LandingPages,
    Appointments,
    Tasks,
    Templates,
}

struct Binding {
    path: &'static str,
    label: &'static str,
    module: Module,
}

fn bind<R: Resource>() -> Binding {
    Binding {
        path: R::PATH,
        label: R::LABEL,
        module: R::MODULE,
    }
}

impl ResourceArg {
    fn binding(self) -> Binding {
        match self {
            ResourceArg::Leads => bind::<entities::Leads>(),
            ResourceArg::Students => bind::<entities::Students>(),
            ResourceArg::Countries => bind::<entities::Countries>(),
            ResourceArg::Universities => bind::<entities::Universities>(),
            ResourceArg::Courses => bind::<entities::Courses>(),
            ResourceArg::VisaTypes => bind::<entities::VisaTypes>(),
            ResourceArg::Workflows => bind::<entities::Workflows>(),
            ResourceArg::Steps => bind::<entities::Steps>(),
            ResourceArg::Scholarships => bind::<entities::Scholarships>(),
            ResourceArg::Services => bind::<entities::Services>(),
            ResourceArg::Faqs => bind::<entities::Faqs>(),
            ResourceArg::LandingPages => bind::<entities::LandingPages>(),
            ResourceArg::Appointments => bind::<entities::Appointments>(),
            ResourceArg::Tasks => bind::<entities::Tasks>(),
            ResourceArg::Templates => bind::<entities::Templates>(),
        }
    }
}

fn init_tracing(logging: &LoggingConfig, plain: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json && !plain {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load the session and refuse unless `(module, action)` is granted.
async fn authorize(client: &ApiClient, session: &SessionContext, module: Module, action: Action) -> anyhow::Result<()> {
    let state = session.load(client).await;
    match PermissionGate::new(module, action).decide(&state) {
        GateDecision::Allow => Ok(()),
        _ => bail!("permission {module}:{action} is not granted to this session"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, config_error) = match AppConfig::load_from(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_tracing(&config.logging, cli.plain_logs);
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    if let Some(token) = cli.token {
        config.api.token = Some(token);
    }
    info!(
        base_url = %config.api.base_url,
        authenticated = config.api.token.is_some(),
        "Configuration loaded"
    );

    let client = ApiClient::new(&config.api).context("building API client")?;
    let session = SessionContext::new();

    match cli.command {
        Commands::Whoami => cmd_whoami(&client, &session).await,
        Commands::Nav => cmd_nav(&client, &session).await,
        Commands::List {
            resource,
            page,
            limit,
            search,
            sort_by,
            asc,
        } => {
            let mut query = ListQuery::new()
                .page(page)
                .limit(limit.unwrap_or(config.api.default_page_limit));
            if let Some(field) = sort_by {
                let order = if asc { SortOrder::Asc } else { SortOrder::Desc };
                query = query.sort(field, order);
            }
            if let Some(term) = search {
                query = query.search(term);
            }
            cmd_list(&client, &session, resource, query).await
        }
        Commands::Get { resource, id } => cmd_get(&client, &session, resource, &id).await,
        Commands::Delete { resource, id } => cmd_delete(&client, &session, &config, resource, &id).await,
        Commands::Notifications { action } => match action {
            NotificationAction::Watch {
                open,
                poll_secs,
                no_push,
            } => {
                if let Some(secs) = poll_secs {
                    config.notifications.poll_interval_secs = secs;
                }
                if no_push {
                    config.notifications.push_enabled = false;
                }
                cmd_watch(client, &config, open).await
            }
            NotificationAction::MarkAllRead => {
                client.mark_all_read().await?;
                println!("All notifications marked as read");
                Ok(())
            }
        },
        Commands::Dashboard => cmd_dashboard(&client, &session).await,
    }
}

async fn cmd_whoami(client: &ApiClient, session: &SessionContext) -> anyhow::Result<()> {
    session.load(client).await;
    let Some(user) = session.current_user() else {
        bail!("could not load the current user");
    };
    let mut permissions = user.permissions.clone();
    permissions.sort();
    println!("{} <{}>", user.name, user.email);
    println!("role: {} ({})", user.role, user.role_id);
    println!("tenant: {}", user.tenant_id);
    println!("permissions:");
    for p in permissions {
        println!("  {p}");
    }
    Ok(())
}

async fn cmd_nav(client: &ApiClient, session: &SessionContext) -> anyhow::Result<()> {
    let state = session.load(client).await;
    for entry in visible_entries(&state) {
        println!("{:<16} {}", entry.label, entry.href);
    }
    Ok(())
}

async fn cmd_list(client: &ApiClient, session: &SessionContext, resource: ResourceArg, query: ListQuery) -> anyhow::Result<()> {
    let binding = resource.binding();
    authorize(client, session, binding.module, Action::Read).await?;
    let page = client
        .list_value(binding.path, &query)
        .await
        .with_context(|| format!("listing {}", binding.path))?;
    print_json(&page)
}

async fn cmd_get(client: &ApiClient, session: &SessionContext, resource: ResourceArg, id: &str) -> anyhow::Result<()> {
    let binding = resource.binding();
    authorize(client, session, binding.module, Action::Read).await?;
    let record = client
        .get_value(binding.path, id)
        .await
        .with_context(|| format!("fetching {} {id}", binding.label))?;
    print_json(&record)
}

async fn cmd_delete(
    client: &ApiClient,
    session: &SessionContext,
    config: &AppConfig,
    resource: ResourceArg,
    id: &str,
) -> anyhow::Result<()> {
    let binding = resource.binding();
    authorize(client, session, binding.module, Action::Delete).await?;
    let cache = if config.cache.enabled {
        QueryCache::new()
    } else {
        QueryCache::disabled()
    };
    let runner = MutationRunner::new(Arc::new(cache), Arc::new(LogToasts));
    runner
        .execute(
            Mutation::new(binding.path, format!("{} deleted", binding.label)),
            client.delete_path(binding.path, id),
        )
        .await?;
    println!("{} {id} deleted", binding.label);
    Ok(())
}

async fn cmd_watch(client: ApiClient, config: &AppConfig, open: bool) -> anyhow::Result<()> {
    let push: Option<Arc<dyn PushSource>> = Some(Arc::new(SsePushSource::new(
        client.clone(),
        config.notifications.stream_path.clone(),
    )));
    let sync = NotificationSync::start(
        Arc::new(client),
        push,
        SyncOptions::from(&config.notifications),
    );
    if open {
        sync.open_menu().await;
    }

    let mut snapshots = sync.subscribe();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                println!("{}", serde_json::to_string(&snapshot)?);
            }
            _ = &mut interrupted => {
                info!("Interrupted, stopping notification sync");
                break;
            }
        }
    }
    sync.shutdown().await;
    Ok(())
}

async fn cmd_dashboard(client: &ApiClient, session: &SessionContext) -> anyhow::Result<()> {
    let state = session.load(client).await;
    match load_overview(client, &state).await {
        LoadState::Loaded(overview) => {
            for card in &overview.cards {
                println!("{:<24} {}", card.label, card.value);
            }
            if let Some(rate) = overview.conversion_rate {
                println!("{:<24} {rate:.1}%", "Lead conversion");
            }
            Ok(())
        }
        LoadState::Failed(message) => bail!("dashboard unavailable: {message}"),
        LoadState::Idle | LoadState::Loading => Ok(()),
    }
}
