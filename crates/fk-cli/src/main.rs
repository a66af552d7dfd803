//! fokus CLI
//!
//! Inspect and change the block list, the enable flag and the exemption
//! window, and simulate page visits against the same persisted state.

mod settings;
mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use fk_core::exemption::{duration_from_secs, format_timestamp};
use fk_core::{
    BlockListPolicy, Clock, CountdownView, DailyCounters, DecisionEngine, ExemptionWindow, FokusConfig, Host,
    JsonFileStore, MenuAction, OverlayController, SystemClock, Ticker,
};
use terminal::TerminalRenderer;

#[derive(Parser)]
#[command(name = "fokus")]
#[command(about = "Block distracting sites, with short timed exemptions")]
struct Cli {
    /// State file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the enable flag, list size and exemption state
    Status {
        /// Also print the decision for this URL or host
        url: Option<String>,
    },

    /// Evaluate a page visit and render the result
    Visit {
        /// URL or host of the page
        url: String,

        /// Keep counting down while exempt, until the window closes
        #[arg(short, long)]
        follow: bool,
    },

    /// Flip the global enable flag
    Toggle,

    /// Add a host to the block list
    Block {
        /// URL or host
        host: String,
    },

    /// Remove a host from the block list
    Unblock {
        /// URL or host
        host: String,
    },

    /// Print the block list
    List,

    /// Open the global exemption window
    Exempt {
        /// Page the exemption is granted from; counted in today's stats
        url: Option<String>,

        /// Override the configured length
        #[arg(short, long)]
        seconds: Option<i64>,
    },

    /// Close the exemption window early
    Dismiss,

    /// Print today's block and exemption tallies
    Stats,

    /// Show the context menu for a page, or run one of its entries
    Menu {
        /// URL or host of the page
        url: String,

        /// Entry to run
        #[arg(short, long, value_enum)]
        run: Option<MenuChoice>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MenuChoice {
    Grant,
    Toggle,
    Block,
    Unblock,
}

impl From<MenuChoice> for MenuAction {
    fn from(choice: MenuChoice) -> Self {
        match choice {
            MenuChoice::Grant => MenuAction::GrantExemption,
            MenuChoice::Toggle => MenuAction::ToggleBlocking,
            MenuChoice::Block => MenuAction::BlockHost,
            MenuChoice::Unblock => MenuAction::UnblockHost,
        }
    }
}

struct Context {
    store: JsonFileStore,
    config: FokusConfig,
}

impl Context {
    fn controller(self, url: &str) -> OverlayController<JsonFileStore, SystemClock, TerminalRenderer, Ticker> {
        OverlayController::new(
            self.store,
            SystemClock,
            TerminalRenderer,
            Ticker::new(),
            self.config,
            Host::parse(url),
        )
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match load_context(&cli) {
        Ok(ctx) => run(cli.command, ctx).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_context(cli: &Cli) -> Result<Context, String> {
    let config = settings::load_config(cli.config.as_deref())?;
    let path = cli.store.clone().unwrap_or_else(settings::default_store_path);
    tracing::debug!(store = %path.display(), ?config, "loaded settings");
    Ok(Context {
        store: JsonFileStore::new(path),
        config,
    })
}

async fn run(command: Commands, ctx: Context) -> Result<(), String> {
    match command {
        Commands::Status { url } => cmd_status(&ctx, url.as_deref()).await,
        Commands::Visit { url, follow } => cmd_visit(ctx, &url, follow).await,
        Commands::Toggle => cmd_toggle(&ctx).await,
        Commands::Block { host } => cmd_block(&ctx, &host).await,
        Commands::Unblock { host } => cmd_unblock(&ctx, &host).await,
        Commands::List => cmd_list(&ctx).await,
        Commands::Exempt { url, seconds } => cmd_exempt(ctx, url.as_deref(), seconds).await,
        Commands::Dismiss => cmd_dismiss(&ctx).await,
        Commands::Stats => cmd_stats(&ctx).await,
        Commands::Menu { url, run } => cmd_menu(ctx, &url, run).await,
    }
}

async fn cmd_status(ctx: &Context, url: Option<&str>) -> Result<(), String> {
    let now = SystemClock.now();
    let policy = BlockListPolicy::new(&ctx.store);
    let window = ExemptionWindow::new(&ctx.store);

    let enabled = policy.is_enabled().await;
    println!("Blocking:      {}", if enabled { "enabled" } else { "disabled" });
    println!("Blocked hosts: {}", policy.hosts().await.len());

    let until = window.exempt_until().await;
    if until > now {
        let remaining = window.remaining_seconds(now).await;
        let view = CountdownView::new(remaining, ctx.config.urgent_threshold_secs);
        println!("Exemption:     {} left (until {})", view.label, format_timestamp(until));
    } else {
        println!("Exemption:     none");
    }

    if let Some(url) = url {
        let host = Host::parse(url);
        let decision = DecisionEngine::new(&ctx.store).decide(&host, now).await;
        println!("{}: {}", display_host(&host), decision);
    }

    Ok(())
}

async fn cmd_visit(ctx: Context, url: &str, follow: bool) -> Result<(), String> {
    let mut controller = ctx.controller(url);
    let decision = controller.invalidate().await;
    println!("{}: {}", display_host(controller.host()), decision);

    if follow && controller.is_ticking() {
        let decision = controller.run_countdown().await;
        println!("{}: {}", display_host(controller.host()), decision);
    }

    Ok(())
}

async fn cmd_toggle(ctx: &Context) -> Result<(), String> {
    let enabled = BlockListPolicy::new(&ctx.store)
        .toggle()
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", fk_core::types::toggle_message(enabled));
    Ok(())
}

async fn cmd_block(ctx: &Context, host: &str) -> Result<(), String> {
    let host = Host::parse(host);
    let outcome = BlockListPolicy::new(&ctx.store)
        .add(&host)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", outcome.message(&host));
    Ok(())
}

async fn cmd_unblock(ctx: &Context, host: &str) -> Result<(), String> {
    let host = Host::parse(host);
    let outcome = BlockListPolicy::new(&ctx.store)
        .remove(&host)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", outcome.message(&host));
    Ok(())
}

async fn cmd_list(ctx: &Context) -> Result<(), String> {
    let hosts = BlockListPolicy::new(&ctx.store).hosts().await;
    if hosts.is_empty() {
        println!("No blocked hosts.");
    }
    for host in hosts {
        println!("{host}");
    }
    Ok(())
}

async fn cmd_exempt(ctx: Context, url: Option<&str>, seconds: Option<i64>) -> Result<(), String> {
    let duration = match seconds {
        Some(secs) => duration_from_secs(secs).map_err(|e| e.to_string())?,
        None => ctx.config.exemption_duration(),
    };

    let until = match url {
        Some(url) => {
            let mut controller = ctx.controller(url);
            controller.grant_exemption(duration).await.map_err(|e| e.to_string())?
        }
        None => ExemptionWindow::new(&ctx.store)
            .grant(SystemClock.now(), duration)
            .await
            .map_err(|e| e.to_string())?,
    };

    println!("Blocking paused until {}", format_timestamp(until));
    Ok(())
}

async fn cmd_dismiss(ctx: &Context) -> Result<(), String> {
    ExemptionWindow::new(&ctx.store)
        .clear()
        .await
        .map_err(|e| e.to_string())?;
    println!("Exemption closed.");
    Ok(())
}

async fn cmd_stats(ctx: &Context) -> Result<(), String> {
    let tally = DailyCounters::new(&ctx.store).snapshot(SystemClock.now()).await;

    println!("Date: {}", tally.date);
    for (host, count) in tally.ranked_hosts() {
        println!("  {host:<30} {count}");
    }
    println!("Total blocks:       {}", tally.total_blocks());
    println!("Exemptions granted: {}", tally.total_exemptions());
    Ok(())
}

async fn cmd_menu(ctx: Context, url: &str, run: Option<MenuChoice>) -> Result<(), String> {
    let mut controller = ctx.controller(url);

    let Some(choice) = run else {
        for (i, command) in controller.menu_commands().await.iter().enumerate() {
            println!("{}. {}", i + 1, command.label);
        }
        return Ok(());
    };

    let notice = controller
        .run_menu_action(choice.into())
        .await
        .map_err(|e| e.to_string())?;
    if let Some(notice) = notice {
        println!("{notice}");
    }
    Ok(())
}

fn display_host(host: &Host) -> &str {
    if host.is_empty() {
        "(no host)"
    } else {
        host.as_str()
    }
}
