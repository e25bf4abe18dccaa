//! FarmConnect CLI - sign in, manage the cart and wishlist, watch the backend.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and stay signed in across restarts
//! fc-cli login -e buyer@example.com -p hunter22 --remember
//!
//! # Restore and verify the stored session
//! fc-cli whoami
//!
//! # Cart
//! fc-cli cart add --id p1 --name "Heirloom tomatoes" --price 4.50 --qty 2
//! fc-cli cart show
//!
//! # Run health monitoring and session maintenance until Ctrl-C
//! fc-cli watch
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `whoami` - Session management
//! - `cart add|remove|update|show|clear` - Cart management
//! - `wishlist toggle|show` - Wishlist management
//! - `watch` - Background maintenance with live events
//!
//! State is kept under `FARMCONNECT_DATA_DIR` (default `.farmconnect`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use farm_connect_client::ClientConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "fc-cli")]
#[command(author, version, about = "FarmConnect command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Keep the session beyond the default lifetime
        #[arg(long)]
        remember: bool,
    },
    /// Create an account and sign in
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Marketplace role (`buyer`, `farmer`, `driver`)
        #[arg(short, long, default_value = "buyer")]
        role: String,

        /// Contact phone number
        #[arg(long)]
        phone: Option<String>,

        /// Keep the session beyond the default lifetime
        #[arg(long)]
        remember: bool,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Restore and verify the stored session
    Whoami {
        /// Also refresh the stored profile
        #[arg(long)]
        refresh: bool,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Run health monitoring and session maintenance until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum CartAction {
    /// Add a product (merges with an existing line)
    Add {
        /// Product id
        #[arg(long)]
        id: String,

        /// Product name
        #[arg(long)]
        name: String,

        /// Unit price, e.g. `4.50`
        #[arg(long)]
        price: String,

        /// Units to add
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Remove a product
    Remove {
        /// Product id
        #[arg(long)]
        id: String,
    },
    /// Set a product's quantity (0 removes it)
    Update {
        /// Product id
        #[arg(long)]
        id: String,

        /// New quantity
        #[arg(long)]
        qty: u32,
    },
    /// List the cart
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Add a product if absent, remove it if present
    Toggle {
        /// Product id
        #[arg(long)]
        id: String,

        /// Product name
        #[arg(long)]
        name: Option<String>,
    },
    /// List the wishlist
    Show,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "farm_connect_client=info,farm_connect_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        if e.requires_login() {
            tracing::warn!("Your session has ended. Sign in again with `fc-cli login`.");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), commands::CommandError> {
    let app = commands::open(config)?;

    match cli.command {
        Commands::Login {
            email,
            password,
            remember,
        } => commands::auth::login(&app, &email, &password, remember).await?,
        Commands::Register {
            name,
            email,
            password,
            role,
            phone,
            remember,
        } => {
            let form = commands::auth::RegisterForm {
                name: &name,
                email: &email,
                password: &password,
                role: &role,
                phone: phone.as_deref(),
            };
            commands::auth::register(&app, &form, remember).await?;
        }
        Commands::Logout => commands::auth::logout(&app),
        Commands::Whoami { refresh } => commands::auth::whoami(&app, refresh).await?,
        Commands::Cart { action } => match action {
            CartAction::Add {
                id,
                name,
                price,
                qty,
            } => commands::cart::add(&app, &id, &name, &price, qty)?,
            CartAction::Remove { id } => commands::cart::remove(&app, &id)?,
            CartAction::Update { id, qty } => commands::cart::update(&app, &id, qty)?,
            CartAction::Show => commands::cart::show(&app),
            CartAction::Clear => commands::cart::clear(&app)?,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Toggle { id, name } => {
                commands::cart::toggle_wishlist(&app, &id, name.as_deref())?;
            }
            WishlistAction::Show => commands::cart::show_wishlist(&app),
        },
        Commands::Watch => commands::watch::run(&app).await?,
    }
    Ok(())
}
