//! Naked Pineapple commerce CLI - drive the cart and wishlist synchronizer.
//!
//! # Usage
//!
//! ```bash
//! # Add two large jackets at $150
//! np-commerce cart add 42 --name Jacket --quantity 2 --option size=L --price 150
//!
//! # Show the cart and its subtotal
//! np-commerce cart show
//!
//! # Toggle a product on the wishlist
//! np-commerce wishlist toggle 42
//!
//! # List catalog categories
//! np-commerce categories
//! ```
//!
//! State persists in `COMMERCE_DATA_DIR`. Set `COMMERCE_USER_ID` and
//! `COMMERCE_ACCESS_TOKEN` to act as a signed-in shopper; otherwise the CLI
//! is an anonymous shopper and never writes to the remote store.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use np_commerce_core::{LineId, ProductId};
use np_commerce_sync::SyncConfig;
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "np-commerce")]
#[command(author, version, about = "Naked Pineapple cart and wishlist tools")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and modify the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Inspect and modify the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// List catalog categories
    Categories {
        /// Drop cached category reads first
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print every line and the subtotal
    Show,
    /// Add a product variant
    Add {
        /// Product ID
        product_id: ProductId,

        /// Display name captured with the line
        #[arg(short, long, default_value = "")]
        name: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Selected option as `name=value` (repeatable)
        #[arg(short, long = "option", value_parser = commands::parse_option)]
        options: Vec<(String, String)>,

        /// Extra cost of an option as `name=amount` (repeatable)
        #[arg(long = "option-price", value_parser = commands::parse_option_price)]
        option_prices: Vec<(String, Decimal)>,

        /// Unit price; looked up when omitted
        #[arg(long)]
        price: Option<Decimal>,

        /// Image URL; looked up when omitted
        #[arg(long)]
        image: Option<String>,

        /// Gift note attached to the line
        #[arg(long)]
        note: Option<String>,
    },
    /// Set a line's quantity
    Qty { line_id: LineId, quantity: u32 },
    /// Change a line's options
    Options {
        line_id: LineId,

        /// Selected option as `name=value` (repeatable)
        #[arg(short, long = "option", value_parser = commands::parse_option)]
        options: Vec<(String, String)>,
    },
    /// Remove a line
    Remove { line_id: LineId },
    /// Remove every line
    Clear,
    /// Push the local cart to the remote after signing in
    Merge,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Print every wishlisted product
    Show,
    /// Add a product
    Add { product_id: ProductId },
    /// Remove a product
    Remove { product_id: ProductId },
    /// Add if absent, remove if present
    Toggle { product_id: ProductId },
    /// Exit 0 if the product is wishlisted, 1 otherwise
    Has { product_id: ProductId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = dsn?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

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

fn init_tracing(json: bool) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "np_commerce_sync=info,np_commerce_cli=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    // Logs go to stderr so command output on stdout stays clean.
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = SyncConfig::from_env();
    let _sentry_guard = init_sentry(
        config
            .as_ref()
            .ok()
            .and_then(|c| c.sentry_dsn.as_deref()),
    );
    init_tracing(cli.log_json);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &SyncConfig) -> Result<ExitCode, commands::CliError> {
    let sync = commands::synchronizer(config)?;

    match command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&sync).await,
            CartAction::Add {
                product_id,
                name,
                quantity,
                options,
                option_prices,
                price,
                image,
                note,
            } => {
                let request = commands::cart::AddArgs {
                    product_id,
                    name,
                    quantity,
                    options,
                    option_prices,
                    price,
                    image,
                    note,
                };
                commands::cart::add(&sync, request).await?;
            }
            CartAction::Qty { line_id, quantity } => {
                commands::cart::set_quantity(&sync, &line_id, quantity).await?;
            }
            CartAction::Options { line_id, options } => {
                commands::cart::change_options(&sync, &line_id, options).await;
            }
            CartAction::Remove { line_id } => commands::cart::remove(&sync, &line_id).await,
            CartAction::Clear => commands::cart::clear(&sync, &config.identity).await,
            CartAction::Merge => commands::cart::merge(&sync).await?,
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => commands::wishlist::show(&sync).await,
            WishlistAction::Add { product_id } => commands::wishlist::add(&sync, product_id).await,
            WishlistAction::Remove { product_id } => {
                commands::wishlist::remove(&sync, product_id).await;
            }
            WishlistAction::Toggle { product_id } => {
                commands::wishlist::toggle(&sync, product_id).await;
            }
            WishlistAction::Has { product_id } => {
                return Ok(commands::wishlist::has(&sync, product_id));
            }
        },
        Commands::Categories { refresh } => commands::catalog::categories(&sync, refresh).await?,
    }
    Ok(ExitCode::SUCCESS)
}
