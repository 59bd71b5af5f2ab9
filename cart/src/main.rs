//! Rocket Cart command-line demo
//!
//! Runs one cart operation against the inventory API configured through
//! `CART_*` environment variables and prints the resulting cart. The cart
//! persists between runs in `CART_STORAGE_DIR`.
//!
//! ```text
//! rocket-cart add 1
//! rocket-cart update 1 3
//! rocket-cart remove 1
//! rocket-cart show
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use rocket_cart::config::CartConfig;
use rocket_cart::{
    CartEnvironment, CartMetrics, CartStorage, CartStore, FileKeyValueStore, HttpInventoryClient,
    ProductId, TracingNotifier,
};
use rocket_cart_runtime::metrics::MetricsServer;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rocket-cart")]
#[command(about = "Shopping cart backed by the Rocket inventory API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add one unit of a product
    Add {
        /// Product id
        id: u64,
    },
    /// Remove a product from the cart
    Remove {
        /// Product id
        id: u64,
    },
    /// Set the quantity of a product in the cart
    Update {
        /// Product id
        id: u64,
        /// New quantity (zero or less is ignored)
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Print the cart
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CartConfig::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},rocket_cart=debug,rocket_cart_runtime=info", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut metrics = MetricsServer::new();
    if config.metrics_enabled {
        metrics.start().context("failed to install metrics recorder")?;
        CartMetrics::describe();
    }

    let inventory = Arc::new(
        HttpInventoryClient::new(&config.api_url, config.http_timeout())
            .context("failed to build HTTP client")?,
    );
    let env = CartEnvironment::new(
        inventory.clone(),
        inventory,
        CartStorage::new(
            Arc::new(FileKeyValueStore::new(&config.storage_dir)),
            config.storage_key.clone(),
        ),
        Arc::new(TracingNotifier),
    );
    let cart = CartStore::new(env, &config);

    // Failures are already reported through the notifier
    let outcome = match cli.command {
        Command::Add { id } => cart.add_product(ProductId::new(id)).await,
        Command::Remove { id } => cart.remove_product(ProductId::new(id)).await,
        Command::Update { id, amount } => {
            cart.update_product_amount(ProductId::new(id), amount).await
        },
        Command::Show => Ok(()),
    };

    print_cart(&cart).await;

    cart.shutdown(config.shutdown_timeout())
        .await
        .context("shutdown did not complete")?;

    if let Some(exposition) = metrics.render() {
        println!("\n{exposition}");
    }

    if let Err(error) = outcome {
        anyhow::bail!(error.user_message());
    }
    Ok(())
}

async fn print_cart(cart: &CartStore) {
    let state = cart.state().await;
    if state.is_empty() {
        println!("Cart is empty");
        return;
    }

    println!(
        "{} products, {} items",
        state.unique_item_count(),
        state.item_count()
    );
    for item in &state.items {
        println!(
            "  #{:<6} x{:<3} {}",
            item.id,
            item.amount,
            item.title().unwrap_or("(untitled)")
        );
    }
}
