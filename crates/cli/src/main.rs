//! Sentia CLI - wishlist inspection and synchronization tools.
//!
//! # Usage
//!
//! ```bash
//! # Show the local wishlist
//! sentia-cli wishlist list
//!
//! # Toggle a product for a logged-in customer (syncs to the backend)
//! sentia-cli wishlist --customer 8012345 toggle 7891234567890
//!
//! # Merge the local copy with the server copy
//! sentia-cli wishlist --customer 8012345 sync
//!
//! # Print the listing HTML
//! sentia-cli wishlist --store ./device-a.json render
//! ```
//!
//! # Commands
//!
//! - `wishlist list|add|remove|toggle` - Local set operations
//! - `wishlist sync` - Login reconciliation (local ∪ server)
//! - `wishlist pull` - Adopt the server copy if the local one is empty
//! - `wishlist render` - Render the listing from the storefront catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentia_core::ProductId;

mod commands;

#[derive(Parser)]
#[command(name = "sentia-cli")]
#[command(author, version, about = "Sentia wishlist CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Operate on a wishlist copy
    Wishlist {
        /// JSON file acting as the device's local storage
        #[arg(short, long, default_value = "./wishlist.json")]
        store: PathBuf,

        /// Logged-in Shopify customer ID (omit for a guest)
        #[arg(short, long)]
        customer: Option<String>,

        #[command(subcommand)]
        action: WishlistAction,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Print wishlisted product IDs, one per line
    List,
    /// Add a product locally
    Add {
        /// Shopify product ID
        product_id: ProductId,
    },
    /// Remove a product (synced for customers)
    Remove {
        /// Shopify product ID
        product_id: ProductId,
    },
    /// Toggle a product (synced for customers)
    Toggle {
        /// Shopify product ID
        product_id: ProductId,
    },
    /// Merge local and server copies and push the union
    Sync,
    /// Adopt the server copy when the local copy is empty
    Pull,
    /// Print the listing container HTML
    Render,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use commands::wishlist;

    match cli.command {
        Commands::Wishlist {
            store,
            customer,
            action,
        } => {
            let config = wishlist::load_config()?;
            let store = wishlist::open_store(&store, customer.as_deref(), &config)?;

            match action {
                WishlistAction::List => {
                    for id in wishlist::list(&store).await {
                        println!("{id}");
                    }
                }
                WishlistAction::Add { product_id } => {
                    wishlist::add(&store, product_id).await;
                }
                WishlistAction::Remove { product_id } => {
                    wishlist::remove(&store, product_id).await;
                }
                WishlistAction::Toggle { product_id } => {
                    wishlist::toggle(&store, product_id).await;
                }
                WishlistAction::Sync => {
                    wishlist::sync(&store).await?;
                }
                WishlistAction::Pull => {
                    wishlist::pull(&store).await?;
                }
                WishlistAction::Render => {
                    println!("{}", wishlist::render(&store, &config).await?);
                }
            }
        }
    }
    Ok(())
}
