//! Storepanel CLI - drive the product and profile editors from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Store the bearer token issued by the backend
//! sp-cli token set eyJhbGciOi...
//!
//! # Show and edit a product
//! sp-cli product show 42
//! sp-cli product edit 42 --price 1500 --image ./shoe.png
//!
//! # Show and update your own profile
//! sp-cli profile show
//! sp-cli profile update --phone 0771234567 --dob 1990-05-17 --avatar ./me.jpg
//! ```
//!
//! # Commands
//!
//! - `token` - Manage the stored bearer token
//! - `product` - Show or edit a product (admin)
//! - `profile` - Show or update the signed-in user's profile
//!
//! Configuration comes from `PANEL_*` environment variables (see
//! `storepanel_client::config`). Set `PANEL_LOG_JSON=1` for JSON logs.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use storepanel_core::ProductId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "sp-cli")]
#[command(author, version, about = "Storepanel product and profile editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the stored bearer token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Show or edit a product
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Show or update your profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a bearer token
    Set {
        /// Token issued by the backend
        value: String,
    },
    /// Remove the stored token
    Clear,
    /// Show whether a token is stored (masked)
    Show,
}

#[derive(Subcommand)]
enum ProductAction {
    /// Print the product as loaded into the form
    Show {
        /// Product ID
        id: ProductId,
    },
    /// Change fields and submit the update
    Edit {
        /// Product ID
        id: ProductId,

        /// New product name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New price (LKR)
        #[arg(long)]
        price: Option<String>,

        /// New stock quantity
        #[arg(long)]
        quantity: Option<String>,

        /// Image file to upload
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the profile as loaded into the form
    Show,
    /// Change fields and submit the update
    Update {
        /// New phone number
        #[arg(long)]
        phone: Option<String>,

        /// New date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: Option<String>,

        /// Avatar image to upload
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storepanel_client=info,sp_cli=info".into());

    let json = std::env::var("PANEL_LOG_JSON").is_ok();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Token { action } => match action {
            TokenAction::Set { value } => commands::token::set(&value)?,
            TokenAction::Clear => commands::token::clear()?,
            TokenAction::Show => commands::token::show()?,
        },
        Commands::Product { action } => match action {
            ProductAction::Show { id } => commands::product::show(id).await?,
            ProductAction::Edit {
                id,
                name,
                description,
                price,
                quantity,
                image,
            } => {
                let changes = commands::product::ProductChanges {
                    name,
                    description,
                    price,
                    quantity,
                    image,
                };
                commands::product::edit(id, changes).await?;
            }
        },
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::profile::show().await?,
            ProfileAction::Update { phone, dob, avatar } => {
                let changes = commands::profile::ProfileChanges { phone, dob, avatar };
                commands::profile::update(changes).await?;
            }
        },
    }
    Ok(())
}
