//! Ahmed Mart CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! am-cli migrate
//!
//! # Pre-register a vendor
//! am-cli registry add -r vendor -e shop@example.in -n "Fresh Basket"
//!
//! # Add and list service areas
//! am-cli service-area add -n "Pune Central" --lat 18.5204 --lng 73.8567 -r 8
//! am-cli service-area list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "am-cli")]
#[command(author, version, about = "Ahmed Mart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage role registries
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
    /// Manage delivery service areas
    ServiceArea {
        #[command(subcommand)]
        action: ServiceAreaAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// Register an email for a role
    Add {
        /// Role (`vendor`, `delivery_partner`, `admin`)
        #[arg(short, long)]
        role: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display or business name
        #[arg(short, long)]
        name: String,

        /// Registry status (`active`, `pending`, `suspended`, `inactive`)
        #[arg(short, long, default_value = "active")]
        status: String,
    },
}

#[derive(Subcommand)]
enum ServiceAreaAction {
    /// Create a service area
    Add {
        /// Area name
        #[arg(short, long)]
        name: String,

        /// Center latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Center longitude
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Radius in kilometres
        #[arg(short, long)]
        radius_km: f64,

        /// Create the area switched off
        #[arg(long)]
        inactive: bool,
    },
    /// List service areas
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Registry { action } => match action {
            RegistryAction::Add {
                role,
                email,
                name,
                status,
            } => commands::registry::add(&role, &email, &name, &status).await?,
        },
        Commands::ServiceArea { action } => match action {
            ServiceAreaAction::Add {
                name,
                lat,
                lng,
                radius_km,
                inactive,
            } => commands::service_area::add(&name, lat, lng, radius_km, inactive).await?,
            ServiceAreaAction::List => commands::service_area::list().await?,
        },
    }
    Ok(())
}
