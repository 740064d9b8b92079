mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::commands::{
    cmd_calories_add, cmd_calories_lookup, cmd_meal_add, cmd_meal_clear, cmd_meal_delete,
    cmd_meal_list,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "nutrisnap",
    version,
    about = "A tiny meal and calorie tracker for your local network"
)]
struct Cli {
    /// Directory holding meals.json and calories.json (default: platform data directory)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Address to bind to (default: 0.0.0.0, reachable from the local network)
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
        /// Directory of static files for the web UI
        #[arg(long, value_name = "DIR", default_value = "public")]
        public_dir: PathBuf,
    },
    /// Manage logged meals
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Manage the calorie lookup database
    Calories {
        #[command(subcommand)]
        command: CaloriesCommands,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// List logged meals in order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a meal
    Add {
        /// Meal name
        name: String,
        /// Calories (looked up in the calorie database when omitted)
        #[arg(short, long)]
        calories: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal by its position in the list
    Delete {
        /// Position shown by `meal list`
        index: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every logged meal
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CaloriesCommands {
    /// Add or overwrite a calorie entry
    Add {
        /// Food name (stored lower-case)
        key: String,
        /// Calories for this food
        calories: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up calories for a food (case-insensitive)
    Lookup {
        /// Food name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;
    let store = config.open_store()?;

    match cli.command {
        Commands::Serve {
            port,
            bind,
            public_dir,
        } => {
            tracing::info!("Data directory: {}", config.data_dir.display());
            let options = server::ServerOptions {
                port,
                bind,
                public_dir,
            };
            server::start_server(store, options).await
        }
        Commands::Meal { command } => match command {
            MealCommands::List { json } => cmd_meal_list(&store, json),
            MealCommands::Add {
                name,
                calories,
                json,
            } => cmd_meal_add(&store, &name, calories, json),
            MealCommands::Delete { index, json } => cmd_meal_delete(&store, index, json),
            MealCommands::Clear { json } => cmd_meal_clear(&store, json),
        },
        Commands::Calories { command } => match command {
            CaloriesCommands::Add {
                key,
                calories,
                json,
            } => cmd_calories_add(&store, &key, calories, json),
            CaloriesCommands::Lookup { name, json } => cmd_calories_lookup(&store, &name, json),
        },
    }
}
