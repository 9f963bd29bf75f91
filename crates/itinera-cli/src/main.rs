mod config;
mod plan_cmds;
mod resolve;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use itinera_db::models::TripIntensity;
use itinera_db::pool;

use config::ItineraConfig;
use plan_cmds::EditOp;

#[derive(Parser)]
#[command(name = "itinera", about = "Generate, reorder, and save multi-day trip itineraries")]
struct Cli {
    /// Database URL (overrides ITINERA_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// User id to act as (overrides ITINERA_USER_ID env var)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an itinera config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/itinera")]
        db_url: String,
        /// User id to store (a new one is generated if omitted)
        #[arg(long)]
        user_id: Option<Uuid>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the itinera database (requires config file or env vars)
    DbInit,
    /// Plan and draft management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate a new draft itinerary
    Generate {
        /// City to visit
        city: String,
        /// Catalogue id of the city (a fresh id is used if omitted)
        #[arg(long)]
        city_id: Option<Uuid>,
        /// Trip length in days (1-5)
        #[arg(long, default_value_t = 1)]
        days: i32,
        /// full_day or half_day
        #[arg(long, default_value = "full_day")]
        intensity: TripIntensity,
        /// Free-form preferences (max 500 characters)
        #[arg(long)]
        notes: Option<String>,
        /// Generation deadline in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
        /// Replace an existing draft
        #[arg(long)]
        force: bool,
    },
    /// Show the current draft, optionally editing it first
    Draft {
        /// Edit to apply: up:<id>, down:<id>, or delete:<id> (repeatable)
        #[arg(long = "op")]
        ops: Vec<EditOp>,
    },
    /// Throw the current draft away
    Discard,
    /// Save the current draft as a plan
    Save,
    /// List your plans
    List,
    /// Show a plan and its activities
    Show {
        /// Plan id or unique prefix
        plan_id: String,
    },
    /// Reorder or remove activities in a saved plan
    Edit {
        /// Plan id or unique prefix
        plan_id: String,
        /// Edit to apply: up:<id>, down:<id>, or delete:<id> (repeatable)
        #[arg(long = "op", required = true)]
        ops: Vec<EditOp>,
    },
    /// Archive a plan
    Archive {
        /// Plan id or unique prefix
        plan_id: String,
    },
    /// Rate a plan (once per plan)
    Feedback {
        /// Plan id or unique prefix
        plan_id: String,
        /// Whether the plan was helpful
        #[arg(long, action = clap::ArgAction::Set, required = true)]
        helpful: bool,
        /// Optional comment (max 1000 characters)
        #[arg(long)]
        comment: Option<String>,
    },
}

/// Execute the `itinera init` command: write config file.
fn cmd_init(db_url: &str, user_id: Option<Uuid>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let user_id = user_id.unwrap_or_else(Uuid::new_v4);
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        user: config::UserSection { id: user_id },
        generation: config::GenerationSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  user.id = {user_id}");
    println!();
    println!("Next: run `itinera db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `itinera db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>, cli_user: Option<&str>) -> anyhow::Result<()> {
    let resolved = ItineraConfig::resolve(cli_db_url, cli_user)?;

    println!("Initializing itinera database...");

    if pool::ensure_database_exists(&resolved.db_config).await? {
        println!("Created database.");
    }
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("itinera db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            user_id,
            force,
        } => {
            cmd_init(&db_url, user_id, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref(), cli.user.as_deref()).await?;
        }
        Commands::Plan { command } => {
            let resolved =
                ItineraConfig::resolve(cli.database_url.as_deref(), cli.user.as_deref())?;
            plan_cmds::run_plan_command(command, &resolved).await?;
        }
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_with_spaced_intensity() {
        let cli = Cli::try_parse_from([
            "itinera", "plan", "generate", "Rome", "--days", "3", "--intensity", "half day",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                command:
                    PlanCommands::Generate {
                        city,
                        days,
                        intensity,
                        ..
                    },
            } => {
                assert_eq!(city, "Rome");
                assert_eq!(days, 3);
                assert_eq!(intensity, TripIntensity::HalfDay);
            }
            _ => panic!("expected plan generate"),
        }
    }

    #[test]
    fn edit_requires_at_least_one_op() {
        assert!(Cli::try_parse_from(["itinera", "plan", "edit", "abcd1234"]).is_err());
        let cli = Cli::try_parse_from([
            "itinera", "plan", "edit", "abcd1234", "--op", "up:1234", "--op", "delete:5678",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                command: PlanCommands::Edit { ops, .. },
            } => assert_eq!(ops.len(), 2),
            _ => panic!("expected plan edit"),
        }
    }

    #[test]
    fn feedback_takes_explicit_verdict() {
        let cli = Cli::try_parse_from([
            "itinera", "plan", "feedback", "abcd", "--helpful", "false",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                command: PlanCommands::Feedback { helpful, .. },
            } => assert!(!helpful),
            _ => panic!("expected plan feedback"),
        }
    }
}
