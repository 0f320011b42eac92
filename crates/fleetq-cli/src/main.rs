//! fleetq CLI
//!
//! Command-line interface for interacting with the fleetq daemon.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

/// fleetq - GPU fleet allocation and queueing service
#[derive(Parser, Debug)]
#[command(name = "fleetq")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon API address
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    api: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List nodes in the fleet
    Nodes {
        /// Only show nodes of this GPU class
        #[arg(long)]
        gpu_type: Option<String>,
    },

    /// Show per-GPU detail for one node
    Node {
        /// Node name
        name: String,
    },

    /// Show the wait queue for one node
    Queue {
        /// Node name
        name: String,
    },

    /// Submit a job request
    Submit {
        /// GPU class (A100, H100, A30, H200)
        #[arg(long)]
        gpu_type: String,

        /// GPUs per replica
        #[arg(long, default_value_t = 1)]
        gpus: u32,

        /// CPU percentage share
        #[arg(long, default_value_t = 100)]
        cpu: u32,

        /// Memory percentage share
        #[arg(long, default_value_t = 100)]
        memory: u32,

        /// Number of replicas
        #[arg(long, default_value_t = 1)]
        nodes: u32,

        /// Container image
        #[arg(long)]
        image: String,

        /// Priority class (normal or urgent)
        #[arg(long, default_value = "normal")]
        priority: String,

        /// Justification, required for urgent priority
        #[arg(long)]
        reason: Option<String>,

        /// Target node name (chosen automatically if omitted)
        #[arg(long)]
        node: Option<String>,

        /// Requesting team
        #[arg(long)]
        team: Option<String>,

        /// Requesting user
        #[arg(long)]
        user: Option<String>,
    },

    /// Move a queue entry to a new position
    Move {
        /// Node name
        node: String,

        /// Queue entry id
        entry: Uuid,

        /// Target position (1-based)
        position: usize,
    },

    /// Cancel a queue entry
    Cancel {
        /// Node name
        node: String,

        /// Queue entry id
        entry: Uuid,
    },

    /// List the resource configuration catalog
    Configs {
        /// GPU class used to derive replica ceilings
        #[arg(long)]
        gpu_type: Option<String>,
    },

    /// Show fleet status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let client = commands::ApiClient::new(&cli.api);

    match cli.command {
        Commands::Nodes { gpu_type } => {
            commands::nodes(&client, gpu_type).await?;
        }
        Commands::Node { name } => {
            commands::node(&client, &name).await?;
        }
        Commands::Queue { name } => {
            commands::queue(&client, &name).await?;
        }
        Commands::Submit {
            gpu_type,
            gpus,
            cpu,
            memory,
            nodes,
            image,
            priority,
            reason,
            node,
            team,
            user,
        } => {
            commands::submit(
                &client,
                commands::SubmitArgs {
                    gpu_type,
                    gpus,
                    cpu,
                    memory,
                    nodes,
                    image,
                    priority,
                    reason,
                    node,
                    team,
                    user,
                },
            )
            .await?;
        }
        Commands::Move {
            node,
            entry,
            position,
        } => {
            commands::move_entry(&client, &node, entry, position).await?;
        }
        Commands::Cancel { node, entry } => {
            commands::cancel(&client, &node, entry).await?;
        }
        Commands::Configs { gpu_type } => {
            commands::configs(&client, gpu_type).await?;
        }
        Commands::Status => {
            commands::status(&client).await?;
        }
    }

    Ok(())
}
