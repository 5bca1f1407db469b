use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulate::api::{self, AppState};
use circulate_core::store::{Database, InMemoryBooks, InMemoryMembers};
use circulate_core::{Catalog, Circulation, LendingPolicy};

#[derive(Parser)]
#[command(name = "circulate")]
#[command(about = "Library circulation backend: loans, reservations, catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the circulation server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Database file (defaults to the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Keep all state in memory, no database file
        #[arg(long)]
        in_memory: bool,

        /// Maximum simultaneous loans per member
        #[arg(long, default_value = "5")]
        max_loans: u32,

        /// Loan period in days
        #[arg(long, default_value = "14")]
        loan_days: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "circulate=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (port, db, in_memory, policy) = match cli.command {
        Some(Commands::Serve {
            port,
            db,
            in_memory,
            max_loans,
            loan_days,
        }) => (
            port,
            db,
            in_memory,
            LendingPolicy {
                max_loans,
                loan_days,
            },
        ),
        // Default: serve on port 3000 with stock policy
        None => (3000, None, false, LendingPolicy::default()),
    };

    let state = if in_memory {
        tracing::info!("using in-memory stores; state is lost on shutdown");
        let books = Arc::new(InMemoryBooks::new());
        let members = Arc::new(InMemoryMembers::new());
        AppState {
            circulation: Circulation::new(books.clone(), members.clone(), policy),
            catalog: Catalog::new(books, members),
        }
    } else {
        let db = match db {
            Some(path) => Database::open(path)?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        let store = Arc::new(db);
        AppState {
            circulation: Circulation::new(store.clone(), store.clone(), policy),
            catalog: Catalog::new(store.clone(), store),
        }
    };

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("circulation server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
