use student_records::{config::Config, db::init_db, demo, Repository};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the walkthrough output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize database
    let pool = match init_db(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Repository::new(pool);
    let mut stdout = std::io::stdout();

    if let Err(e) = demo::run(&repo, &mut stdout).await {
        eprintln!("Demo failed: {:#}", e);
        std::process::exit(1);
    }
}
