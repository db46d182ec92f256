mod cli;

use cinedex::{config, scanner::Scanner};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "cinedex=trace,cinedex_db=debug,cinedex_parser=debug".to_string()
        } else {
            "cinedex=info,cinedex_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Scan { force, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_scan(cli.config.as_deref(), force, json))
        }
        Commands::Unscanned => list_unscanned(cli.config.as_deref()),
        Commands::Library { json } => show_library(cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("cinedex {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_scan(config_path: Option<&std::path::Path>, force: bool, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    if config.sources.is_empty() {
        anyhow::bail!("No sources configured");
    }

    let scanner = Scanner::from_config(&config)?;
    let progress: cinedex::scanner::ProgressCallback = Box::new(|progress| {
        tracing::info!(stage = ?progress.stage, "{}", progress.detail);
    });

    let summary = scanner.start_scan(force, Some(progress)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("New movies:     {}", summary.new_movies);
        println!("New shows:      {}", summary.new_shows);
        println!("Saved movies:   {}", summary.saved_movies);
        println!("Saved shows:    {}", summary.saved_shows);
        println!("Unscanned:      {}", summary.unscanned);
        println!("Pruned files:   {}", summary.pruned_files);
        println!("Ratings:        {}", summary.ratings_updated);
    }

    Ok(())
}

fn open_store(
    config_path: Option<&std::path::Path>,
) -> Result<cinedex_db::store::SqliteLibraryStore> {
    let config = config::load_config_or_default(config_path)?;
    let db_path = config.database.path.to_string_lossy();
    let pool = cinedex_db::pool::init_pool(&db_path)?;
    Ok(cinedex_db::store::SqliteLibraryStore::new(pool))
}

fn list_unscanned(config_path: Option<&std::path::Path>) -> Result<()> {
    use cinedex_db::store::LibraryStore;

    let store = open_store(config_path)?;
    let files = store.unscanned_files()?;

    if files.is_empty() {
        println!("No unscanned files");
        return Ok(());
    }

    for file in &files {
        println!("[{}] {}", file.source_id, file.file_path);
    }
    println!("\n{} unscanned files", files.len());

    Ok(())
}

fn show_library(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    use cinedex_db::store::LibraryStore;

    let store = open_store(config_path)?;
    let snapshot = store.snapshot()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("Movies ({}):", snapshot.movies.len());
    for movie in snapshot.movies.values() {
        match movie.year {
            Some(year) => println!("  {} ({}) - {} files", movie.title, year, movie.files.len()),
            None => println!("  {} - {} files", movie.title, movie.files.len()),
        }
    }

    println!("\nShows ({}):", snapshot.shows.len());
    for show in snapshot.shows.values() {
        let episodes: usize = show.seasons.values().map(|s| s.episodes.len()).sum();
        println!(
            "  {} - {} seasons, {} episodes",
            show.title,
            show.seasons.len(),
            episodes
        );
    }

    Ok(())
}

fn validate_config(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Configuration is valid!");
    println!("Database: {}", config.database.path.display());
    println!(
        "Catalog: {} ({})",
        if config.catalog.api_key.is_empty() {
            "no API key"
        } else {
            "API key set"
        },
        config.catalog.language
    );
    println!("Ratings: {}", if config.ratings.enabled { "enabled" } else { "disabled" });
    println!("Sources: {}", config.sources.len());

    for source in &config.sources {
        println!("  - {} ({:?}, {} paths)", source.display_name(), source.kind, source.paths.len());
    }

    Ok(())
}
