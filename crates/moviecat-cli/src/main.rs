//! moviecat - movie catalog browser CLI.

/// Application configuration (TOML).
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use crate::config::{AppConfig, resolve_config_path};
use moviecat_api::catalog::{CatalogClient, LocalCatalogApi, Movie, SearchMoviesParams};

/// Default User-Agent sent to the catalog API.
const USER_AGENT: &str = concat!("moviecat/", env!("CARGO_PKG_VERSION"));

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Override the catalog API base URL.
    #[arg(long, global = true)]
    base_url: Option<Url>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Search movies (paged, optionally filtered).
    Search(SearchArgs),
    /// Show one movie's details.
    Details(DetailsArgs),
    /// List genres with their movie counts.
    Genres,
    /// Manage the config file.
    Config(ConfigCommand),
}

/// Arguments for the `search` subcommand.
#[derive(clap::Args)]
struct SearchArgs {
    /// Page number (starting at 1).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    page: u32,
    /// Results per page (default: `search.page_size` from config).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,
    /// Title search text.
    #[arg(long)]
    search: Option<String>,
    /// Genre title filter (e.g. "Action").
    #[arg(long)]
    genre: Option<String>,
}

/// Arguments for the `details` subcommand.
#[derive(clap::Args)]
struct DetailsArgs {
    /// Movie ID.
    #[arg(long, required = true)]
    id: String,
}

/// Arguments for the `config` subcommand.
#[derive(clap::Args)]
struct ConfigCommand {
    /// Config subcommand to run.
    #[command(subcommand)]
    command: ConfigSubcommands,
}

/// Available config subcommands.
#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Write a default config file.
    Init,
}

/// Builds a `CatalogClient` from config, with `--base-url` taking precedence.
///
/// # Errors
///
/// Returns an error if the base URL is invalid or the client fails to build.
#[instrument(skip_all)]
fn build_catalog_client(base_url: Option<&Url>, config: &AppConfig) -> Result<CatalogClient> {
    let base_url = match base_url {
        Some(url) => url.clone(),
        None => Url::parse(&config.api.base_url)
            .with_context(|| format!("invalid base_url in config: {}", config.api.base_url))?,
    };
    let user_agent = config
        .api
        .user_agent
        .clone()
        .unwrap_or_else(|| String::from(USER_AGENT));

    let mut builder = CatalogClient::builder()
        .base_url(base_url)
        .user_agent(user_agent);
    for (name, value) in &config.api.headers {
        builder = builder.header(name, value);
    }

    builder.build().context("failed to build catalog client")
}

/// Loads the config from `--dir` or the default location.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or the file is invalid.
fn load_config(dir: Option<&PathBuf>) -> Result<AppConfig> {
    let path = resolve_config_path(dir)?;
    tracing::debug!(path = %path.display(), "Loading config");
    AppConfig::load(&path)
}

/// Loads the config and builds a client for the catalog subcommands.
///
/// # Errors
///
/// Returns an error if the config is invalid or the client fails to build.
fn connect(cli: &Cli) -> Result<(AppConfig, CatalogClient)> {
    let config = load_config(cli.dir.as_ref())?;
    let client = build_catalog_client(cli.base_url.as_ref(), &config)?;
    Ok((config, client))
}

/// Runs the `search` subcommand.
///
/// # Errors
///
/// Returns an error if the client fails to build or the API request fails.
#[instrument(skip_all)]
async fn run_search(args: &SearchArgs, client: &CatalogClient, config: &AppConfig) -> Result<()> {
    let limit = args.limit.unwrap_or(config.search.page_size);

    let mut params = SearchMoviesParams::new(args.page, limit);
    if let Some(search) = &args.search {
        params = params.search(search);
    }
    if let Some(genre) = &args.genre {
        params = params.genre(genre);
    }

    let page = client
        .search_movies(&params)
        .await
        .context("movie search request failed")?;

    if let Some(summary) = search_summary(&params, page.data.len(), page.total_pages) {
        tracing::info!("{}", summary);
    }
    tracing::info!("ID\t\t\tTitle\t\t\tRating");
    for movie in &page.data {
        tracing::info!(
            "{}\t{}\t\t{}",
            movie.id,
            movie.title,
            movie.rating.as_deref().unwrap_or("N/A"),
        );
    }
    tracing::info!("Page {} of {}", args.page, page.total_pages.max(1));

    Ok(())
}

/// Describes an active filter, e.g. `Found 12+ movies for "matrix" in Action`.
///
/// `count` is the number of movies on this page; `+` marks that more pages exist.
///
/// Returns `None` when neither search text nor genre is set.
fn search_summary(params: &SearchMoviesParams, count: usize, total_pages: u32) -> Option<String> {
    let search = params.search.as_deref().filter(|s| !s.is_empty());
    let genre = params.genre.as_deref().filter(|g| !g.is_empty());
    if search.is_none() && genre.is_none() {
        return None;
    }

    let found = if total_pages > 1 {
        format!("{count}+")
    } else {
        count.to_string()
    };
    let mut summary = format!("Found {found} movies");
    if let Some(search) = search {
        summary.push_str(&format!(" for \"{search}\""));
    }
    if let Some(genre) = genre {
        summary.push_str(&format!(" in {genre}"));
    }
    Some(summary)
}

/// Runs the `details` subcommand.
///
/// # Errors
///
/// Returns an error if the ID is empty or the API request fails.
#[instrument(skip_all)]
async fn run_details(args: &DetailsArgs, client: &CatalogClient) -> Result<()> {
    let movie = client
        .movie_details(&args.id)
        .await
        .context("movie details request failed")?;

    for line in describe_movie(&movie) {
        tracing::info!("{}", line);
    }

    Ok(())
}

/// Renders a movie as display lines.
fn describe_movie(movie: &Movie) -> Vec<String> {
    let score = |value: Option<&moviecat_api::catalog::NumberOrString>| {
        value.map_or_else(|| String::from("-"), ToString::to_string)
    };
    let year = movie
        .published_year()
        .map_or_else(|| String::from("N/A"), |y| y.to_string());

    let mut lines = vec![
        format!("Title: {}", movie.title),
        format!("Rated: {}", movie.rating.as_deref().unwrap_or("N/A")),
        format!(
            "Score: {} / {}",
            score(movie.rating_value.as_ref()),
            score(movie.best_rating.as_ref())
        ),
        format!("Duration: {}", movie.display_duration()),
        format!("Year: {year}"),
    ];
    if let Some(directors) = movie.directors.as_ref().filter(|d| !d.is_empty()) {
        lines.push(format!("Directors: {}", directors.join(", ")));
    }
    if let Some(genres) = movie.genres.as_ref().filter(|g| !g.is_empty()) {
        let titles: Vec<&str> = genres.iter().map(|g| g.title.as_str()).collect();
        lines.push(format!("Genres: {}", titles.join(", ")));
    }
    if let Some(summary) = &movie.summary {
        lines.push(String::from("---"));
        lines.push(summary.clone());
    }
    lines
}

/// Runs the `genres` subcommand.
///
/// # Errors
///
/// Returns an error if the API request fails.
#[instrument(skip_all)]
async fn run_genres(client: &CatalogClient) -> Result<()> {
    let listing = client
        .genres_with_movies()
        .await
        .context("genre listing request failed")?;

    tracing::info!("Genres: {}", listing.data.len());
    for title in listing.sorted_titles() {
        let count: usize = listing
            .data
            .iter()
            .filter(|g| g.title == title)
            .map(|g| g.movies.len())
            .sum();
        tracing::info!("  {}\t{} movies", title, count);
    }

    Ok(())
}

/// Runs the `config init` subcommand.
///
/// # Errors
///
/// Returns an error if the config file exists or cannot be written.
fn run_config_init(dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    AppConfig::init(&path)?;
    tracing::info!("Wrote default config to {}", path.display());
    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();

    match &cli.command {
        Commands::Search(args) => {
            let (config, client) = connect(&cli)?;
            run_search(args, &client, &config).await
        }
        Commands::Details(args) => {
            let (_, client) = connect(&cli)?;
            run_details(args, &client).await
        }
        Commands::Genres => {
            let (_, client) = connect(&cli)?;
            run_genres(&client).await
        }
        Commands::Config(cmd) => match cmd.command {
            ConfigSubcommands::Init => run_config_init(cli.dir.as_ref()),
        },
    }
}
