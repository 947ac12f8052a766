use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use content_search::config::Config;
use content_search::error::AppError;
use content_search::models::Content;
use content_search::search::{
    AggregationField, Capabilities, Criterion, LanguageFilter, LocationQuery, Query, SearchError,
    SearchService, SectionPermissions, SortClause, TantivySearchEngine, TermAggregation,
    DEFAULT_SUGGESTION_LIMIT,
};
use serde::Serialize;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "content-search")]
#[command(about = "Index and search multi-language content", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Index directory, overriding the configured one
    #[arg(short, long)]
    index: Option<PathBuf>,

    /// Restrict permission-filtered results to these sections
    #[arg(long, value_delimiter = ',')]
    sections: Option<Vec<u64>>,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by content and location searches
#[derive(clap::Args)]
struct SearchArgs {
    /// Full-text scoring query
    #[arg(short, long)]
    text: Option<String>,

    /// Filter criterion as JSON
    #[arg(short, long)]
    filter: Option<String>,

    /// Languages in priority order
    #[arg(short, long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Do not fall back to main translations of always-available items
    #[arg(long)]
    no_always_available: bool,

    /// Sort clause, `field` or `field:order`; repeatable
    #[arg(short, long)]
    sort: Vec<SortClause>,

    #[arg(long, default_value = "25")]
    limit: usize,

    #[arg(long, default_value = "0")]
    offset: usize,

    /// Term aggregation: content_type, section, language or field:<identifier>
    #[arg(short, long)]
    aggregate: Vec<String>,

    /// Skip permission filtering
    #[arg(long)]
    no_permissions: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index content items from a JSON-lines file
    Index {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Clear the index first
        #[arg(long)]
        rebuild: bool,
    },

    /// Remove content items from the index
    Delete {
        #[arg(value_name = "ID", required = true, num_args = 1..)]
        ids: Vec<u64>,
    },

    /// Find content items
    Find(SearchArgs),

    /// Find the single content item matching a filter
    Single {
        /// Filter criterion as JSON
        #[arg(value_name = "FILTER")]
        filter: String,

        #[arg(short, long, value_delimiter = ',')]
        languages: Vec<String>,
    },

    /// Find locations
    Locations(SearchArgs),

    /// Suggest completions for a prefix
    Suggest {
        #[arg(value_name = "PREFIX")]
        prefix: String,

        /// Field identifiers to draw words from; `name` selects item names
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,

        /// Filter criterion as JSON
        #[arg(long)]
        filter: Option<String>,
    },

    /// List the capabilities of the configured engine
    Capabilities,

    /// Show index statistics
    Stats,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);

    // Results go to stdout, logs to stderr
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_criterion(json: &str) -> anyhow::Result<Criterion> {
    serde_json::from_str(json).with_context(|| format!("invalid filter criterion: {}", json))
}

fn parse_aggregation(expr: &str) -> anyhow::Result<TermAggregation> {
    let field = match expr {
        "content_type" => AggregationField::ContentType,
        "section" => AggregationField::Section,
        "language" => AggregationField::Language,
        other => match other.strip_prefix("field:") {
            Some(identifier) => AggregationField::Field(identifier.to_string()),
            None => bail!("unknown aggregation '{}'", expr),
        },
    };
    Ok(TermAggregation::new(expr, field))
}

impl SearchArgs {
    fn language_filter(&self) -> LanguageFilter {
        LanguageFilter::for_languages(self.languages.iter().cloned())
            .with_always_available(!self.no_always_available)
    }

    fn query(&self) -> anyhow::Result<Query> {
        let mut query = match self.filter {
            Some(ref filter) => Query::new(parse_criterion(filter)?),
            None => Query::default(),
        };
        if let Some(ref text) = self.text {
            query = query.with_query(Criterion::full_text(text.clone()));
        }
        for clause in &self.sort {
            query = query.with_sort(*clause);
        }
        for expr in &self.aggregate {
            query = query.with_aggregation(parse_aggregation(expr)?);
        }
        Ok(query.with_limit(self.limit).with_offset(self.offset))
    }
}

fn read_contents(input: &PathBuf) -> anyhow::Result<Vec<Content>> {
    let file = std::fs::File::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let mut contents = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let content: Content = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid content item", input.display(), number + 1))?;
        contents.push(content);
    }
    Ok(contents)
}

/// Exit code of the first known error type in the chain
fn exit_code(err: anyhow::Error) -> i32 {
    let err = match err.downcast::<AppError>() {
        Ok(app_error) => return app_error.exit_code(),
        Err(err) => err,
    };
    let err = match err.downcast::<SearchError>() {
        Ok(search_error) => return AppError::from(search_error).exit_code(),
        Err(err) => err,
    };
    let err = match err.downcast::<config::ConfigError>() {
        Ok(config_error) => return AppError::from(config_error).exit_code(),
        Err(err) => err,
    };
    match err.downcast::<serde_json::Error>() {
        Ok(json_error) => AppError::from(json_error).exit_code(),
        Err(_) => 1,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(exit_code(err));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load configuration
    let mut config = match cli.config {
        Some(ref path) => Config::load_from(&path.to_string_lossy())?,
        None => Config::load()?,
    };
    if let Some(ref index) = cli.index {
        config.search.index_path = Some(index.clone());
    }
    config.validate().map_err(AppError::Configuration)?;

    init_tracing(&config);
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        index = ?config.search.index_path,
        "Starting content-search"
    );

    let mut engine = TantivySearchEngine::new(config.search.clone()).await?;
    if let Some(sections) = cli.sections {
        engine = engine.with_permissions(Arc::new(SectionPermissions::new(sections)));
    }

    match cli.command {
        Commands::Index { input, rebuild } => {
            let contents = read_contents(&input)?;
            if rebuild {
                engine.rebuild_index(&contents).await?;
            } else {
                engine.index_contents(&contents).await?;
            }
            tracing::info!(indexed = contents.len(), "Indexing finished");
            print_json(&engine.get_stats().await?)?;
        }

        Commands::Delete { ids } => {
            let deleted = engine.delete_contents(&ids).await?;
            tracing::info!(deleted, "Deleted content");
            print_json(&engine.get_stats().await?)?;
        }

        Commands::Find(args) => {
            let result = engine
                .find_content(&args.query()?, &args.language_filter(), !args.no_permissions)
                .await?;
            print_json(&result)?;
        }

        Commands::Single { filter, languages } => {
            let content = engine
                .find_single(
                    &parse_criterion(&filter)?,
                    &LanguageFilter::for_languages(languages),
                    true,
                )
                .await?;
            print_json(&content)?;
        }

        Commands::Locations(args) => {
            let query = LocationQuery::from(args.query()?);
            let result = engine
                .find_locations(&query, &args.language_filter(), !args.no_permissions)
                .await?;
            print_json(&result)?;
        }

        Commands::Suggest {
            prefix,
            fields,
            limit,
            filter,
        } => {
            let filter = filter.as_deref().map(parse_criterion).transpose()?;
            let suggestions = engine.suggest(&prefix, &fields, limit, filter.as_ref()).await?;
            print_json(&suggestions)?;
        }

        Commands::Capabilities => {
            let capabilities: Vec<_> = Capabilities::all()
                .iter()
                .map(|capability| {
                    serde_json::json!({
                        "capability": capability.to_string(),
                        "bits": capability.bits(),
                        "supported": engine.supports(capability),
                    })
                })
                .collect();
            print_json(&capabilities)?;
        }

        Commands::Stats => {
            print_json(&engine.get_stats().await?)?;
        }
    }

    Ok(())
}
