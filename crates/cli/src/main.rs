use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use interactions::{TransactionLog, UserId, parser, popularity};
use models::AlsConfig;
use rand::Rng;
use recommender::{Recommender, RecommenderConfig, ScoredItem};
use std::path::PathBuf;
use std::time::Instant;

/// BasketRecs - retail basket recommendation engine
#[derive(Parser)]
#[command(name = "basket-recs")]
#[command(about = "Basket recommendations over a transaction log", long_about = None)]
struct Cli {
    /// Path to the transactions CSV (user_id,item_id,quantity)
    #[arg(short, long, default_value = "data/transactions.csv")]
    data: PathBuf,

    /// ALS factor dimensionality
    #[arg(long, default_value = "512")]
    factors: usize,

    /// ALS training iterations
    #[arg(long, default_value = "20")]
    iterations: usize,

    /// Skip the global BM25 weighting pass
    #[arg(long)]
    no_weighting: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    Als,
    Bm25,
    Tfidf,
    Cosine,
    Own,
    SimilarItems,
    SimilarUsers,
}

#[derive(Subcommand)]
enum Commands {
    /// Get item recommendations for a user
    Recommend {
        /// User ID to recommend for
        #[arg(long)]
        user_id: UserId,

        /// Number of recommendations to return
        #[arg(long, default_value = "5")]
        count: usize,

        /// Model variant to use
        #[arg(long, value_enum, default_value = "als")]
        model: ModelArg,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get scored recommendations for a user
    Scores {
        /// User ID to score for
        #[arg(long)]
        user_id: UserId,

        /// Number of scored items to return
        #[arg(long, default_value = "5")]
        count: usize,

        /// Model variant to use
        #[arg(long, value_enum, default_value = "als")]
        model: ModelArg,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user's purchase profile
    User {
        /// User ID to display
        #[arg(long)]
        user_id: UserId,
    },

    /// Show the global popularity ranking
    Popular {
        /// Number of items to show
        #[arg(long, default_value = "10")]
        count: usize,
    },

    /// Run a latency benchmark over random users
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    println!("Loading transactions from {}...", cli.data.display());
    let start = Instant::now();
    let records = parser::parse_transactions(&cli.data).context("Failed to load transaction log")?;
    let log = TransactionLog::from_transactions(records);
    let (users, items, record_count) = log.counts();
    println!(
        "{} Loaded {} users, {} items, {} records in {:?}",
        "✓".green(),
        users,
        items,
        record_count,
        start.elapsed()
    );

    let config = RecommenderConfig {
        weighting: !cli.no_weighting,
        als: AlsConfig {
            factors: cli.factors,
            iterations: cli.iterations,
            ..AlsConfig::default()
        },
        ..RecommenderConfig::default()
    };

    match cli.command {
        Commands::Recommend {
            user_id,
            count,
            model,
            json,
        } => {
            let mut engine = fit_engine(&log, config)?;
            handle_recommend(&mut engine, user_id, count, model, json)?;
        }
        Commands::Scores {
            user_id,
            count,
            model,
            json,
        } => {
            let mut engine = fit_engine(&log, config)?;
            handle_scores(&mut engine, user_id, count, model, json)?;
        }
        Commands::User { user_id } => handle_user(&log, user_id)?,
        Commands::Popular { count } => handle_popular(&log, count),
        Commands::Benchmark { requests } => {
            let mut engine = fit_engine(&log, config)?;
            handle_benchmark(&mut engine, &log, requests)?;
        }
    }

    Ok(())
}

fn fit_engine(log: &TransactionLog, config: RecommenderConfig) -> Result<Recommender> {
    let start = Instant::now();
    let engine = Recommender::fit(log, config)?;
    println!("{} Fitted models in {:?}", "✓".green(), start.elapsed());
    Ok(engine)
}

fn model_name(model: ModelArg) -> &'static str {
    match model {
        ModelArg::Als => "als",
        ModelArg::Bm25 => "bm25",
        ModelArg::Tfidf => "tfidf",
        ModelArg::Cosine => "cosine",
        ModelArg::Own => "own",
        ModelArg::SimilarItems => "similar-items",
        ModelArg::SimilarUsers => "similar-users",
    }
}

/// Handle the 'recommend' command
fn handle_recommend(
    engine: &mut Recommender,
    user_id: UserId,
    count: usize,
    model: ModelArg,
    json: bool,
) -> Result<()> {
    let items = match model {
        ModelArg::Als => engine.get_als_recommendations(user_id, count)?,
        ModelArg::Bm25 => engine.get_bm25_recommendations(user_id, count)?,
        ModelArg::Tfidf => engine.get_tfidf_recommendations(user_id, count)?,
        ModelArg::Cosine => engine.get_cosine_recommendations(user_id, count)?,
        ModelArg::Own => engine.get_own_recommendations(user_id, count)?,
        ModelArg::SimilarItems => engine.get_similar_items_recommendation(user_id, count)?,
        ModelArg::SimilarUsers => engine.get_similar_users_recommendation(user_id, count)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Recommendations for user {} ({}):",
            user_id,
            model_name(model)
        )
        .bold()
        .blue()
    );
    for (rank, item) in items.iter().enumerate() {
        println!("{}. item {}", (rank + 1).to_string().green(), item);
    }
    Ok(())
}

/// Handle the 'scores' command
fn handle_scores(
    engine: &mut Recommender,
    user_id: UserId,
    count: usize,
    model: ModelArg,
    json: bool,
) -> Result<()> {
    let scores: Vec<ScoredItem> = match model {
        ModelArg::Als => engine.get_als_scores(user_id, count)?,
        ModelArg::Bm25 => engine.get_bm25_scores(user_id, count)?,
        ModelArg::Tfidf => engine.get_tfidf_scores(user_id, count)?,
        ModelArg::Cosine => engine.get_cosine_scores(user_id, count)?,
        ModelArg::Own => engine.get_own_scores(user_id, count)?,
        other => bail!("score output is not available for {}", model_name(other)),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("Scores for user {} ({}):", user_id, model_name(model))
            .bold()
            .blue()
    );
    for (rank, scored) in scores.iter().enumerate() {
        println!(
            "{}. item {} - score {:.4}",
            (rank + 1).to_string().green(),
            scored.item,
            scored.score
        );
    }
    Ok(())
}

/// Handle the 'user' command
fn handle_user(log: &TransactionLog, user_id: UserId) -> Result<()> {
    let Some(counts) = log.user_item_counts(user_id) else {
        bail!("User {} not found", user_id);
    };

    let records: u32 = counts.values().sum();
    println!("{}", format!("User {}", user_id).bold().blue());
    println!("{}Distinct items: {}", "• ".green(), counts.len());
    println!("{}Total records: {}", "• ".green(), records);

    println!("Top purchases:");
    for (item, count) in popularity::top_purchases(log, user_id, None)
        .into_iter()
        .take(5)
    {
        println!("  - item {} ({} records)", item, count);
    }
    Ok(())
}

/// Handle the 'popular' command
fn handle_popular(log: &TransactionLog, count: usize) {
    println!("{}", "Most popular items:".bold().blue());
    let top = popularity::overall_top_items(log, Some(999_999));
    for (rank, item) in top.iter().take(count).enumerate() {
        println!(
            "{}. item {} ({} records)",
            (rank + 1).to_string().green(),
            item,
            log.item_count(*item)
        );
    }
}

/// Handle the 'benchmark' command
fn handle_benchmark(
    engine: &mut Recommender,
    log: &TransactionLog,
    requests: usize,
) -> Result<()> {
    let users = log.users();
    if users.is_empty() || requests == 0 {
        bail!("nothing to benchmark");
    }

    let mut rng = rand::rng();
    let mut timings = Vec::with_capacity(requests);
    let start = Instant::now();
    for _ in 0..requests {
        let user = users[rng.random_range(0..users.len())];
        let request_start = Instant::now();
        engine.get_als_recommendations(user, 5)?;
        timings.push(request_start.elapsed());
    }
    let total_time = start.elapsed();

    timings.sort();
    let avg_latency = total_time / timings.len() as u32;
    let p50 = timings[timings.len() / 2];
    let p95 = timings[((timings.len() as f32 * 0.95) as usize).min(timings.len() - 1)];
    let p99 = timings[((timings.len() as f32 * 0.99) as usize).min(timings.len() - 1)];
    let throughput = requests as f32 / total_time.as_secs_f32();

    println!("Benchmark results:");
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", p50);
    println!("P95 latency: {:?}", p95);
    println!("P99 latency: {:?}", p99);
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}
