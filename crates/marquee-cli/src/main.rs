use clap::{ArgAction, Parser, Subcommand};
use commands::compose::ComposeArgs;
use commands::react::VoteArg;
use context::AppContext;
use std::path::PathBuf;

mod commands;
mod context;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee - track, post, rank and poll the media you love")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Work against the built-in sample catalog; nothing leaves this process
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search movies, shows, books, music, podcasts and games
    Search {
        /// Free-text query
        query: String,
    },
    /// List the seasons of a TV show
    Seasons {
        /// External id of the show
        parent_id: String,
    },
    /// List the episodes of one season
    Episodes {
        /// External id of the show
        parent_id: String,
        season: u32,
    },
    /// Show your lists and ranks and how they are classified
    Lists,
    /// Genre breakdown over a set of media
    #[command(long_about = "Aggregate genres over a set of media. Each --media value is TYPE:ID or TYPE:SOURCE:ID, e.g. movie:438631 or book:openlibrary:OL893415W.")]
    Genres {
        #[arg(long = "media", value_name = "TYPE:[SOURCE:]ID", required = true)]
        media: Vec<String>,

        /// How many genres to show
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Compose and submit a track, post, hot take, poll, rank entry or challenge
    Compose(ComposeArgs),
    /// Agree or disagree with a hot take
    Vote {
        target_id: String,
        #[arg(value_enum)]
        choice: VoteArg,

        /// Current agree count
        #[arg(long, default_value_t = 0)]
        agree: u32,

        /// Current disagree count
        #[arg(long, default_value_t = 0)]
        disagree: u32,

        /// Your current vote, if any
        #[arg(long, value_enum)]
        mine: Option<VoteArg>,
    },
    /// Like or unlike a post
    Like {
        target_id: String,

        /// Current like count
        #[arg(long, default_value_t = 0)]
        count: u32,

        /// The post is already liked by you
        #[arg(long, action = ArgAction::SetTrue)]
        liked: bool,
    },
    /// View or create configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks the API token)
    Show {
        /// Show the API token unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a config file and optionally store an API token
    Init {
        /// Backend base URL
        #[arg(long)]
        base_url: Option<String>,

        /// API token, saved to credentials.toml rather than config.toml
        #[arg(long)]
        token: Option<String>,

        /// Overwrite an existing config file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config.as_deref()).map_err(|e| color_eyre::eyre::eyre!("{:#}", e))?;

    logging::init_logging(cli.verbose, cli.quiet, &ctx.config.logging)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let offline = cli.offline;

    match cli.command {
        Commands::Search { query } => commands::browse::run_search(&ctx, offline, &query, &output).await,
        Commands::Seasons { parent_id } => commands::browse::run_seasons(&ctx, offline, &parent_id, &output).await,
        Commands::Episodes { parent_id, season } => {
            commands::browse::run_episodes(&ctx, offline, &parent_id, season, &output).await
        }
        Commands::Lists => commands::browse::run_lists(&ctx, offline, &output).await,
        Commands::Genres { media, top } => commands::browse::run_genres(&ctx, offline, &media, top, &output).await,
        Commands::Compose(args) => commands::compose::run_compose(&ctx, offline, args, &output).await,
        Commands::Vote {
            target_id,
            choice,
            agree,
            disagree,
            mine,
        } => commands::react::run_vote(&ctx, offline, &target_id, choice, (agree, disagree, mine), &output).await,
        Commands::Like { target_id, count, liked } => {
            commands::react::run_like(&ctx, offline, &target_id, count, liked, &output).await
        }
        Commands::Config { cmd } => commands::config::run_config(&ctx, cmd, &output),
    }
}
