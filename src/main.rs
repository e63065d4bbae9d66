//! Modr CLI application entry point
//!
//! Command-line front end for the moderation engine: build a container
//! hierarchy, post content, select discussions and comments, then move or
//! delete them in bulk while the aggregate counters stay consistent.
//!
//! # Usage
//!
//! ```bash
//! # Build a hierarchy and post into it
//! modr container add General
//! modr container add Announcements --parent 1
//! modr item add -c 2 -t "Welcome"
//!
//! # Select and move with a redirect left behind
//! modr select check Discussion_3 Discussion_4
//! modr move --to 1 --redirect
//!
//! # Delete ids listed in a file
//! modr delete -i spam.csv --format csv --yes
//!
//! # Machine-readable reports
//! modr --json container verify
//! ```
//!
//! # Configuration
//!
//! On first run, modr will prompt for initial setup. Configuration is stored in
//! the user's config directory (`~/.config/modr/config.toml` on Linux).

use modr::{
    ModrError,
    cli::{Cli, Commands},
    commands::{self, OutputMode},
    config::ModrConfig,
    db::{ActorId, Database},
    ledger::AggregateLedger,
    moderation::Moderator,
    selection::SelectionStore,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

type Result<T> = std::result::Result<T, ModrError>;

/// Install a stderr fmt layer filtered by `RUST_LOG`, else `default_level`
fn init_logging(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn open_database(config: &ModrConfig, requested: Option<&str>) -> Result<Database> {
    let db_name = requested
        .map(str::to_string)
        .or_else(|| config.get_default_database().cloned())
        .ok_or_else(|| {
            ModrError::InvalidInput(
                "No default database set. Use 'modr db add <name>' to create one, or specify --db <name>.".into(),
            )
        })?;

    let db_path = config
        .get_database(&db_name)
        .ok_or_else(|| ModrError::InvalidInput(format!("Database '{db_name}' not found in configuration")))?;

    Ok(Database::open_with_schema(db_path, config.schema)?)
}

fn acting_user(cli: &Cli, config: &ModrConfig) -> Result<ActorId> {
    cli.actor
        .map(ActorId::new)
        .or(config.actor)
        .ok_or_else(|| ModrError::InvalidInput("No acting moderator. Pass --actor <id> or set 'actor' in the config.".into()))
}

fn run(cli: &Cli, mut config: ModrConfig) -> Result<()> {
    let mode = OutputMode {
        quiet: cli.quiet || config.quiet,
        json: cli.json,
    };

    if let Commands::Db { command } = &cli.command {
        return commands::db(&mut config, command, mode.quiet);
    }

    let db = open_database(&config, cli.db.as_deref())?;
    let ledger = AggregateLedger::load(&db)?;
    let selections = SelectionStore::new(&db);

    match &cli.command {
        Commands::Container { command } => return commands::container(&db, &ledger, command, mode),
        Commands::Item { command } => return commands::items(&db, &ledger, command, mode),
        Commands::Comment { command } => return commands::comments(&db, &ledger, command, mode),
        _ => {}
    }

    let actor = acting_user(cli, &config)?;
    let grants = config.grant_table();
    let moderator = Moderator::new(&db, &ledger, SelectionStore::new(&db), &grants)
        .with_redirects(config.redirect_generator())
        .with_policy(config.moderation_policy());

    match &cli.command {
        Commands::Select { command } => commands::select(&selections, actor, command, mode),
        Commands::Move(args) => commands::move_items(&moderator, &selections, actor, args, mode),
        Commands::Delete(args) => commands::delete_items(&moderator, &selections, actor, args, mode),
        Commands::DeleteComments(args) => commands::delete_comments(&moderator, &selections, actor, args, mode),
        Commands::Db { .. } | Commands::Container { .. } | Commands::Item { .. } | Commands::Comment { .. } => {
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse_args();

    let config = match ModrConfig::load_or_setup() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level);

    let json = cli.json;
    if let Err(e) = run(&cli, config) {
        // JSON mode already printed the error body for failed batches
        if !json || !matches!(e, ModrError::ModerationError(_)) {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}
