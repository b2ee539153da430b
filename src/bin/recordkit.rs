use clap::{Parser, Subcommand};
use recordkit::utils::OutputFormat;
use recordkit::RecordkitConfig;
use tracing::Level;

mod commands;

use commands::list::{CountArgs, ListArgs};
use commands::migrate::MigrateArgs;
use commands::record::{DeleteArgs, GetArgs, InsertArgs, UpdateArgs, ValueArgs};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.recordkit/recordkit.toml is used
    #[clap(short, long, global = true)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Schema catalog JSON file, overrides `schema_path` from the configuration
    #[clap(short, long, global = true)]
    schema: Option<String>,

    /// SQLite database file, by default <data_dir>/recordkit.sqlite3
    #[clap(long, global = true)]
    db: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing tables and columns for every record type
    Migrate(MigrateArgs),

    /// Fetch one record by name
    Get(GetArgs),

    /// Insert a record given as a JSON object
    Insert(InsertArgs),

    /// Update a record given as a JSON object, matched by its name
    Update(UpdateArgs),

    /// Delete a record by name
    Delete(DeleteArgs),

    /// List records with filters, ordering and paging
    List(ListArgs),

    /// Print a single field of the first matching record
    Value(ValueArgs),

    /// Count records matching filters
    Count(CountArgs),

    /// Show the active configuration
    Config,
}

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // statements are logged at DEBUG
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match RecordkitConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let output_format = cli.format;

    if let Commands::Config = cli.command {
        commands::config::run(&config, output_format);
        return;
    }

    let db = match commands::open_database(&config, cli.schema.as_deref(), cli.db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Migrate(args) => commands::migrate::run(&db, args, output_format),
        Commands::Get(args) => commands::record::get(&db, args, output_format),
        Commands::Insert(args) => commands::record::insert(&db, args, output_format),
        Commands::Update(args) => commands::record::update(&db, args, output_format),
        Commands::Delete(args) => commands::record::delete(&db, args, output_format),
        Commands::Value(args) => commands::record::value(&db, args, output_format),
        Commands::List(args) => commands::list::run(&db, args, output_format),
        Commands::Count(args) => commands::list::count(&db, args, output_format),
        Commands::Config => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
