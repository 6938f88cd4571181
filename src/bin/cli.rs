//! EmberKV CLI
//!
//! Command-line interface working on a local record file or, with
//! `--server`, on a running `emberkv-server`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use emberkv::cache::CacheStatus;
use emberkv::codec::Record;
use emberkv::network::Client;
use emberkv::store::Store;
use emberkv::{Config, EmberError, Engine, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV CLI
#[derive(Parser, Debug)]
#[command(name = "emberkv-cli")]
#[command(about = "CLI for the EmberKV key-value store")]
#[command(version)]
struct Args {
    /// Record file (local mode)
    #[arg(short, long, default_value = "./emberkv.db")]
    db: PathBuf,

    /// Create a missing record file without asking
    #[arg(short, long)]
    yes: bool,

    /// Talk to a server at host:port instead of a local file
    #[arg(short, long)]
    server: Option<String>,

    /// Maximum cached entries (local mode)
    #[arg(long, default_value = "1000")]
    cache_size: usize,

    /// Idle seconds before a cached entry expires (local mode)
    #[arg(long, default_value = "60")]
    cache_ttl_secs: u64,

    /// Log how long each command took
    #[arg(long)]
    timing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Insert or overwrite a key
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Remove a key
    Rm {
        /// The key to remove
        key: String,
    },

    /// Print every record
    All,

    /// Append random alphanumeric records
    InitDb {
        /// Number of records
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Length of each key and value
        #[arg(short, long, default_value = "32")]
        len: usize,
    },

    /// Drop duplicate keys, keeping the first of each
    Cleanup,

    /// Print the cache entries and counters
    CacheStatus,

    /// Check the backend is reachable
    Ping,

    /// Read commands from stdin, one per line
    Shell,
}

/// One line typed into `shell`
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

/// Where commands are sent
enum Backend {
    Local(Engine),
    Remote(Client),
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(args.timing)));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let mut backend = match connect(&args) {
        Ok(Some(backend)) => backend,
        Ok(None) => {
            eprintln!("No database created.");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Shell => shell(&mut backend),
        ref command => backend.run_timed(command),
    };

    if let Backend::Local(engine) = &backend {
        if let Err(e) = engine.close() {
            tracing::debug!("Engine close: {}", e);
        }
    }

    match result {
        Ok(()) => {}
        Err(EmberError::KeyNotFound) => {
            eprintln!("Key not found");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// `--timing` turns on this binary's debug output
fn default_filter(timing: bool) -> &'static str {
    if timing {
        "warn,emberkv=info,emberkv_cli=debug"
    } else {
        "warn,emberkv=info"
    }
}

/// Open the backend; `None` when the user declines to create the file
fn connect(args: &Args) -> Result<Option<Backend>> {
    if let Some(addr) = &args.server {
        let client = Client::connect(addr.as_str())?;
        client.set_timeout(Some(Duration::from_secs(5)))?;
        return Ok(Some(Backend::Remote(client)));
    }

    if !Store::exists(&args.db) && !args.yes && !confirm_create()? {
        return Ok(None);
    }

    let config = Config::builder()
        .db_path(&args.db)
        .cache_capacity(args.cache_size)
        .cache_buckets(args.cache_size)
        .cache_ttl(Duration::from_secs(args.cache_ttl_secs))
        .build();
    let engine = Engine::open(config)?;
    engine.create_store()?;

    Ok(Some(Backend::Local(engine)))
}

fn confirm_create() -> Result<bool> {
    print!("Database does not exist. Create empty database? (YES/NO) ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

fn shell(backend: &mut Backend) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("emberkv> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            return Ok(());
        }

        let parsed = match ShellLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        let result = match parsed.command {
            Commands::Shell => {
                println!("Already in a shell");
                Ok(())
            }
            ref command => backend.run_timed(command),
        };

        match result {
            Ok(()) => {}
            Err(EmberError::KeyNotFound) => println!("Key not found"),
            Err(e) => println!("Error: {}", e),
        }
    }
}

impl Backend {
    /// `run`, logging the elapsed time at debug
    fn run_timed(&mut self, command: &Commands) -> Result<()> {
        let start = Instant::now();
        let result = self.run(command);
        tracing::debug!(
            "{:?} took {:.3} ms",
            command,
            start.elapsed().as_secs_f64() * 1000.0
        );
        result
    }

    fn run(&mut self, command: &Commands) -> Result<()> {
        match (self, command) {
            (_, Commands::Shell) => Ok(()),

            (Backend::Local(engine), Commands::Set { key, value }) => {
                engine.set(key.as_bytes(), value.as_bytes())?;
                println!("OK");
                Ok(())
            }
            (Backend::Remote(client), Commands::Set { key, value }) => {
                client.set(key.as_bytes(), value.as_bytes())?;
                println!("OK");
                Ok(())
            }

            (Backend::Local(engine), Commands::Get { key }) => {
                print_value(engine.get(key.as_bytes())?)
            }
            (Backend::Remote(client), Commands::Get { key }) => {
                print_value(client.get(key.as_bytes())?)
            }

            (Backend::Local(engine), Commands::Rm { key }) => {
                print_removed(engine.remove(key.as_bytes())?)
            }
            (Backend::Remote(client), Commands::Rm { key }) => {
                print_removed(client.remove(key.as_bytes())?)
            }

            (Backend::Local(engine), Commands::All) => {
                for record in engine.list()? {
                    print_record(&record?);
                }
                Ok(())
            }
            (Backend::Remote(client), Commands::All) => {
                client.list()?.iter().for_each(print_record);
                Ok(())
            }

            (Backend::Local(engine), Commands::InitDb { count, len }) => {
                let written = engine.populate(*count, *len)?;
                println!("Added {} random records", written);
                Ok(())
            }
            (Backend::Remote(_), Commands::InitDb { .. }) => Err(EmberError::Config(
                "init-db only works on a local record file".to_string(),
            )),

            (Backend::Local(engine), Commands::Cleanup) => {
                println!("{} records kept", engine.deduplicate()?);
                Ok(())
            }
            (Backend::Remote(client), Commands::Cleanup) => {
                println!("{} records kept", client.cleanup()?);
                Ok(())
            }

            (Backend::Local(engine), Commands::CacheStatus) => {
                print_cache_status(&engine.cache_status()?);
                Ok(())
            }
            (Backend::Remote(client), Commands::CacheStatus) => {
                print_cache_status(&client.cache_status()?);
                Ok(())
            }

            (Backend::Local(_), Commands::Ping) => {
                println!("PONG");
                Ok(())
            }
            (Backend::Remote(client), Commands::Ping) => {
                client.ping()?;
                println!("PONG");
                Ok(())
            }
        }
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_value(value: Option<Vec<u8>>) -> Result<()> {
    let value = value.ok_or(EmberError::KeyNotFound)?;
    println!("{}", String::from_utf8_lossy(&value));
    Ok(())
}

fn print_removed(removed: bool) -> Result<()> {
    if !removed {
        return Err(EmberError::KeyNotFound);
    }
    println!("OK");
    Ok(())
}

fn print_record(record: &Record) {
    println!(
        "{} = {}",
        String::from_utf8_lossy(&record.key),
        String::from_utf8_lossy(&record.value)
    );
}

fn print_cache_status(status: &CacheStatus) {
    println!(
        "Cache: {}/{} entries, {} buckets, ttl {} ms",
        status.len(),
        status.capacity,
        status.bucket_count,
        status.ttl_ms
    );
    println!(
        "Hits: {}  Misses: {}  Hit rate: {:.1}%  Expired: {}  Evicted: {}",
        status.stats.hits,
        status.stats.misses,
        status.stats.hit_rate() * 100.0,
        status.stats.expirations,
        status.stats.evictions
    );
    for entry in &status.entries {
        println!(
            "  {} = {}  (hits: {}, idle: {} ms)",
            String::from_utf8_lossy(&entry.key),
            String::from_utf8_lossy(&entry.value),
            entry.hit_count,
            entry.idle_ms
        );
    }
}
