//! Tasklist CLI - to-do service and offline-tolerant client.

use clap::Parser;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process;
use tasklist::cli::{Cli, Commands};
use tasklist::client::{Controller, HttpTaskApi, LocalCache};
use tasklist::commands::{self, Output};
use tasklist::config::{self, ClientOverrides};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    init_tracing(&cli.command);

    if let Err(e) = run(cli) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` overrides.
fn init_tracing(command: &Commands) {
    let default = match command {
        #[cfg(feature = "server")]
        Commands::Serve { .. } => "tasklist=info,tower_http=info",
        _ => "tasklist=warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), tasklist::Error> {
    let file_config = config::load_config()?;

    match cli.command {
        #[cfg(feature = "server")]
        Commands::Serve {
            port,
            host,
            database,
            environment,
            static_dir,
        } => {
            let overrides = config::ServerOverrides {
                port,
                host,
                database,
                environment,
                static_dir,
            };
            run_server(config::resolve_server(&file_config, &overrides)?)
        }
        command => {
            let overrides = ClientOverrides {
                api_url: cli.api_url,
                cache_path: cli.cache_path,
            };
            run_client(
                command,
                config::resolve_client(&file_config, &overrides)?,
                cli.human_readable,
            )
        }
    }
}

fn run_client(
    command: Commands,
    settings: config::ClientSettings,
    human: bool,
) -> Result<(), tasklist::Error> {
    tracing::debug!(
        api_url = %settings.api_url.value,
        api_url_source = ?settings.api_url.source,
        cache = %settings.cache_path.value.display(),
        "client settings resolved"
    );

    let api = HttpTaskApi::new(settings.api_url.value.clone());
    let controller = Controller::new(api, LocalCache::new(settings.cache_path.value.clone()));

    match command {
        Commands::List { filter } => {
            let controller = controller.with_filter(filter);
            output(&commands::list(&controller), human);
        }
        Commands::Add { text } => output(&commands::add(&controller, &text)?, human),
        Commands::Done { id } => output(&commands::set_done(&controller, &id, true), human),
        Commands::Undo { id } => output(&commands::set_done(&controller, &id, false), human),
        Commands::Edit { id, text } => output(&commands::edit(&controller, &id, &text)?, human),
        Commands::Rm { id, yes } => {
            output(&commands::remove(&controller, &id, |p| yes || confirm(p)), human)
        }
        Commands::Clear { yes } => {
            output(&commands::clear(&controller, |p| yes || confirm(p)), human)
        }
        Commands::Status => output(
            &commands::status(&controller, &settings.api_url.value),
            human,
        ),
        #[cfg(feature = "server")]
        Commands::Serve { .. } => {
            return Err(tasklist::Error::Other(
                "serve is not a client command".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
fn run_server(settings: config::ServerSettings) -> Result<(), tasklist::Error> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| tasklist::Error::Other(format!("Failed to create runtime: {}", e)))?
        .block_on(async {
            tasklist::server::start_server(settings)
                .await
                .map_err(|e| tasklist::Error::Other(format!("Server error: {}", e)))
        })
}

/// Ask a yes/no question on stderr. Anything but y/yes is a no, and so is
/// a non-interactive stdin.
fn confirm(prompt: &str) -> bool {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return false;
    }
    eprint!("{} [y/N] ", prompt);
    let _ = io::stderr().flush();

    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
