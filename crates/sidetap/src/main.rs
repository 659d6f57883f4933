//! sidetap: turn spare mouse buttons into configurable shortcuts.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use button_engine::{EngineDeps, MappingTable, MouseListener};
use button_store::ButtonStore;
use clap::{Parser, Subcommand};
use tracing::info;

const STORE_FILE: &str = "mouse_buttons.json";

#[derive(Parser, Debug)]
#[command(name = "sidetap", about = "Mouse button shortcuts and sequences")]
struct Cli {
    /// Directory holding the button store (default: ~/.sidetap)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(flatten)]
    logs: logging::LogArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture mouse buttons until interrupted (default)
    Run,
    /// Print configured bindings and permission state
    Status,
    /// Check input-capture permission
    Permissions,
    /// List the system command names usable as actions
    Commands,
}

fn data_dir(cli: &Cli) -> PathBuf {
    if let Some(dir) = &cli.data_dir {
        return dir.clone();
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".sidetap"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn open_store(cli: &Cli) -> Arc<ButtonStore> {
    Arc::new(ButtonStore::open(data_dir(cli).join(STORE_FILE)))
}

fn run(store: Arc<ButtonStore>) -> ExitCode {
    let listener = match MouseListener::new(store, EngineDeps::system()) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to initialize listener: {e}");
            return ExitCode::FAILURE;
        }
    };
    let outcome = listener.start();
    if !outcome.success {
        eprintln!("{}", outcome.message);
        return ExitCode::FAILURE;
    }
    println!("{}", outcome.message);
    println!("press Ctrl-C to stop");

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to build runtime: {e}");
            listener.stop();
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = rt.block_on(tokio::signal::ctrl_c()) {
        eprintln!("failed to wait for interrupt: {e}");
    }
    info!("interrupt_received");
    listener.stop();
    println!("stopped");
    ExitCode::SUCCESS
}

fn status(store: &ButtonStore) -> ExitCode {
    let report = permissions::input_capture();
    println!(
        "permission: {} ({})",
        if report.granted { "granted" } else { "denied" },
        report.reason
    );
    let table = MappingTable::from_records(&store.list());
    let mut singles: Vec<_> = table.singles().iter().collect();
    singles.sort_by_key(|(key, _)| key.ordinal());
    println!("singles:");
    for (key, action) in singles {
        println!("  {key} -> {action}");
    }
    println!("sequences:");
    for seq in table.sequences() {
        let keys: Vec<String> = seq.sequence.iter().map(ToString::to_string).collect();
        println!("  {} -> {}", keys.join(" "), seq.action);
    }
    ExitCode::SUCCESS
}

fn permissions_check() -> ExitCode {
    let report = permissions::input_capture();
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{}", report.reason),
    }
    if report.granted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn list_commands() -> ExitCode {
    for name in keypost::commands::names() {
        println!("{name}");
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(logging::env_filter_from_spec(&cli.logs.spec()))
        .init();

    match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::Run => run(open_store(&cli)),
        Command::Status => status(&open_store(&cli)),
        Command::Permissions => permissions_check(),
        Command::Commands => list_commands(),
    }
}
