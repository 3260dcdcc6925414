// companion-sink-cli/src/main.rs
// ============================================================================
// Module: Companion Sink CLI Entry Point
// Description: Command dispatcher for the companion listener.
// Purpose: Provide a safe, loopback-first CLI for serving test-case POSTs.
// Dependencies: clap, companion-sink-server, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The Companion Sink CLI starts the local listener that receives test-case
//! payloads from a companion browser extension. Binds outside the loopback
//! range are refused unless explicitly allowed, so the helper never exposes
//! the output file to the network by accident.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;
pub(crate) mod serve_policy;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use companion_sink_server::CompanionServer;
use companion_sink_server::ServerConfig;

use crate::serve_policy::ALLOW_NON_LOOPBACK_ENV;
use crate::serve_policy::BindOutcome;
use crate::serve_policy::enforce_local_only;
use crate::serve_policy::resolve_allow_non_loopback;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Top-level CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "companion-sink", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the companion listener.
    Serve(ServeCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Full socket address to listen on (conflicts with --port).
    #[arg(long, value_name = "ADDR", conflicts_with = "port")]
    bind: Option<String>,
    /// Loopback port to listen on.
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,
    /// Output file replaced on each request.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Maximum accepted request body size in bytes.
    #[arg(long, value_name = "BYTES")]
    max_body_bytes: Option<usize>,
    /// Allow binding outside the loopback range.
    #[arg(long, action = ArgAction::SetTrue)]
    allow_non_loopback: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a user-facing message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("companion-sink {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = build_server_config(&command)?;
    let server =
        CompanionServer::from_config(config).map_err(|err| CliError::new(err.to_string()))?;
    server.serve().await.map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the server configuration from serve arguments.
fn build_server_config(command: &ServeCommand) -> CliResult<ServerConfig> {
    let defaults = ServerConfig::default();
    let bind = resolve_bind(command, defaults.bind)?;
    let allow_non_loopback = resolve_allow_non_loopback(
        command.allow_non_loopback,
        std::env::var(ALLOW_NON_LOOPBACK_ENV).ok().as_deref(),
    );
    match enforce_local_only(&bind, allow_non_loopback) {
        Ok(BindOutcome::Loopback) => {}
        Ok(BindOutcome::NonLoopbackAllowed) => {
            let _ = write_stderr_line(&format!(
                "companion-sink: WARNING: serving on non-loopback address {bind}; any \
                 reachable host can replace the output file"
            ));
        }
        Err(err) => return Err(CliError::new(err.to_string())),
    }
    Ok(ServerConfig {
        bind,
        output: command.output.clone().unwrap_or(defaults.output),
        max_body_bytes: command.max_body_bytes.unwrap_or(defaults.max_body_bytes),
        allow_non_loopback,
    })
}

/// Resolves the bind address from `--bind`, `--port`, or the default.
fn resolve_bind(command: &ServeCommand, default_bind: SocketAddr) -> CliResult<SocketAddr> {
    if let Some(bind) = command.bind.as_deref() {
        return bind
            .parse()
            .map_err(|_| CliError::new(format!("invalid bind address '{bind}'")));
    }
    if let Some(port) = command.port {
        return Ok(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    }
    Ok(default_bind)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("unable to write to {stream}: {error}")
}

/// Emits an error to stderr and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("companion-sink: error: {message}"));
    ExitCode::FAILURE
}
