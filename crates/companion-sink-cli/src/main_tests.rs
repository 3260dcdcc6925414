// companion-sink-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and config construction.
// Purpose: Ensure serve arguments resolve into a valid server configuration.
// Dependencies: companion-sink-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `build_server_config` and the clap surface: defaults, the
//! `--port`/`--bind` shorthand pair, and the fail-closed bind policy.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use clap::Parser;
use companion_sink_server::config::DEFAULT_MAX_BODY_BYTES;
use companion_sink_server::config::DEFAULT_OUTPUT_FILE;
use companion_sink_server::config::DEFAULT_PORT;

use super::Cli;
use super::Commands;
use super::ServeCommand;
use super::build_server_config;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn parse_serve(args: &[&str]) -> ServeCommand {
    let mut full = vec!["companion-sink", "serve"];
    full.extend_from_slice(args);
    let cli = Cli::try_parse_from(full).expect("parse args");
    match cli.command {
        Some(Commands::Serve(command)) => command,
        _ => panic!("expected serve command"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn serve_defaults_match_the_reference_invocation() {
    let command = parse_serve(&[]);
    let config = build_server_config(&command).expect("build config");
    assert_eq!(config.bind.port(), DEFAULT_PORT);
    assert!(config.bind.ip().is_loopback());
    assert_eq!(config.output, PathBuf::from(DEFAULT_OUTPUT_FILE));
    assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    assert!(!config.allow_non_loopback);
}

#[test]
fn port_shorthand_keeps_loopback_host() {
    let command = parse_serve(&["--port", "9000"]);
    let config = build_server_config(&command).expect("build config");
    assert_eq!(config.bind.port(), 9000);
    assert!(config.bind.ip().is_loopback());
}

#[test]
fn bind_takes_a_full_socket_address() {
    let command = parse_serve(&["--bind", "127.0.0.1:4000"]);
    let config = build_server_config(&command).expect("build config");
    assert_eq!(config.bind, "127.0.0.1:4000".parse().expect("socket addr"));
}

#[test]
fn bind_and_port_conflict() {
    let result =
        Cli::try_parse_from(["companion-sink", "serve", "--bind", "127.0.0.1:4000", "--port", "1"]);
    assert!(result.is_err());
}

#[test]
fn invalid_bind_is_a_usage_error() {
    let command = parse_serve(&["--bind", "not-an-address"]);
    let err = build_server_config(&command).expect_err("invalid bind");
    assert!(err.to_string().contains("invalid bind address"));
}

#[test]
fn non_loopback_bind_is_refused_without_flag() {
    let command = parse_serve(&["--bind", "0.0.0.0:12345"]);
    let err = build_server_config(&command).expect_err("non-loopback refused");
    assert!(err.to_string().contains("non-loopback"));
}

#[test]
fn non_loopback_bind_passes_with_flag() {
    let command = parse_serve(&["--bind", "0.0.0.0:12345", "--allow-non-loopback"]);
    let config = build_server_config(&command).expect("build config");
    assert!(config.allow_non_loopback);
}

#[test]
fn output_and_body_limit_flags_override_defaults() {
    let command = parse_serve(&["--output", "cases/in.txt", "--max-body-bytes", "2048"]);
    let config = build_server_config(&command).expect("build config");
    assert_eq!(config.output, PathBuf::from("cases/in.txt"));
    assert_eq!(config.max_body_bytes, 2048);
}
