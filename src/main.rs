#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;

use clap::Parser;
use dicee_server::config;
use dicee_server::logging;
use dicee_server::server::AppState;
use dicee_server::websocket;

/// Dicee -- authoritative server core for an online multiplayer dice game
#[derive(Parser, Debug)]
#[command(name = "dicee-server")]
#[command(about = "Authoritative WebSocket server for room and lobby game state")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code defaults.
    let cfg = config::load();

    // Handle --print-config: output the loaded configuration as JSON
    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // Validate configuration security. Note: config::load() already calls
    // validate_config_security() but only logs errors to stderr and continues. Here we
    // capture the result to provide a proper exit code in --validate-config mode and to
    // fail startup in production if critical settings are missing.
    let validation_result = config::validate_config_security(&cfg);

    // Handle --validate-config: exit after validation
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Storage backend: InMemory");
                println!("  TLS enabled: {}", cfg.security.transport.tls.enabled);
                println!(
                    "  Metrics auth required: {}",
                    cfg.security.require_metrics_auth
                );
                println!("  WebSocket auth required: {}", cfg.security.require_websocket_auth);
                println!("  Max players per room: {}", cfg.room.max_players_ceiling);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    // In normal operation, propagate validation errors
    validation_result?;

    // Initialize logging from config.
    logging::init_with_config(&cfg.logging);

    let port: u16 = cfg.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "starting dicee server");

    #[cfg(feature = "tls")]
    if cfg.security.transport.tls.enabled {
        return run_tls(addr, cfg).await;
    }

    websocket::run_server(addr, cfg).await
}

#[cfg(feature = "tls")]
async fn run_tls(addr: SocketAddr, cfg: config::Config) -> anyhow::Result<()> {
    let tls = &cfg.security.transport.tls;
    let cert_path = tls
        .certificate_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("TLS enabled but certificate_path is not set"))?;
    let key_path = tls
        .private_key_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("TLS enabled but private_key_path is not set"))?;

    let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|err| anyhow::anyhow!("failed to load TLS certificate/key: {err}"))?;

    let cors_origins = cfg.security.cors_origins.clone();
    let state = AppState::new(cfg);
    let app = websocket::create_router(&cors_origins).with_state(state);

    tracing::info!(%addr, "server started over HTTPS with TLS enabled");

    axum_server::bind_rustls(addr, tls_config)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["dicee-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_long() {
        let cli = Cli::try_parse_from(["dicee-server", "--validate-config"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_short() {
        let cli = Cli::try_parse_from(["dicee-server", "-c"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["dicee-server", "--print-config"]).unwrap();
        assert!(!cli.validate_config);
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        // --validate-config and --print-config are mutually exclusive
        let result = Cli::try_parse_from(["dicee-server", "--validate-config", "--print-config"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot be used with"));
    }

    #[test]
    fn test_cli_help_contains_flags() {
        // Verify help text mentions our flags
        let result = Cli::try_parse_from(["dicee-server", "--help"]);
        assert!(result.is_err()); // --help causes early exit which is an "error"
        let err = result.unwrap_err();
        let help_text = err.to_string();
        assert!(help_text.contains("--validate-config"));
        assert!(help_text.contains("--print-config"));
        assert!(help_text.contains("-c"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["dicee-server", "--version"]);
        assert!(result.is_err()); // --version causes early exit
    }
}
