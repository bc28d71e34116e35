// SPDX-FileCopyrightText: 2026 Tally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tally - a conversational expense tracker.
//!
//! This is the binary entry point: the webhook server, a local REPL that
//! talks to the same dialogue controller, and a configuration checker.

mod console;
mod serve;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_config::{ConfigError, TallyConfig};

/// Tally - a conversational expense tracker.
#[derive(Parser, Debug)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server.
    Serve,
    /// Talk to the bot from the terminal.
    Shell {
        /// Conversation id, so separate shells keep separate flows.
        #[arg(long, default_value = "local")]
        chat: String,
    },
    /// Validate the configuration and print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            tally_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.bot.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Shell { chat }) => {
            // Keep the prompt readable; RUST_LOG still wins.
            init_tracing("warn");
            shell::run_shell(config, chat).await
        }
        Some(Commands::CheckConfig) => {
            print!("{}", config_summary(&config));
            Ok(())
        }
        None => {
            println!("tally: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<TallyConfig, Vec<ConfigError>> {
    match path {
        Some(path) => tally_config::load_and_validate_path(path),
        None => tally_config::load_and_validate(),
    }
}

/// What `check-config` prints once the configuration validates.
fn config_summary(config: &TallyConfig) -> String {
    let on_off = |enabled: bool| if enabled { "enabled" } else { "disabled" };
    let telegram = config
        .telegram
        .bot_token
        .as_deref()
        .is_some_and(|t| !t.is_empty());
    let whatsapp =
        config.whatsapp.access_token.is_some() && config.whatsapp.phone_number_id.is_some();
    let providers: Vec<String> = config
        .intent
        .providers
        .iter()
        .filter(|p| p.enabled)
        .map(|p| format!("{:?}/{}", p.kind, p.model).to_lowercase())
        .collect();

    let mut out = String::from("configuration OK\n");
    out.push_str(&format!(
        "  gateway:   {}:{}\n",
        config.gateway.host, config.gateway.port
    ));
    out.push_str(&format!("  database:  {}\n", config.storage.database_path));
    out.push_str(&format!("  telegram:  {}\n", on_off(telegram)));
    out.push_str(&format!("  whatsapp:  {}\n", on_off(whatsapp)));
    if providers.is_empty() {
        out.push_str("  intent:    no providers (guided menus only)\n");
    } else {
        out.push_str(&format!("  intent:    {}\n", providers.join(", ")));
    }
    out.push_str(&format!("  media:     {}\n", on_off(config.media.enabled)));
    out
}

/// Installs the `fmt` subscriber. `RUST_LOG` overrides `log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tally={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["tally", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));

        let cli = Cli::try_parse_from(["tally", "shell", "--chat", "ana"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Shell { chat }) if chat == "ana"));

        let cli = Cli::try_parse_from(["tally", "--config", "/tmp/t.toml", "check-config"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/tmp/t.toml")));
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tally_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.bot.name, "tally");
    }

    #[test]
    fn summary_reports_channels_and_providers() {
        let config = tally_config::load_and_validate_str(
            r#"
            [telegram]
            bot_token = "123:abc"

            [[intent.providers]]
            kind = "anthropic"
            api_key = "k"
            model = "claude-haiku"
            "#,
        )
        .unwrap();

        let summary = config_summary(&config);
        assert!(summary.contains("telegram:  enabled"), "{summary}");
        assert!(summary.contains("whatsapp:  disabled"), "{summary}");
        assert!(summary.contains("anthropic/claude-haiku"), "{summary}");
        assert!(summary.contains("media:     disabled"), "{summary}");
    }

    #[test]
    fn summary_without_providers_mentions_guided_mode() {
        let config = tally_config::load_and_validate_str("").unwrap();
        assert!(config_summary(&config).contains("guided menus only"));
    }
}
