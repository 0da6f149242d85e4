//! Startup and the CLI transports.
//!
//! Startup merges configuration (file, then `BATON_*` environment, then
//! flags) and validates it before any command is read, so a misconfigured
//! service fails fast with a configuration error.

use crate::cli::{Cli, Command};
use crate::commands::{Reply, TokenService};
use crate::config::{Config, StoreBackend};
use crate::error::{BatonError, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Configuration-related command-line options.
#[derive(Debug, Default)]
pub struct ConfigFlags {
    pub config: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
    pub memory: bool,
}

impl From<&Cli> for ConfigFlags {
    fn from(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            store_dir: cli.store_dir.clone(),
            memory: cli.memory,
        }
    }
}

/// Build and validate the effective configuration.
pub fn resolve_config(flags: &ConfigFlags) -> Result<Config> {
    let mut config = base_config(flags)?;
    config.apply_env_overrides()?;
    finish_config(config, flags)
}

/// [`resolve_config`] with an explicit environment lookup.
pub fn resolve_config_with<F>(flags: &ConfigFlags, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = base_config(flags)?;
    config.apply_overrides_from(lookup)?;
    finish_config(config, flags)
}

fn base_config(flags: &ConfigFlags) -> Result<Config> {
    match &flags.config {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

/// Apply flag overrides on top of file and environment, then validate.
fn finish_config(mut config: Config, flags: &ConfigFlags) -> Result<Config> {
    if flags.memory {
        config.store.backend = StoreBackend::Memory;
    }
    if let Some(dir) = &flags.store_dir {
        config.store.backend = StoreBackend::File;
        config.store.dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Render a reply for output.
pub fn render(reply: &Reply, json: bool) -> String {
    if json {
        reply.to_json()
    } else {
        reply.text.clone()
    }
}

/// Run the parsed CLI.
pub fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&ConfigFlags::from(&cli))?;
    let service = TokenService::from_config(&config)?;
    info!(backend = ?config.store.backend, dir = ?config.store.dir, "token service ready");

    let stdout = std::io::stdout();
    match cli.command {
        Command::Exec(args) => {
            let reply = service.dispatch_text(&args.words.join(" "), &args.user)?;
            let mut out = stdout.lock();
            writeln!(out, "{}", render(&reply, cli.json))
                .map_err(|e| BatonError::UserError(format!("failed to write reply: {}", e)))
        }
        Command::Shell(args) => run_shell(
            &service,
            &args.user,
            cli.json,
            std::io::stdin().lock(),
            stdout.lock(),
        ),
    }
}

/// Dispatch every non-blank input line and write one reply per line.
///
/// A store failure on one line is reported on stderr and the loop moves
/// on to the next line; nothing is retried.
pub fn run_shell<R: BufRead, W: Write>(
    service: &TokenService,
    user: &str,
    json: bool,
    input: R,
    mut output: W,
) -> Result<()> {
    for line in input.lines() {
        let line =
            line.map_err(|e| BatonError::UserError(format!("failed to read input: {}", e)))?;
        if line.trim().is_empty() {
            continue;
        }

        match service.dispatch_text(&line, user) {
            Ok(reply) => writeln!(output, "{}", render(&reply, json))
                .map_err(|e| BatonError::UserError(format!("failed to write reply: {}", e)))?,
            Err(e) => {
                warn!(error = %e, "command failed");
                eprintln!("Error: {}", e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_STORE_DIR;
    use crate::config::ENV_STORE_BACKEND;
    use crate::store::MemoryStore;
    use serial_test::serial;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn memory_service() -> TokenService {
        TokenService::new(Arc::new(MemoryStore::new()), &Config::default())
    }

    #[test]
    fn missing_store_dir_fails_fast() {
        let err = resolve_config_with(&ConfigFlags::default(), no_env).unwrap_err();
        assert!(matches!(err, BatonError::ConfigError(_)));
    }

    #[test]
    fn memory_flag_needs_no_dir() {
        let flags = ConfigFlags {
            memory: true,
            ..ConfigFlags::default()
        };
        let config = resolve_config_with(&flags, no_env).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn store_dir_from_env() {
        let config = resolve_config_with(&ConfigFlags::default(), |key| {
            (key == ENV_STORE_DIR).then(|| "/srv/baton".to_string())
        })
        .unwrap();
        assert_eq!(config.store.dir, Some(PathBuf::from("/srv/baton")));
    }

    #[test]
    fn flags_override_file_and_env() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("baton.yaml");
        std::fs::write(&path, "store:\n  dir: /from/file\ncommand_prefix: /lock\n").unwrap();

        let flags = ConfigFlags {
            config: Some(path),
            store_dir: Some(PathBuf::from("/from/flag")),
            memory: false,
        };
        let config = resolve_config_with(&flags, |key| {
            (key == ENV_STORE_DIR).then(|| "/from/env".to_string())
        })
        .unwrap();

        assert_eq!(config.store.dir, Some(PathBuf::from("/from/flag")));
        assert_eq!(config.command_prefix, "/lock");
    }

    #[test]
    #[serial]
    fn resolve_config_reads_process_env() {
        // SAFETY: serialized with every other env-touching test
        unsafe {
            std::env::set_var(ENV_STORE_BACKEND, "memory");
            std::env::remove_var(ENV_STORE_DIR);
        }

        let result = resolve_config(&ConfigFlags::default());

        unsafe {
            std::env::remove_var(ENV_STORE_BACKEND);
        }

        let config = result.unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.dir, None);
    }

    #[test]
    fn render_text_and_json() {
        let reply = Reply::broadcast("Token t now held by bob.");
        assert_eq!(render(&reply, false), "Token t now held by bob.");
        assert!(render(&reply, true).contains(r#""response_type":"in_channel""#));
    }

    #[test]
    fn shell_answers_each_line() {
        let service = memory_service();
        let input = "create deploy-lock\n\nacquire deploy-lock\nshow deploy-lock\nfrobnicate\n";
        let mut output = Vec::new();

        run_shell(&service, "bob", false, input.as_bytes(), &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("created by bob"));
        assert!(lines[1].contains("now held by bob"));
        assert!(lines[2].contains("held by bob since"));
        assert_eq!(lines[3], "There is no such command: frobnicate");
    }

    #[test]
    fn shell_json_output() {
        let service = memory_service();
        let mut output = Vec::new();

        run_shell(&service, "bob", true, "show x\n".as_bytes(), &mut output).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(json["response_type"], "ephemeral");
        assert!(json["text"].as_str().unwrap().contains("does not exist"));
    }

    #[test]
    fn shares_state_across_processes_via_file_store() {
        let temp_dir = TempDir::new().unwrap();
        let flags = ConfigFlags {
            store_dir: Some(temp_dir.path().to_path_buf()),
            ..ConfigFlags::default()
        };
        let config = resolve_config_with(&flags, no_env).unwrap();

        let first = TokenService::from_config(&config).unwrap();
        let second = TokenService::from_config(&config).unwrap();

        first.dispatch_text("create t", "bob").unwrap();
        first.dispatch_text("acquire t", "bob").unwrap();
        let reply = second.dispatch_text("acquire t", "alice").unwrap();
        assert!(reply.text.contains("already in bob's possession"));
    }
}
