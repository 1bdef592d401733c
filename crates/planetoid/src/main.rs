//! # planetoid
//!
//! Planetoid server binary: loads settings, opens the game/player database
//! and serves the REST endpoints plus the `/gamedata/{username}` channel.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use planetoid_server::{PlanetoidServer, ServerConfig};
use planetoid_settings::{DatabaseSettings, PlanetoidSettings};
use planetoid_store::{ConnectionConfig, ConnectionPool};
use tracing::{info, warn};

/// Planetoid game-data server.
#[derive(Parser, Debug)]
#[command(name = "planetoid", about = "Planetoid game-data server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// `SQLite` database file. Without one, data lives in memory.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (default `~/.planetoid/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level directive, e.g. `debug` (`RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Layer command-line flags over loaded settings.
    fn apply(&self, settings: &mut PlanetoidSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref path) = self.db_path {
            settings.database.path = Some(path.to_string_lossy().into_owned());
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Open (or create) the database and bring its schema up to date.
fn open_database(settings: &DatabaseSettings) -> Result<ConnectionPool> {
    let config = ConnectionConfig {
        pool_size: settings.pool_size,
        busy_timeout_ms: settings.busy_timeout_ms,
    };
    let pool = match settings.path {
        Some(ref path) => {
            ensure_parent_dir(Path::new(path))?;
            planetoid_store::new_file(path, &config)
                .with_context(|| format!("Failed to open database: {path}"))?
        }
        None => {
            warn!("no database path configured, games and players are kept in memory");
            planetoid_store::new_in_memory(&config).context("Failed to open in-memory database")?
        }
    };
    {
        let conn = pool.get().context("Failed to get DB connection")?;
        let applied =
            planetoid_store::run_migrations(&conn).context("Failed to run migrations")?;
        info!(applied, "database ready");
    }
    Ok(pool)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(planetoid_settings::settings_path);
    let mut settings = planetoid_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings: {}", settings_path.display()))?;
    args.apply(&mut settings);

    let _ = planetoid_logging::init_subscriber(&settings.logging);

    let pool = open_database(&settings.database)?;

    let mut server = PlanetoidServer::new(ServerConfig::from(&settings.server), pool);
    match planetoid_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => warn!(error = %e, "metrics recorder unavailable, /metrics disabled"),
    }

    let (addr, serve_task) = server.listen().await.context("Failed to start server")?;
    info!(%addr, "planetoid ready");

    server.shutdown().wait_for_signal().await;
    server
        .shutdown()
        .graceful_shutdown(vec![serve_task], None)
        .await;
    info!("planetoid stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_leave_settings_untouched() {
        let cli = Cli::try_parse_from(["planetoid"]).unwrap();
        let mut settings = PlanetoidSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert!(settings.database.path.is_none());
        assert!(!settings.logging.json);
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "planetoid",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--db-path",
            "/tmp/planetoid.db",
            "--log-level",
            "debug",
            "--json-logs",
        ])
        .unwrap();
        let mut settings = PlanetoidSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.database.path.as_deref(), Some("/tmp/planetoid.db"));
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["planetoid", "--port", "70000"]).is_err());
    }

    #[test]
    fn open_file_database_creates_parent_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("planetoid.db");
        let settings = DatabaseSettings {
            path: Some(path.to_string_lossy().into_owned()),
            ..DatabaseSettings::default()
        };
        let pool = open_database(&settings).unwrap();
        assert!(path.exists());

        let conn = pool.get().unwrap();
        let player = planetoid_store::PlayerRepo::create(&conn, "toto").unwrap();
        assert_eq!(player.name, "toto");
    }

    #[test]
    fn open_in_memory_database() {
        let pool = open_database(&DatabaseSettings::default()).unwrap();
        let conn = pool.get().unwrap();
        assert!(planetoid_store::PlayerRepo::names(&conn).unwrap().is_empty());
    }
}
