//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `libraryman_core` wiring.
//! - Open the configured database and report schema and member counts.
//! - Keep output deterministic for quick local sanity checks.

use libraryman_core::db::migrations::schema_version;
use libraryman_core::db::open_db;
use libraryman_core::{CoreConfig, MemberStore, SqliteMemberStore};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("libraryman_core ping={}", libraryman_core::ping());
    println!("libraryman_core version={}", libraryman_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_smoke module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::load().map_err(|err| format!("config: {err}"))?;
    libraryman_core::init_logging_with(&config.logging)?;

    let conn = open_db(&config.database.path).map_err(|err| format!("database: {err}"))?;
    let version = schema_version(&conn).map_err(|err| format!("schema: {err}"))?;
    let members = SqliteMemberStore::new(&conn)
        .count()
        .map_err(|err| format!("members: {err}"))?;

    println!("database path={}", config.database.path);
    println!("schema version={version}");
    println!("members count={members}");
    Ok(())
}
