// MIT License
// Copyright (c) 2024 Graham King

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AdminError, Result};
use crate::report::{FailurePolicy, Report};
use crate::session::{self, Session};
use crate::sql::{self, JarLocation};
use crate::vars::ADMIN_USER;

pub const DEFAULT_DATABASE: &str = "openai_client";
pub const DEFAULT_GRANTEE: &str = "demo_user";
pub const DEFAULT_JAR: &str = "openai.client-1.0.2.jar";

/// Absolute path of the JAR, which must exist locally.
/// A server-side JAR is taken as given.
pub fn locate_jar(jar: &Path, location: JarLocation) -> Result<PathBuf> {
    match location {
        JarLocation::Client => {
            fs::canonicalize(jar).map_err(|_| AdminError::FileNotFound(jar.to_path_buf()))
        }
        JarLocation::Server => Ok(jar.to_path_buf()),
    }
}

/// Create `database`, install the JAR into it and register CompleteChat.
/// Stops at the first failure. Nothing already done is undone, run
/// `uninstall` to clean up. Returns the PERM size used.
pub fn install(
    session: &mut dyn Session,
    database: &str,
    jar: &Path,
    location: JarLocation,
) -> Result<u64> {
    sql::check_name(database)?;

    let num_amps = session::query_u64(session, sql::COUNT_AMPS)?;
    let perm = sql::perm_size(num_amps)?;
    tracing::info!(num_amps, perm, database, "creating database");
    session.execute(&sql::create_database(database, perm))?;

    session.execute(&sql::set_database(database))?;
    session.execute(&sql::grant_create_procedure(database, ADMIN_USER))?;
    session.execute(&sql::grant_create_function(database, ADMIN_USER))?;
    tracing::info!(database, "database created and permissions granted");

    tracing::info!(jar = %jar.display(), "installing JAR");
    session.execute(&sql::install_jar(jar, location))?;

    tracing::info!(database, function = sql::FUNCTION_NAME, "creating function");
    session.execute(&sql::replace_function(database))?;

    Ok(perm)
}

/// Allow `grantee` to call CompleteChat in `database`
pub fn grant(session: &mut dyn Session, database: &str, grantee: &str) -> Result<()> {
    sql::check_name(database)?;
    sql::check_name(grantee)?;
    tracing::info!(database, grantee, "granting execution rights");
    session.execute(&sql::grant_execute(database, grantee))?;
    Ok(())
}

/// Drop the function, empty the database and drop it. Each step is tried
/// regardless of earlier failures.
pub fn uninstall(session: &mut dyn Session, database: &str) -> Result<Report> {
    sql::check_name(database)?;
    let mut report = Report::default();
    let steps = [
        ("drop function", sql::drop_function(database)),
        ("delete database contents", sql::delete_database(database)),
        ("drop database", sql::drop_database(database)),
    ];
    for (step, statement) in steps {
        tracing::info!(database, "{step}");
        let res = session.execute(&statement).map(|_| ());
        report.record(FailurePolicy::BestEffort, step, res)?;
    }
    Ok(report)
}
