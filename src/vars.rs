// MIT License
// Copyright (c) 2024 Graham King

use std::env;

use crate::error::{AdminError, Result};
use crate::sql;

pub const HOST: &str = "TD_HOST";
pub const USER: &str = "TD_USER";
pub const DBC_PASSWORD: &str = "TD_DBC_PASSWORD";
pub const USER_PASSWORD: &str = "TD_USER_PASSWORD";
pub const SYSTEM: &str = "TD_SYSTEM";
// Read by the installed function inside the database, never by us
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// The administrative principal is not configurable
pub const ADMIN_USER: &str = "dbc";

/// Which principal a workflow connects as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// `dbc`, for install, grant and uninstall
    Admin,
    /// The end user who owns the sample tables
    User,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub password: String,
}

// Keep the password out of logs and panics
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials from the process environment
    pub fn from_env(profile: Profile) -> Result<Credentials> {
        Credentials::resolve(profile, |name| env::var(name).ok())
    }

    /// Resolve credentials using `lookup` for each variable. Either every
    /// variable the profile needs is present and non-empty, or this fails
    /// naming all the missing ones.
    pub fn resolve<F>(profile: Profile, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required: &[&str] = match profile {
            Profile::Admin => &[HOST, DBC_PASSWORD],
            Profile::User => &[HOST, USER, USER_PASSWORD],
        };
        let mut found = Vec::with_capacity(required.len());
        let mut missing = Vec::new();
        for &name in required {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(v) => found.push(v),
                None => missing.push(name),
            }
        }
        if !missing.is_empty() {
            return Err(AdminError::Configuration(format!(
                "{} must be set as environment variables",
                missing.join(", ")
            )));
        }

        let mut found = found.into_iter();
        let host = found.next().unwrap_or_default();
        let creds = match profile {
            Profile::Admin => Credentials {
                host,
                user: ADMIN_USER.to_string(),
                password: found.next().unwrap_or_default(),
            },
            Profile::User => {
                let user = found.next().unwrap_or_default();
                sql::check_name(&user)?;
                Credentials {
                    host,
                    user,
                    password: found.next().unwrap_or_default(),
                }
            }
        };
        Ok(creds)
    }
}

/// Values for the `env` subcommand. Only the ones given are emitted.
#[derive(Debug, Default)]
pub struct Exports {
    pub host: Option<String>,
    pub user: Option<String>,
    pub dbc_password: Option<String>,
    pub user_password: Option<String>,
    pub openai_key: Option<String>,
}

impl Exports {
    /// Shell `export` lines, one per value, single-quoted.
    /// A child process can't change its parent's environment, so the
    /// operator runs `eval "$(completechat-admin env ...)"`.
    pub fn to_shell(&self) -> Vec<String> {
        [
            (HOST, &self.host),
            (USER, &self.user),
            (DBC_PASSWORD, &self.dbc_password),
            (USER_PASSWORD, &self.user_password),
            (OPENAI_API_KEY, &self.openai_key),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()
                .map(|v| format!("export {name}='{}'", v.replace('\'', r"'\''")))
        })
        .collect()
    }
}
