// MIT License
// Copyright (c) 2024 Graham King

use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod error;
mod install;
mod query_service;
mod report;
mod sample_data;
mod session;
mod sql;
mod vars;

use query_service::{Endpoint, QueryService};
use report::{FailurePolicy, Report};
use vars::{Credentials, Profile};

#[derive(Parser)]
struct Cli {
    /// Query Service port on the database host
    #[arg(long, default_value_t = query_service::DEFAULT_PORT)]
    port: u16,

    /// Query Service system alias. Defaults to $TD_SYSTEM, then "local"
    #[arg(long)]
    system: Option<String>,

    /// Accept a self-signed certificate
    #[clap(long)]
    insecure: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database, install the JAR and register CompleteChat. Connects as dbc.
    Install {
        #[arg(long, default_value = install::DEFAULT_DATABASE)]
        database: String,
        /// The openai.client JAR
        #[arg(long, value_name = "PATH", default_value = install::DEFAULT_JAR)]
        jar: PathBuf,
        /// The JAR path is on the database server, don't upload it
        #[clap(long)]
        server_side_jar: bool,
    },

    /// Let a user call CompleteChat. Connects as dbc.
    Grant {
        #[arg(long, default_value = install::DEFAULT_DATABASE)]
        database: String,
        /// User or database to grant to
        #[arg(long, default_value = install::DEFAULT_GRANTEE)]
        to: String,
    },

    /// Drop CompleteChat and its database. Keeps going past failures.
    Uninstall {
        #[arg(long, default_value = install::DEFAULT_DATABASE)]
        database: String,
    },

    /// Create one input_<category> table per category in the sample file and fill it.
    /// Connects as $TD_USER.
    LoadSamples {
        #[arg(long, value_name = "PATH", default_value = sample_data::DEFAULT_DATA)]
        data: PathBuf,
        /// Carry on with the other categories when one fails
        #[clap(long)]
        keep_going: bool,
    },

    /// Drop the tables created by load-samples. Connects as $TD_USER.
    RemoveSamples {
        #[arg(long, value_name = "PATH", default_value = sample_data::DEFAULT_DATA)]
        data: PathBuf,
        /// Stop at the first table that can't be dropped
        #[clap(long)]
        strict: bool,
    },

    /// Print shell export lines for the connection variables.
    /// Use as: eval "$(completechat-admin env --host ...)"
    Env {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        dbc_password: Option<String>,
        #[arg(long)]
        user_password: Option<String>,
        /// Used by CompleteChat inside the database, not by this tool
        #[arg(long)]
        openai_key: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let ansi = std::io::stderr().is_terminal() && env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reqwest=warn,hyper=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    check_names(&cli.command)?;
    let endpoint = Endpoint {
        port: cli.port,
        system: cli
            .system
            .or_else(|| env::var(vars::SYSTEM).ok())
            .unwrap_or_else(|| query_service::DEFAULT_SYSTEM.to_string()),
        accept_invalid_certs: cli.insecure,
    };

    match cli.command {
        Commands::Install {
            database,
            jar,
            server_side_jar,
        } => {
            let location = if server_side_jar {
                sql::JarLocation::Server
            } else {
                sql::JarLocation::Client
            };
            let creds = Credentials::from_env(Profile::Admin)?;
            let jar = install::locate_jar(&jar, location)?;
            let mut session = QueryService::connect(&creds, &endpoint)?;
            let perm = install::install(&mut session, &database, &jar, location)
                .with_context(|| format!("installing CompleteChat into {database}"))?;
            println!("\nCompleteChat installed in {database} (PERM = {perm})");
        }
        Commands::Grant { database, to } => {
            let creds = Credentials::from_env(Profile::Admin)?;
            let mut session = QueryService::connect(&creds, &endpoint)?;
            install::grant(&mut session, &database, &to)
                .with_context(|| format!("granting {database}.CompleteChat to {to}"))?;
            println!("Execution rights granted to {to}");
        }
        Commands::Uninstall { database } => {
            let creds = Credentials::from_env(Profile::Admin)?;
            let mut session = QueryService::connect(&creds, &endpoint)?;
            let report = install::uninstall(&mut session, &database)?;
            print_warnings(&report);
            println!("\nUninstallation complete!");
        }
        Commands::LoadSamples { data, keep_going } => {
            let creds = Credentials::from_env(Profile::User)?;
            let samples = sample_data::SampleData::load(&data)?;
            let policy = if keep_going {
                FailurePolicy::BestEffort
            } else {
                FailurePolicy::FailFast
            };
            let mut session = QueryService::connect(&creds, &endpoint)?;
            let report = sample_data::load(&mut session, &creds.user, &samples, policy)
                .with_context(|| format!("loading {}", data.display()))?;
            print_warnings(&report);
            if report.succeeded.is_empty() {
                println!("\nNo tables were created");
            } else {
                println!("\nTables created: {}", report.succeeded.join(", "));
            }
        }
        Commands::RemoveSamples { data, strict } => {
            let creds = Credentials::from_env(Profile::User)?;
            let samples = sample_data::SampleData::load(&data)?;
            let policy = if strict {
                FailurePolicy::FailFast
            } else {
                FailurePolicy::BestEffort
            };
            let mut session = QueryService::connect(&creds, &endpoint)?;
            let report = sample_data::remove(&mut session, &creds.user, &samples, policy)?;
            print_warnings(&report);
            if report.succeeded.is_empty() {
                println!("\nNo tables were removed");
            } else {
                println!("\nTables removed: {}", report.succeeded.join(", "));
            }
        }
        Commands::Env {
            host,
            user,
            dbc_password,
            user_password,
            openai_key,
        } => {
            let exports = vars::Exports {
                host,
                user,
                dbc_password,
                user_password,
                openai_key,
            };
            for line in exports.to_shell() {
                println!("{line}");
            }
        }
    }
    Ok(())
}

// Names end up in statements, so reject bad ones before connecting
fn check_names(command: &Commands) -> error::Result<()> {
    match command {
        Commands::Install { database, .. } | Commands::Uninstall { database } => {
            sql::check_name(database)
        }
        Commands::Grant { database, to } => {
            sql::check_name(database)?;
            sql::check_name(to)
        }
        Commands::LoadSamples { .. } | Commands::RemoveSamples { .. } | Commands::Env { .. } => {
            Ok(())
        }
    }
}

fn print_warnings(report: &Report) {
    if report.is_clean() {
        return;
    }
    println!();
    for (step, diagnostic) in &report.warnings {
        println!("Warning: {step}: {diagnostic}");
    }
}
