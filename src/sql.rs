// MIT License
// Copyright (c) 2024 Graham King

// Every statement we send to the database is built here.
// Names are interpolated, so they must pass `check_name` first.

use std::path::Path;

use crate::error::{AdminError, Result};

pub const FUNCTION_NAME: &str = "CompleteChat";
pub const JAR_ID: &str = "OPENAI_CLIENT";
pub const SAMPLE_TABLE_PREFIX: &str = "input_";

// Bytes of PERM space per AMP
pub const PERM_PER_AMP: u64 = 8_000_000;

const MAX_NAME_LEN: usize = 128;

pub const COUNT_AMPS: &str = "SELECT HASHAMP()+1 AS num_amps";

/// Teradata object names: letters, digits, `_`, `$` and `#`, not leading with a digit
pub fn check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'));
    if valid {
        Ok(())
    } else {
        Err(AdminError::Configuration(format!(
            "'{name}' is not a valid object name"
        )))
    }
}

pub fn perm_size(num_amps: u64) -> Result<u64> {
    PERM_PER_AMP.checked_mul(num_amps).ok_or_else(|| {
        AdminError::statement(
            COUNT_AMPS,
            format!("{num_amps} AMPs overflows the PERM size"),
        )
    })
}

pub fn create_database(db: &str, perm: u64) -> String {
    format!("CREATE DATABASE {db} AS PERM = {perm}")
}

pub fn set_database(db: &str) -> String {
    format!("DATABASE {db}")
}

pub fn grant_create_procedure(db: &str, user: &str) -> String {
    format!("GRANT CREATE EXTERNAL PROCEDURE ON {db} TO {user}")
}

pub fn grant_create_function(db: &str, user: &str) -> String {
    format!("GRANT CREATE FUNCTION ON {db} TO {user}")
}

/// Where the engine should read the JAR from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JarLocation {
    /// Uploaded from this machine
    Client,
    /// Already on the database node
    Server,
}

pub fn install_jar(jar: &Path, location: JarLocation) -> String {
    let prefix = match location {
        JarLocation::Client => "cj",
        JarLocation::Server => "sj",
    };
    let path = jar.display().to_string().replace('\'', "''");
    format!("CALL SQLJ.INSTALL_JAR('{prefix}!{path}', '{JAR_ID}', 0)")
}

pub fn replace_function(db: &str) -> String {
    format!(
        r#"
REPLACE FUNCTION {db}.{FUNCTION_NAME}()
RETURNS TABLE VARYING USING FUNCTION OpenAIClientTO_contract
LANGUAGE JAVA
NO SQL
PARAMETER STYLE SQLTable
EXTERNAL NAME '{JAR_ID}:com.teradata.openai.client.OpenAIClientTO.execute()'
"#
    )
}

pub fn grant_execute(db: &str, to: &str) -> String {
    format!("GRANT EXECUTE FUNCTION ON {db}.{FUNCTION_NAME} TO {to}")
}

pub fn drop_function(db: &str) -> String {
    format!("DROP FUNCTION {db}.{FUNCTION_NAME}")
}

// Teradata won't drop a database that still holds objects
pub fn delete_database(db: &str) -> String {
    format!("DELETE DATABASE {db}")
}

pub fn drop_database(db: &str) -> String {
    format!("DROP DATABASE {db}")
}

pub fn sample_table(category: &str) -> String {
    format!("{SAMPLE_TABLE_PREFIX}{category}")
}

pub fn create_sample_table(owner: &str, table: &str) -> String {
    format!(
        r#"
CREATE TABLE {owner}.{table} (
    row_id INTEGER,
    txt VARCHAR(5000) CHARACTER SET UNICODE
)
PRIMARY INDEX (row_id)
"#
    )
}

pub fn insert_sample_row(owner: &str, table: &str) -> String {
    format!("INSERT INTO {owner}.{table} (row_id, txt) VALUES (?, ?)")
}

pub fn drop_table(owner: &str, table: &str) -> String {
    format!("DROP TABLE {owner}.{table}")
}
