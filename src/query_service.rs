// MIT License
// Copyright (c) 2024 Graham King

use std::path::Path;

use crate::error::{AdminError, Result};
use crate::session::{self, Row, Session};
use crate::vars::Credentials;

pub const DEFAULT_PORT: u16 = 1443;
pub const DEFAULT_SYSTEM: &str = "local";

/// Where the Teradata Query Service listens
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub port: u16,
    /// The system alias configured in Query Service
    pub system: String,
    /// For appliances with a self-signed certificate
    pub accept_invalid_certs: bool,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    auto_commit: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    session_id: u64,
}

#[derive(Debug, serde::Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    session: u64,
    format: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<Row>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    batch: bool,
}

#[derive(Debug, serde::Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<ResultSet>,
}

#[derive(Debug, serde::Deserialize)]
struct ResultSet {
    #[serde(default)]
    data: Vec<Row>,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorResponse {
    message: String,
}

/// A session on the Query Service REST API, over HTTPS.
/// The server side session is closed when this is dropped.
pub struct QueryService {
    client: reqwest::blocking::Client,
    base_url: String,
    creds: Credentials,
    session_id: u64,
}

impl QueryService {
    pub fn connect(creds: &Credentials, endpoint: &Endpoint) -> Result<QueryService> {
        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(endpoint.accept_invalid_certs)
            .build()
            .map_err(|e| AdminError::Connection(e.to_string()))?;
        let base_url = format!(
            "https://{}:{}/systems/{}",
            creds.host, endpoint.port, endpoint.system
        );

        let res = client
            .post(format!("{base_url}/sessions"))
            .basic_auth(&creds.user, Some(&creds.password))
            .json(&SessionRequest { auto_commit: true })
            .send()
            .map_err(|e| AdminError::Connection(format!("{}: {e}", creds.host)))?;
        if !matches!(
            res.status(),
            http::StatusCode::OK | http::StatusCode::CREATED
        ) {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(AdminError::Connection(format!(
                "HTTP error {status} opening session: {}",
                error_message(status, &body)
            )));
        }
        let out: SessionResponse = res
            .json()
            .map_err(|e| AdminError::Connection(e.to_string()))?;
        tracing::debug!(host = %creds.host, user = %creds.user, session = out.session_id, "session opened");

        Ok(QueryService {
            client,
            base_url,
            creds: creds.clone(),
            session_id: out.session_id,
        })
    }

    fn submit(&self, req: &QueryRequest) -> Result<Vec<ResultSet>> {
        let res = self
            .client
            .post(format!("{}/queries", self.base_url))
            .basic_auth(&self.creds.user, Some(&self.creds.password))
            .json(req)
            .send()
            .map_err(|e| AdminError::Connection(e.to_string()))?;
        if res.status() != http::StatusCode::OK {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(AdminError::statement(req.query, error_message(status, &body)));
        }
        let out: QueryResponse = res
            .json()
            .map_err(|e| AdminError::Connection(e.to_string()))?;
        Ok(out.results)
    }
}

impl Session for QueryService {
    fn execute(&mut self, statement: &str) -> Result<Vec<Row>> {
        let results = self.submit(&QueryRequest {
            query: statement,
            session: self.session_id,
            format: "array",
            params: Vec::new(),
            batch: false,
        })?;
        Ok(results.into_iter().flat_map(|r| r.data).collect())
    }

    fn bulk_load(&mut self, insert: &str, csv_path: &Path) -> Result<u64> {
        let params = session::read_sample_rows(csv_path)?;
        if params.is_empty() {
            return Ok(0);
        }
        let count = params.len() as u64;
        self.submit(&QueryRequest {
            query: insert,
            session: self.session_id,
            format: "array",
            params,
            batch: true,
        })?;
        Ok(count)
    }
}

impl Drop for QueryService {
    fn drop(&mut self) {
        let res = self
            .client
            .delete(format!("{}/sessions/{}", self.base_url, self.session_id))
            .basic_auth(&self.creds.user, Some(&self.creds.password))
            .send();
        match res {
            Ok(r) if r.status().is_success() => {
                tracing::debug!(session = self.session_id, "session closed");
            }
            Ok(r) => tracing::warn!(session = self.session_id, status = %r.status(), "closing session"),
            Err(err) => tracing::warn!(session = self.session_id, %err, "closing session"),
        }
    }
}

// The engine's diagnostic if the body has one, else whatever the body is
fn error_message(status: http::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(e) => e.message,
        Err(_) if body.trim().is_empty() => format!("HTTP error {status}"),
        Err(_) => body.to_string(),
    }
}
