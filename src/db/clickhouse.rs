//! ClickHouse through the `clickhouse` driver.
//!
//! SELECTs are fetched as raw `JSONCompactEachRowWithNamesAndTypes` bytes,
//! which yields one JSON array per line: column names, column types, then
//! the rows. Inserts send `JSONCompactEachRow` data inline after the
//! statement.

use crate::db::client::{ClientOptions, QueryRows};
use crate::db::types::decode_clickhouse_value;
use crate::error::{IngestError, IngestResult};
use crate::models::{ConnectionConfig, Value};
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const RESULT_FORMAT: &str = "JSONCompactEachRowWithNamesAndTypes";

/// Session settings sent with every request. Decimals and 64-bit integers
/// come back as JSON strings so no digits are lost.
const SESSION_OPTIONS: &[(&str, &str)] = &[
    ("output_format_json_quote_decimals", "1"),
    ("output_format_json_quote_64bit_integers", "1"),
];

#[derive(Clone)]
pub struct ClickHouseClient {
    client: clickhouse::Client,
    endpoint: Url,
    database: String,
    user: String,
    options: ClientOptions,
}

impl ClickHouseClient {
    /// Build the driver client. No request is sent until `ping`.
    pub fn new(config: &ConnectionConfig, options: &ClientOptions) -> IngestResult<Self> {
        let endpoint = endpoint_url(config)?;

        let base = if config.secure && !config.verify {
            warn!(host = %config.host, "Certificate verification disabled for ClickHouse");
            insecure_client(options)?
        } else {
            clickhouse::Client::default()
        };

        let mut client = base
            .with_url(endpoint.as_str())
            .with_user(config.user.as_str())
            .with_database(config.database.as_str());
        if let Some(password) = &config.password {
            client = client.with_password(password.as_str());
        }
        for (name, value) in SESSION_OPTIONS {
            client = client.with_option(*name, *value);
        }

        Ok(Self {
            client,
            endpoint,
            database: config.database.clone(),
            user: config.user.clone(),
            options: *options,
        })
    }

    /// Database used for unqualified names.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub async fn ping(&self) -> IngestResult<()> {
        let select_one = self.client.query("SELECT 1").fetch_one::<u8>();
        match with_timeout(self.options.connect_timeout, select_one).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                let message = e.to_string();
                let suggestion = connection_suggestion(&message);
                Err(IngestError::connection(message, suggestion))
            }
            Err(elapsed) => Err(IngestError::connection(
                elapsed,
                "Check that the ClickHouse HTTP interface is reachable at host:port",
            )),
        }
    }

    /// Run a statement. `params` are bound server-side as `{name:Type}`
    /// placeholders and never interpolated.
    pub async fn query(&self, sql: &str, params: &[(&str, &str)]) -> IngestResult<QueryRows> {
        debug!(sql = %sql, "Executing ClickHouse query");

        let mut query = self.client.query(&driver_sql(sql));
        for (name, value) in params {
            query = query.param(name, *value);
        }

        let fetch = async {
            let mut cursor = query
                .fetch_bytes(RESULT_FORMAT)
                .map_err(|e| IngestError::query(e.to_string()))?;
            let mut body = Vec::new();
            while let Some(chunk) = cursor
                .next()
                .await
                .map_err(|e| IngestError::query(e.to_string()))?
            {
                body.extend_from_slice(&chunk);
            }
            Ok::<_, IngestError>(body)
        };

        let body = with_timeout(self.options.query_timeout, fetch)
            .await
            .map_err(IngestError::query)??;
        let body = String::from_utf8(body)
            .map_err(|e| IngestError::query(format!("Response is not valid UTF-8: {}", e)))?;
        parse_compact_response(&body)
    }

    /// Append rows with a single INSERT request.
    pub async fn insert(&self, table: &str, columns: &[String], rows: &[Vec<Value>]) -> IngestResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let statement = format!(
            "INSERT INTO {} ({}) FORMAT JSONCompactEachRow",
            table,
            columns.join(", ")
        );
        debug!(sql = %statement, rows = rows.len(), "Executing ClickHouse insert");

        let sql = format!("{}\n{}", statement, build_insert_body(rows));
        let execute = self.client.query(&escape_placeholders(&sql)).execute();
        with_timeout(self.options.query_timeout, execute)
            .await
            .map_err(|e| IngestError::insert(table, e))?
            .map_err(|e| IngestError::insert(table, e.to_string()))
    }
}

impl std::fmt::Debug for ClickHouseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("database", &self.database)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Driver client over a TLS connector that accepts any certificate.
fn insecure_client(options: &ClientOptions) -> IngestResult<clickhouse::Client> {
    let tls = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| {
            IngestError::connection(
                format!("Failed to build TLS connector: {}", e),
                "Check the TLS settings (secure/verify)",
            )
        })?;

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(options.connect_timeout));
    let connector = hyper_tls::HttpsConnector::from((http, tokio_native_tls::TlsConnector::from(tls)));

    let http_client = HyperClient::builder(TokioExecutor::new()).build(connector);
    Ok(clickhouse::Client::with_http_client(http_client))
}

async fn with_timeout<F: Future>(limit: Duration, fut: F) -> Result<F::Output, String> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| format!("Timed out after {}s", limit.as_secs()))
}

/// The driver treats `?` as a bind placeholder; `??` is a literal `?`.
fn escape_placeholders(sql: &str) -> String {
    sql.replace('?', "??")
}

/// The driver appends its own `FORMAT` clause, so a trailing `;` must go.
fn driver_sql(sql: &str) -> String {
    escape_placeholders(sql.trim().trim_end_matches(';').trim_end())
}

/// `http(s)://host:port/`, with IPv6 literals bracketed.
fn endpoint_url(config: &ConnectionConfig) -> IngestResult<Url> {
    let scheme = if config.secure { "https" } else { "http" };
    let host = if config.host.contains(':') {
        format!("[{}]", config.host)
    } else {
        config.host.clone()
    };
    let raw = format!("{}://{}:{}/", scheme, host, config.port);
    Url::parse(&raw).map_err(|e| {
        IngestError::connection(
            format!("Invalid ClickHouse address '{}': {}", raw, e),
            "Provide a bare host name such as 'localhost' and a numeric port",
        )
    })
}

/// Parse a `JSONCompactEachRowWithNamesAndTypes` body.
///
/// An empty body (statements without a result set) yields no columns and no rows.
pub fn parse_compact_response(body: &str) -> IngestResult<QueryRows> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());

    let Some(names_line) = lines.next() else {
        return Ok(QueryRows::default());
    };
    let columns: Vec<String> = parse_line(names_line)?;
    let types: Vec<String> = match lines.next() {
        Some(line) => parse_line(line)?,
        None => return Err(IngestError::query("Response is missing the column types line")),
    };
    if types.len() != columns.len() {
        return Err(IngestError::query(format!(
            "Response has {} column names but {} types",
            columns.len(),
            types.len()
        )));
    }

    let mut rows = Vec::new();
    for line in lines {
        let cells: Vec<JsonValue> = parse_line(line)?;
        if cells.len() != columns.len() {
            return Err(IngestError::query(format!(
                "Row has {} cells, expected {}",
                cells.len(),
                columns.len()
            )));
        }
        rows.push(
            cells
                .iter()
                .zip(&types)
                .map(|(cell, type_name)| decode_clickhouse_value(cell, type_name))
                .collect(),
        );
    }

    Ok(QueryRows::new(columns, rows))
}

fn parse_line<T: serde::de::DeserializeOwned>(line: &str) -> IngestResult<T> {
    serde_json::from_str(line).map_err(|e| {
        // The server reports failures that happen mid-stream inline
        if line.contains("DB::Exception") {
            IngestError::query(line.trim())
        } else {
            IngestError::query(format!("Unexpected response line: {}", e))
        }
    })
}

/// One JSON array per row, newline separated.
pub fn build_insert_body(rows: &[Vec<Value>]) -> String {
    let mut body = String::new();
    for row in rows {
        let cells: Vec<JsonValue> = row.iter().map(Value::to_json).collect();
        body.push_str(&JsonValue::Array(cells).to_string());
        body.push('\n');
    }
    body
}

fn connection_suggestion(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("authentication") || lower.contains("password") || lower.contains("401") {
        "Verify the user and password"
    } else if lower.contains("unknown_database")
        || (lower.contains("database") && lower.contains("doesn't exist"))
    {
        "Check that the database name exists"
    } else if lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl") {
        "Check the secure/verify settings, or set verify=false for self-signed certificates"
    } else {
        "Check that the ClickHouse HTTP interface is reachable at host:port"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_compact_response() {
        let body = "[\"id\",\"date\",\"name\"]\n\
                    [\"UInt64\",\"Date\",\"Nullable(String)\"]\n\
                    [\"1\",\"2023-01-01\",\"a\"]\n\
                    [\"2\",\"2023-02-15\",null]\n";
        let result = parse_compact_response(body).unwrap();
        assert_eq!(result.columns, vec!["id", "date", "name"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0][0], Value::UInt(1));
        assert_eq!(
            result.rows[1][1],
            Value::Date(NaiveDate::from_ymd_opt(2023, 2, 15).unwrap())
        );
        assert_eq!(result.rows[1][2], Value::Null);
    }

    #[test]
    fn test_parse_decimal_column_keeps_exact_digits() {
        let body = "[\"amount\"]\n\
                    [\"Decimal(38, 2)\"]\n\
                    [\"12345678901234567.89\"]\n\
                    [\"0.10\"]\n";
        let result = parse_compact_response(body).unwrap();
        assert_eq!(
            serde_json::to_string(&result.rows).unwrap(),
            r#"[["12345678901234567.89"],["0.10"]]"#
        );
    }

    #[test]
    fn test_session_options_quote_wide_numbers() {
        assert!(SESSION_OPTIONS.contains(&("output_format_json_quote_decimals", "1")));
        assert!(SESSION_OPTIONS.contains(&("output_format_json_quote_64bit_integers", "1")));
    }

    #[test]
    fn test_driver_sql_escapes_placeholders() {
        assert_eq!(
            driver_sql("SELECT * FROM t WHERE s = 'why?';\n"),
            "SELECT * FROM t WHERE s = 'why??'"
        );
        assert_eq!(escape_placeholders("[\"a?\"]"), "[\"a??\"]");
    }

    #[tokio::test]
    async fn test_new_does_not_connect() {
        let mut config = ConnectionConfig::clickhouse("localhost", 8443, "default")
            .with_credentials("alice", Some("secret".to_string()));
        config.secure = true;
        config.verify = false;
        let client = ClickHouseClient::new(&config, &ClientOptions::default()).unwrap();
        assert_eq!(client.database(), "default");
        let debug = format!("{:?}", client);
        assert!(debug.contains("https://localhost:8443/"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_parse_empty_result_keeps_columns() {
        let body = "[\"a\"]\n[\"Int32\"]\n";
        let result = parse_compact_response(body).unwrap();
        assert_eq!(result.columns, vec!["a"]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_empty_body() {
        let result = parse_compact_response("").unwrap();
        assert!(result.columns.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_inline_exception() {
        let body = "[\"a\"]\n[\"Int32\"]\n[1]\nCode: 241. DB::Exception: Memory limit exceeded\n";
        let err = parse_compact_response(body).unwrap_err();
        match err {
            IngestError::Query { message } => assert!(message.contains("Memory limit")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_ragged_rows() {
        let body = "[\"a\",\"b\"]\n[\"Int32\",\"Int32\"]\n[1]\n";
        assert!(matches!(
            parse_compact_response(body),
            Err(IngestError::Query { .. })
        ));
    }

    #[test]
    fn test_build_insert_body() {
        let rows = vec![
            vec![
                Value::Int(1),
                Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
            ],
            vec![Value::Int(2), Value::Null],
        ];
        assert_eq!(
            build_insert_body(&rows),
            "[1,\"2023-01-01\"]\n[2,null]\n"
        );
    }

    #[test]
    fn test_endpoint_url() {
        let mut config = ConnectionConfig::clickhouse("localhost", 8443, "default");
        config.secure = true;
        assert_eq!(
            endpoint_url(&config).unwrap().as_str(),
            "https://localhost:8443/"
        );

        let config = ConnectionConfig::clickhouse("::1", 8123, "default");
        assert_eq!(endpoint_url(&config).unwrap().as_str(), "http://[::1]:8123/");

        let config = ConnectionConfig::clickhouse("", 8123, "default");
        assert!(matches!(
            endpoint_url(&config),
            Err(IngestError::Connection { .. })
        ));
    }

    #[test]
    fn test_connection_suggestion() {
        assert_eq!(
            connection_suggestion("HTTP 401: Authentication failed"),
            "Verify the user and password"
        );
        assert!(connection_suggestion("connection refused").contains("reachable"));
    }
}
