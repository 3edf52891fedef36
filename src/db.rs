use async_trait::async_trait;
use log::{debug, info, warn};
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use std::time::Duration;

use crate::dsn;
use crate::error::RunError;
use crate::registry::{Backend, Session};

pub struct MySqlBackend;

#[async_trait]
impl Backend for MySqlBackend {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn open(&self, descriptor: &str) -> Result<Box<dyn Session>, RunError> {
        let target = dsn::connect_target(descriptor)?;

        info!("Connecting to {}", dsn::redact(descriptor));
        let connecting = target.options.connect();
        let connected = match target.timeout {
            Some(limit) => tokio::time::timeout(limit, connecting)
                .await
                .unwrap_or_else(|_| Err(timed_out(limit))),
            None => connecting.await,
        };
        let mut conn = connected.map_err(|e| {
            debug!("Connection attempt failed: {e:?}");
            RunError::ConnectionError(e)
        })?;
        info!("Successfully connected to MySQL database");

        if let Some(statement) = target.init_statement() {
            debug!("Applying session variables: {statement}");
            if let Err(e) = Executor::execute(&mut conn, statement.as_str()).await {
                close_after_setup_failure(conn).await;
                return Err(RunError::ConnectionError(e));
            }
        }

        Ok(Box::new(MySqlSession { conn }))
    }
}

fn timed_out(limit: Duration) -> sqlx::Error {
    sqlx::Error::Io(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("connection not established within {limit:?}"),
    ))
}

async fn close_after_setup_failure(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close connection after session setup error: {e}");
    }
}

/// A single MySQL connection, never shared or pooled.
pub struct MySqlSession {
    conn: MySqlConnection,
}

#[async_trait]
impl Session for MySqlSession {
    async fn query_scalar(&mut self, query: &str) -> Result<String, RunError> {
        debug!("Executing query: {query}");

        // A bare &str goes over the text protocol, so every column arrives as
        // the server's own textual rendering.
        let row = Executor::fetch_optional(&mut self.conn, query).await?;

        scan_text(&require_row(row)?)
    }

    async fn close(self: Box<Self>) -> Result<(), RunError> {
        debug!("Closing MySQL connection");
        self.conn.close().await.map_err(RunError::CloseError)
    }
}

/// Scans a row that must hold exactly one non-NULL column.
fn scan_text(row: &MySqlRow) -> Result<String, RunError> {
    require_single_column(row.len())?;
    let raw: Option<Vec<u8>> = row.try_get_unchecked(0)?;
    text_value(raw)
}

fn require_row<R>(row: Option<R>) -> Result<R, RunError> {
    row.ok_or(RunError::NoRows)
}

/// Extra columns are an error rather than being dropped.
fn require_single_column(columns: usize) -> Result<(), RunError> {
    match columns {
        1 => Ok(()),
        n => Err(RunError::ColumnCount(n)),
    }
}

fn text_value(raw: Option<Vec<u8>>) -> Result<String, RunError> {
    let bytes = raw.ok_or(RunError::NullValue)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!("Result value is not valid UTF-8; invalid bytes were replaced");
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_value() {
        assert_eq!(text_value(Some(b"1.50".to_vec())).unwrap(), "1.50");
        assert_eq!(text_value(Some(Vec::new())).unwrap(), "");
        assert!(matches!(text_value(None), Err(RunError::NullValue)));
    }

    #[test]
    fn test_missing_row_is_no_rows() {
        assert!(matches!(require_row::<()>(None), Err(RunError::NoRows)));
        assert_eq!(require_row(Some(7)).unwrap(), 7);
    }

    #[test]
    fn test_column_count_must_be_one() {
        assert!(require_single_column(1).is_ok());
        assert!(matches!(require_single_column(0), Err(RunError::ColumnCount(0))));
        assert!(matches!(require_single_column(2), Err(RunError::ColumnCount(2))));
    }

    #[test]
    fn test_text_value_replaces_invalid_utf8() {
        let value = text_value(Some(vec![b'o', b'k', 0xff])).unwrap();
        assert_eq!(value, "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_open_rejects_malformed_descriptor() {
        let result = MySqlBackend.open("root@tcp(127.0.0.1:3306)").await;
        assert!(matches!(result, Err(RunError::InvalidDescriptor(_))));
    }

    #[tokio::test]
    async fn test_open_times_out() {
        // 10.255.255.1 is non-routable, so the dial hangs until the timeout.
        let started = std::time::Instant::now();
        let result = MySqlBackend.open("root@tcp(10.255.255.1:3306)/x?timeout=200ms").await;
        assert!(matches!(result, Err(RunError::ConnectionError(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_open_refused_connection() {
        // Port 1 is reserved and nothing listens there in test environments.
        let result = MySqlBackend.open("root@tcp(127.0.0.1:1)/customers").await;
        assert!(matches!(result, Err(RunError::ConnectionError(_))));
    }
}
