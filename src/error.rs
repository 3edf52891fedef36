use std::fmt;

#[derive(Debug)]
pub enum RunError {
    Config(String),
    InvalidDescriptor(String),
    UnknownDriver { name: String, available: Vec<String> },
    ConnectionError(sqlx::Error),
    SqlError(sqlx::Error),
    NoRows,
    ColumnCount(usize),
    NullValue,
    CloseError(sqlx::Error),
    OutputError(std::io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Config(msg) => write!(f, "Configuration error: {msg}"),
            RunError::InvalidDescriptor(msg) => write!(f, "Invalid connection descriptor: {msg}"),
            RunError::UnknownDriver { name, available } => {
                write!(f, "Unknown driver '{name}' (available: {})", available.join(", "))
            }
            RunError::ConnectionError(e) => write!(f, "Connection error: {e}"),
            RunError::SqlError(e) => write!(f, "SQL error: {e}"),
            RunError::NoRows => write!(f, "No rows in result set"),
            RunError::ColumnCount(n) => {
                write!(f, "Expected exactly 1 column in result, got {n}")
            }
            RunError::NullValue => write!(f, "Result value is NULL, expected text"),
            RunError::CloseError(e) => write!(f, "Failed to close connection: {e}"),
            RunError::OutputError(e) => write!(f, "Failed to write result: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::ConnectionError(e) | RunError::SqlError(e) | RunError::CloseError(e) => {
                Some(e)
            }
            RunError::OutputError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for RunError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RunError::NoRows,
            e => RunError::SqlError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_row_not_found_maps_to_no_rows() {
        assert!(matches!(RunError::from(sqlx::Error::RowNotFound), RunError::NoRows));
        assert!(matches!(
            RunError::from(sqlx::Error::PoolClosed),
            RunError::SqlError(_)
        ));
    }

    #[test]
    fn test_unknown_driver_lists_available() {
        let err = RunError::UnknownDriver {
            name: "postgres".into(),
            available: vec!["mysql".into()],
        };
        assert_eq!(err.to_string(), "Unknown driver 'postgres' (available: mysql)");
    }

    #[test]
    fn test_source_chains_to_sqlx() {
        assert!(RunError::ConnectionError(sqlx::Error::PoolTimedOut).source().is_some());
        assert!(RunError::NoRows.source().is_none());
    }
}
