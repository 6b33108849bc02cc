use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("cell_resolution {0} out of range (expected 0..=15)")]
    InvalidResolution(u8),

    #[error("ingest_concurrency cannot be 0")]
    InvalidConcurrency,

    #[error("database path cannot be empty")]
    EmptyDatabasePath,
}

fn default_resolution() -> u8 {
    10
}

fn default_concurrency() -> usize {
    16
}

fn default_cache_capacity() -> u64 {
    crate::cache::DEFAULT_CAPACITY
}

/// Aggregation configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Durable aggregate store settings
    pub database: DatabaseConfig,
    /// H3 resolution used to derive cell ids.
    ///
    /// One value for the whole deployment. Changing it invalidates every cell
    /// id already stored: migrate or wipe the aggregate database first.
    #[serde(default = "default_resolution")]
    pub cell_resolution: u8,
    /// Upper bound on concurrently processed batch items
    #[serde(default = "default_concurrency")]
    pub ingest_concurrency: usize,
    /// Accelerator cache capacity in entries; a performance knob only
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file
    pub path: String,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.cell_resolution > 15 {
            return Err(ValidationError::InvalidResolution(self.cell_resolution));
        }
        if self.ingest_concurrency == 0 {
            return Err(ValidationError::InvalidConcurrency);
        }
        if self.database.path.is_empty() {
            return Err(ValidationError::EmptyDatabasePath);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        let yaml = r#"
database:
    path: /var/lib/radiomap/hexes.sqlite
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.cell_resolution, 10);
        assert_eq!(config.ingest_concurrency, 16);
        assert_eq!(config.database.path, "/var/lib/radiomap/hexes.sqlite");
    }

    #[test]
    fn test_parse_explicit_values() {
        let yaml = r#"
database:
    path: ./hexes.sqlite
cell_resolution: 11
ingest_concurrency: 4
cache_capacity: 1000
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.cell_resolution, 11);
        assert_eq!(config.ingest_concurrency, 4);
        assert_eq!(config.cache_capacity, 1000);
    }

    #[test]
    fn test_validation_errors() {
        let base = Config {
            database: DatabaseConfig {
                path: "./hexes.sqlite".to_string(),
            },
            cell_resolution: 10,
            ingest_concurrency: 16,
            cache_capacity: 1000,
        };

        let mut config = base.clone();
        config.cell_resolution = 16;
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::InvalidResolution(16)
        ));

        let mut config = base.clone();
        config.ingest_concurrency = 0;
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::InvalidConcurrency
        ));

        let mut config = base;
        config.database.path = String::new();
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::EmptyDatabasePath
        ));
    }

    #[test]
    fn test_missing_database_section_fails() {
        assert!(serde_yaml::from_str::<Config>("cell_resolution: 10").is_err());
    }
}
