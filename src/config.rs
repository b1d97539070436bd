use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub files: FilesConfig,
    pub feed: FeedConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Storage root for served and uploaded images
    pub root: PathBuf,
    pub chunk_size: usize,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Past events shown when the `limit` query parameter is missing or malformed
    pub default_limit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Raw `token[:user]` pairs accepted as authenticated sessions
    pub tokens: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/events.db".to_string()),
                max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("SERVER_PORT", 3000),
            },
            files: FilesConfig {
                root: env::var("FILES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/files")),
                chunk_size: parse_or("FILES_CHUNK_SIZE", 64 * 1024),
                max_upload_bytes: parse_or("FILES_MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            },
            feed: FeedConfig {
                default_limit: parse_or("FEED_DEFAULT_LIMIT", 5),
            },
            session: SessionConfig {
                tokens: env::var("SESSION_TOKENS")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            files: FilesConfig {
                root: PathBuf::from("data/files"),
                chunk_size: 64 * 1024,
                max_upload_bytes: 10 * 1024 * 1024,
            },
            feed: FeedConfig { default_limit: 5 },
            session: SessionConfig::default(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_skips_blanks() {
        assert_eq!(
            split_list(" abc:alice, ,def "),
            vec!["abc:alice".to_string(), "def".to_string()]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_server_address() {
        let config = Config::default();
        assert_eq!(config.server_address(), "127.0.0.1:3000");
    }
}
