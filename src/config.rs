use anyhow::Context;
use std::str::FromStr;

const DATABASE_URL: &str = "DATABASE_URL";
const SERVER_PORT: &str = "SERVER_PORT";

/// Loads `.env` into the environment when present. A missing file is fine; a broken one is not.
pub fn load_dotenv() -> anyhow::Result<()> {
    ignore_missing_dotenv(dotenvy::dotenv().map(|_| ()))
}

fn ignore_missing_dotenv(result: Result<(), dotenvy::Error>) -> anyhow::Result<()> {
    match result {
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other.context("Failed to load .env file"),
    }
}

#[derive(Debug)]
pub struct Config {
    database_url: String,
    server_port: u16,
}

impl Config {
    /// Reads settings from the process environment. Call [`load_dotenv`] first to honour `.env`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = load_var(&lookup, DATABASE_URL)?;
        let server_port = load_var(&lookup, SERVER_PORT)?;
        Ok(Self {
            database_url,
            server_port,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }
}

fn load_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(key).with_context(|| format!("Missing environment variable {key}"))?;
    val.trim()
        .parse::<T>()
        .with_context(|| format!("Failed to parse environment variable {key}"))
}
