use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

pub const SOURCE_URL: &str = "https://en.wikipedia.org/wiki/List_of_Spotify_streaming_records";
pub const DB_PATH: &str = "spotify_top_streaming.db";
pub const TABLE_NAME: &str = "spotify_streaming_records";

/// Runtime settings. Defaults reproduce the original data pull; a config
/// file and `SPOTIFY_*` environment variables override them in that order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub referer: String,
    pub timeout_secs: u64,
    pub db_path: PathBuf,
    pub table_name: String,
    /// Column removed outright during cleaning.
    pub drop_column: String,
    /// Label (original parsed position) of the non-data row removed during cleaning.
    pub drop_row: usize,
    /// When set, pick the first table carrying all of these columns instead of the first table.
    pub match_columns: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            url: SOURCE_URL.to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            accept_language: "es-ES,es;q=0.9".to_string(),
            referer: "https://www.google.com/".to_string(),
            timeout_secs: 30,
            db_path: PathBuf::from(DB_PATH),
            table_name: TABLE_NAME.to_string(),
            drop_column: "Ref.".to_string(),
            drop_row: 100,
            match_columns: None,
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SPOTIFY").try_parsing(true)
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::layered(file, environment())
    }

    fn layered(file: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_sources() {
        let s = Settings::load(None).unwrap();
        assert_eq!(s.url, SOURCE_URL);
        assert_eq!(s.timeout(), Duration::from_secs(30));
        assert_eq!(s.drop_column, "Ref.");
        assert_eq!(s.drop_row, 100);
        assert!(s.match_columns.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "db_path = \"out/test.db\"\ndrop_row = 7\nmatch_columns = [\"Song\", \"Rank\"]"
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.db_path, PathBuf::from("out/test.db"));
        assert_eq!(s.drop_row, 7);
        assert_eq!(
            s.match_columns,
            Some(vec!["Song".to_string(), "Rank".to_string()])
        );
        // untouched keys keep their defaults
        assert_eq!(s.table_name, TABLE_NAME);
    }

    #[test]
    fn env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "db_path = \"from_file.db\"\ndrop_row = 3").unwrap();

        let vars: config::Map<String, String> = [
            ("SPOTIFY_DB_PATH", "from_env.db"),
            ("SPOTIFY_DROP_ROW", "7"),
            ("SPOTIFY_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let s = Settings::layered(Some(file.path()), environment().source(Some(vars))).unwrap();
        assert_eq!(s.db_path, PathBuf::from("from_env.db"));
        assert_eq!(s.drop_row, 7);
        assert_eq!(s.timeout(), Duration::from_secs(5));
        assert_eq!(s.drop_column, "Ref.");
    }

    #[test]
    fn env_value_must_parse() {
        let vars: config::Map<String, String> =
            [("SPOTIFY_DROP_ROW".to_string(), "last".to_string())].into_iter().collect();
        let err = Settings::layered(None, environment().source(Some(vars))).err().unwrap();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
