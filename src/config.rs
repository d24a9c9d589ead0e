use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

pub const DEFAULT_DATA_FILE: &str = "data/student_results.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let data_path = env::var("STUDENT_DATA_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_path);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            data_path,
            rust_log,
        }
    }
}

/// `data/student_results.csv` next to the running binary when it exists
/// there, else relative to the working directory.
pub fn default_data_path() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_DATA_FILE)))
        .filter(|candidate| candidate.is_file())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
}
