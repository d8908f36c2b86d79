use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

const DEFAULT_MODEL_PATH: &str = "artifacts/deposit_bundle.json";
const DEFAULT_STATIC_DIR: &str = "./static";
const DEFAULT_JSON_LIMIT: usize = 1024 * 1024;

/// Process settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_path: PathBuf,
    pub static_dir: PathBuf,
    pub json_limit: usize,
    /// Browser origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(&lookup, "PORT", 8080);
        let allowed_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            None => vec![
                format!("http://localhost:{port}"),
                format!("http://127.0.0.1:{port}"),
            ],
        };
        Settings {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            workers: parse_or(&lookup, "WORKERS", num_cpus::get()).max(1),
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR)),
            json_limit: parse_or(&lookup, "JSON_LIMIT", DEFAULT_JSON_LIMIT),
            allowed_origins,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("{key}={raw:?} is invalid ({e}), using {default}");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]);
        assert_eq!(s.bind_address(), "127.0.0.1:8080");
        assert_eq!(s.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(s.json_limit, DEFAULT_JSON_LIMIT);
        assert!(s.workers >= 1);
    }

    #[test]
    fn overrides_are_read() {
        let s = settings(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("WORKERS", "3"),
            ("MODEL_PATH", "/srv/bundle.json"),
        ]);
        assert_eq!(s.bind_address(), "0.0.0.0:9000");
        assert_eq!(s.workers, 3);
        assert_eq!(s.model_path, PathBuf::from("/srv/bundle.json"));
    }

    #[test]
    fn cors_origins_do_not_follow_the_bind_host() {
        let s = settings(&[("HOST", "0.0.0.0"), ("PORT", "9000")]);
        assert_eq!(
            s.allowed_origins,
            ["http://localhost:9000", "http://127.0.0.1:9000"]
        );

        let s = settings(&[
            ("HOST", "::"),
            ("CORS_ORIGINS", "https://bank.example, ,http://[::1]:8080"),
        ]);
        assert_eq!(s.allowed_origins, ["https://bank.example", "http://[::1]:8080"]);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let s = settings(&[("PORT", "eighty"), ("WORKERS", "0")]);
        assert_eq!(s.port, 8080);
        assert_eq!(s.workers, 1);
    }
}
