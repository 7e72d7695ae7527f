use anyhow::{Context, Result};
use serde::Serialize;

const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug, Serialize)]
pub struct AppConfig {
    pub cors_allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub seed_demo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cors_allowed_origins: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            seed_demo: false,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid MAX_BODY_BYTES `{raw}`"))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let seed_demo = lookup("SEED_DEMO")
            .map(|val| parse_bool(&val))
            .unwrap_or(false);

        Ok(Self {
            cors_allowed_origins,
            max_body_bytes,
            seed_demo,
        })
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(!config.seed_demo);
    }

    #[test]
    fn parses_origins_limits_and_flags() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CORS_ALLOWED_ORIGINS", "http://a.test, ,http://b.test"),
            ("MAX_BODY_BYTES", "1024"),
            ("SEED_DEMO", "Yes"),
        ]))
        .unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert_eq!(config.max_body_bytes, 1024);
        assert!(config.seed_demo);
    }

    #[test]
    fn rejects_non_numeric_body_limit() {
        let err = AppConfig::from_lookup(lookup(&[("MAX_BODY_BYTES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MAX_BODY_BYTES"));
    }
}
