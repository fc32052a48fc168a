use std::{env, path::PathBuf, str::FromStr, time::Duration};

use sources::SourceConfig;

use crate::matcher::{DollarMatchPolicy, TickerRules};

/// 실행 설정. `.env` 또는 환경 변수에서 읽고, 없으면 기본값.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 채권 CSV 저장 폴더
    pub bonds_dir: PathBuf,
    /// MEP 결과 저장 폴더
    pub results_dir: PathBuf,
    pub log_dir: PathBuf,
    pub sources: SourceConfig,
    pub ticker_prefix: String,
    pub dollar_suffix: char,
    pub match_policy: DollarMatchPolicy,
    /// 잘못된 값 때문에 기본값으로 돌아간 항목들. 로거가 준비된 뒤 경고로 찍는다.
    pub issues: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bonds_dir: PathBuf::from("datos_bonos"),
            results_dir: PathBuf::from("resultados_mep"),
            log_dir: PathBuf::from("logs"),
            sources: SourceConfig::default(),
            ticker_prefix: "AL".to_string(),
            dollar_suffix: 'D',
            match_policy: DollarMatchPolicy::default(),
            issues: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut issues = Vec::new();

        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(dir) = get("MEP_BONDS_DIR") {
            config.bonds_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("MEP_RESULTS_DIR") {
            config.results_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("MEP_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        let mut timeout = |key: &str, slot: &mut Duration| {
            if let Some(raw) = get(key) {
                match raw.parse::<u64>() {
                    Ok(secs) if secs > 0 => *slot = Duration::from_secs(secs),
                    _ => issues.push(format!(
                        "{key}={raw} is not a positive number of seconds, using {}",
                        slot.as_secs()
                    )),
                }
            }
        };
        timeout("MEP_API_TIMEOUT_SECS", &mut config.sources.api_timeout);
        timeout("MEP_WEB_TIMEOUT_SECS", &mut config.sources.web_timeout);
        timeout("MEP_IOL_TIMEOUT_SECS", &mut config.sources.iol_timeout);

        if let Some(raw) = get("MEP_ACCEPT_INVALID_CERTS") {
            match parse_bool(&raw) {
                Some(v) => config.sources.accept_invalid_certs = v,
                None => issues.push(format!(
                    "MEP_ACCEPT_INVALID_CERTS={raw} is not a boolean, using {}",
                    config.sources.accept_invalid_certs
                )),
            }
        }

        if let Some(raw) = get("MEP_TICKER_PREFIX") {
            if raw.chars().all(|c| c.is_ascii_alphabetic()) {
                config.ticker_prefix = raw.to_uppercase();
            } else {
                issues.push(format!(
                    "MEP_TICKER_PREFIX={raw} must be letters only, using {}",
                    config.ticker_prefix
                ));
            }
        }

        if let Some(raw) = get("MEP_DOLLAR_SUFFIX") {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => {
                    config.dollar_suffix = c.to_ascii_uppercase()
                }
                _ => issues.push(format!(
                    "MEP_DOLLAR_SUFFIX={raw} must be a single letter, using {}",
                    config.dollar_suffix
                )),
            }
        }

        if let Some(raw) = get("MEP_MATCH_POLICY") {
            match DollarMatchPolicy::from_str(&raw) {
                Ok(policy) => config.match_policy = policy,
                Err(e) => issues.push(format!("MEP_MATCH_POLICY: {e}, using {}", config.match_policy)),
            }
        }

        config.issues = issues;
        config
    }

    pub fn ticker_rules(&self) -> Result<TickerRules, regex::Error> {
        TickerRules::new(&self.ticker_prefix, self.dollar_suffix)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = config_from(&[]);
        assert_eq!(config.bonds_dir, PathBuf::from("datos_bonos"));
        assert_eq!(config.results_dir, PathBuf::from("resultados_mep"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.sources.api_timeout, Duration::from_secs(15));
        assert_eq!(config.sources.web_timeout, Duration::from_secs(10));
        assert_eq!(config.sources.iol_timeout, Duration::from_secs(15));
        assert!(config.sources.accept_invalid_certs);
        assert_eq!(config.ticker_prefix, "AL");
        assert_eq!(config.dollar_suffix, 'D');
        assert_eq!(config.match_policy, DollarMatchPolicy::FirstListed);
        assert!(config.issues.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("MEP_BONDS_DIR", "/tmp/bonds"),
            ("MEP_API_TIMEOUT_SECS", "30"),
            ("MEP_ACCEPT_INVALID_CERTS", "false"),
            ("MEP_TICKER_PREFIX", "gd"),
            ("MEP_DOLLAR_SUFFIX", "c"),
            ("MEP_MATCH_POLICY", "most-traded"),
        ]);
        assert_eq!(config.bonds_dir, PathBuf::from("/tmp/bonds"));
        assert_eq!(config.sources.api_timeout, Duration::from_secs(30));
        assert!(!config.sources.accept_invalid_certs);
        assert_eq!(config.ticker_prefix, "GD");
        assert_eq!(config.dollar_suffix, 'C');
        assert_eq!(config.match_policy, DollarMatchPolicy::MostTraded);
        assert!(config.issues.is_empty());

        let rules = config.ticker_rules().unwrap();
        assert!(rules.is_peso("GD30"));
        assert!(rules.is_dollar("GD30C"));
    }

    #[test]
    fn test_invalid_values_fall_back_with_issue() {
        let config = config_from(&[
            ("MEP_WEB_TIMEOUT_SECS", "soon"),
            ("MEP_IOL_TIMEOUT_SECS", "0"),
            ("MEP_ACCEPT_INVALID_CERTS", "maybe"),
            ("MEP_TICKER_PREFIX", "A1"),
            ("MEP_DOLLAR_SUFFIX", "DD"),
            ("MEP_MATCH_POLICY", "cheapest"),
        ]);
        assert_eq!(config.sources.web_timeout, Duration::from_secs(10));
        assert_eq!(config.sources.iol_timeout, Duration::from_secs(15));
        assert!(config.sources.accept_invalid_certs);
        assert_eq!(config.ticker_prefix, "AL");
        assert_eq!(config.dollar_suffix, 'D');
        assert_eq!(config.match_policy, DollarMatchPolicy::FirstListed);
        assert_eq!(config.issues.len(), 6);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = config_from(&[("MEP_RESULTS_DIR", "  "), ("MEP_MATCH_POLICY", "")]);
        assert_eq!(config.results_dir, PathBuf::from("resultados_mep"));
        assert!(config.issues.is_empty());
    }
}
