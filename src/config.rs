use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate};

const DEFAULT_PARALLELISM: usize = 4;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub computation_date: NaiveDate,
    /// Worker threads used to compute races in parallel.
    pub parallelism: usize,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            computation_date: Local::now().date_naive(),
            parallelism: DEFAULT_PARALLELISM,
            snapshot_path: None,
        }
    }
}

impl EngineConfig {
    /// Read `HANDICAP_*` variables, after loading a `.env` file when one exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(raw) = opt_env("HANDICAP_DATE") {
            config.computation_date =
                parse_date(&raw).ok_or_else(|| anyhow!("invalid HANDICAP_DATE: {raw}"))?;
        }
        config.parallelism = env::var("HANDICAP_PARALLELISM")
            .ok()
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLELISM)
            .clamp(1, 32);
        config.snapshot_path = opt_env("HANDICAP_SNAPSHOT_PATH").map(PathBuf::from);
        Ok(config)
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

/// Accepts `YYYY-MM-DD`, `YYYYMMDD` and the provider's `DDMMYYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 8 {
        return None;
    }
    let part = |range: std::ops::Range<usize>| digits[range].parse::<u32>().ok();
    let ymd = || NaiveDate::from_ymd_opt(part(0..4)? as i32, part(4..6)?, part(6..8)?);
    let dmy = || NaiveDate::from_ymd_opt(part(4..8)? as i32, part(2..4)?, part(0..2)?);
    ymd().or_else(dmy)
}

#[cfg(test)]
mod tests {
    use super::parse_date;
    use chrono::NaiveDate;

    #[test]
    fn parses_supported_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 15);
        assert_eq!(parse_date("2024-06-15"), expected);
        assert_eq!(parse_date("20240615"), expected);
        assert_eq!(parse_date("15062024"), expected);
        assert_eq!(parse_date(" 2024/06/15 "), expected);
        assert_eq!(parse_date("June"), None);
    }
}
