use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "myorg-dev",
            Profile::Prod => "myorg",
        }
    }
}

/// Get the configuration directory path
/// If profile is Dev, uses "myorg-dev" instead of "myorg"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "myorg", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path
/// If profile is Dev, uses "myorg-dev" instead of "myorg"
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "myorg", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<chrono::NaiveDate, chrono::ParseError> {
    chrono::NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Canonical YYYY-MM-DD key for a calendar date
pub fn date_key(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fresh random identifier for a new record
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Case-insensitive substring match; an empty needle matches everything
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whole days covered by a millisecond span, rounded up (`Math.ceil(ms / day)`)
pub fn ceil_days(millis: i64) -> i64 {
    const DAY_MS: i64 = 86_400_000;
    millis.div_euclid(DAY_MS) + i64::from(millis.rem_euclid(DAY_MS) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_and_trims() {
        let date = parse_date(" 2024-03-10 ").unwrap();
        assert_eq!(date_key(date), "2024-03-10");
        assert!(parse_date("10/03/2024").is_err());
        assert!(parse_date("amanhã").is_err());
    }

    #[test]
    fn ceil_days_rounds_up_partial_days() {
        assert_eq!(ceil_days(0), 0);
        assert_eq!(ceil_days(1), 1);
        assert_eq!(ceil_days(86_400_000), 1);
        assert_eq!(ceil_days(86_400_001), 2);
        assert_eq!(ceil_days(-1), 0);
        assert_eq!(ceil_days(-86_400_001), -1);
    }

    #[test]
    fn contains_ignore_case_matches_any_case() {
        assert!(contains_ignore_case("Aniversário da Ana", "ANA"));
        assert!(contains_ignore_case("anything", ""));
        assert!(!contains_ignore_case("Rent", "water"));
    }
}
