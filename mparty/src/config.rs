//! Service configuration.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use crate::tournament::XpRewards;

/// Configuration shared by the services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MPartyConfig {
    /// Number of events returned by the event list
    pub event_list_limit: usize,
    /// Number of players returned by a ranking query
    pub ranking_limit: usize,
    /// Attempts for optimistic roster writes before giving up
    pub join_retry_attempts: u32,
    /// Minimum password length accepted at registration
    pub min_password_len: usize,
    /// Server-side pepper mixed into password hashes
    pub password_pepper: String,
    /// XP awarded by placement at settlement
    pub rewards: XpRewards,
}

impl Default for MPartyConfig {
    fn default() -> Self {
        Self {
            event_list_limit: 20,
            ranking_limit: 50,
            join_retry_attempts: 5,
            min_password_len: 6,
            password_pepper: String::new(),
            rewards: XpRewards::default(),
        }
    }
}

impl MPartyConfig {
    /// Load configuration from environment variables
    ///
    /// Recognized variables (defaults in parentheses):
    /// - `MPARTY_EVENT_LIST_LIMIT` (20)
    /// - `MPARTY_RANKING_LIMIT` (50)
    /// - `MPARTY_JOIN_RETRIES` (5)
    /// - `MPARTY_MIN_PASSWORD_LEN` (6)
    /// - `PASSWORD_PEPPER` (empty)
    /// - `MPARTY_XP_FIRST` / `MPARTY_XP_SECOND` / `MPARTY_XP_THIRD` /
    ///   `MPARTY_XP_PARTICIPATION` (100 / 75 / 50 / 25)
    ///
    /// # Errors
    ///
    /// Returns error if the loaded values fail [`MPartyConfig::validate`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            event_list_limit: parse_env_or("MPARTY_EVENT_LIST_LIMIT", defaults.event_list_limit),
            ranking_limit: parse_env_or("MPARTY_RANKING_LIMIT", defaults.ranking_limit),
            join_retry_attempts: parse_env_or("MPARTY_JOIN_RETRIES", defaults.join_retry_attempts),
            min_password_len: parse_env_or("MPARTY_MIN_PASSWORD_LEN", defaults.min_password_len),
            password_pepper: std::env::var("PASSWORD_PEPPER").unwrap_or_default(),
            rewards: XpRewards {
                first: parse_env_or("MPARTY_XP_FIRST", defaults.rewards.first),
                second: parse_env_or("MPARTY_XP_SECOND", defaults.rewards.second),
                third: parse_env_or("MPARTY_XP_THIRD", defaults.rewards.third),
                participation: parse_env_or(
                    "MPARTY_XP_PARTICIPATION",
                    defaults.rewards.participation,
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_list_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "MPARTY_EVENT_LIST_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.ranking_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "MPARTY_RANKING_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.join_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "MPARTY_JOIN_RETRIES".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        let r = &self.rewards;
        if !(r.first >= r.second && r.second >= r.third && r.third >= r.participation) {
            return Err(ConfigError::Invalid {
                var: "MPARTY_XP_*".to_string(),
                reason: format!(
                    "Rewards must not increase with placement (got {}/{}/{}/{})",
                    r.first, r.second, r.third, r.participation
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
