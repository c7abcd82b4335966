//! Rate limiter for login attempts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    last_attempt: Instant,
    ban_expires: Option<Instant>,
}

/// Rate limiter keyed by an arbitrary string (the normalized login email)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        // Drop keys whose window and ban are both over
        entries.retain(|_, entry| {
            let banned = entry.ban_expires.is_some_and(|ban_expires| now < ban_expires);
            banned || now.duration_since(entry.last_attempt) < window
        });

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            last_attempt: now,
            ban_expires: None,
        });

        // Check if ban has expired
        if let Some(ban_expires) = entry.ban_expires {
            if now >= ban_expires {
                // Ban expired, reset attempts
                entry.attempts = 0;
                entry.ban_expires = None;
            } else {
                // Still banned
                return false;
            }
        }

        // Check if window has expired
        if now.duration_since(entry.last_attempt) >= window {
            // Window expired, reset attempts
            entry.attempts = 0;
        }

        // Check if we're over the limit
        if entry.attempts >= self.config.max_attempts {
            // Ban the key
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        // Increment attempts
        entry.attempts += 1;
        entry.last_attempt = now;

        true
    }

    /// Forget the attempts recorded for `key` (after a successful login)
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, window_seconds: u64, ban_duration_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds,
            ban_duration_seconds,
        })
    }

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let limiter = limiter(3, 300, 3600);

        for _ in 0..3 {
            assert!(limiter.is_allowed("user@example.com").await);
        }
        assert!(!limiter.is_allowed("user@example.com").await);
        // still banned
        assert!(!limiter.is_allowed("user@example.com").await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1, 300, 3600);

        assert!(limiter.is_allowed("a@example.com").await);
        assert!(!limiter.is_allowed("a@example.com").await);
        assert!(limiter.is_allowed("b@example.com").await);
    }

    #[tokio::test]
    async fn test_reset_clears_attempts() {
        let limiter = limiter(1, 300, 3600);

        assert!(limiter.is_allowed("a@example.com").await);
        limiter.reset("a@example.com").await;
        assert!(limiter.is_allowed("a@example.com").await);
    }

    #[tokio::test]
    async fn test_ban_expires() {
        let limiter = limiter(1, 300, 0);

        assert!(limiter.is_allowed("a@example.com").await);
        assert!(!limiter.is_allowed("a@example.com").await);
        // zero-length ban is over on the next call
        assert!(limiter.is_allowed("a@example.com").await);
    }

    #[tokio::test]
    async fn test_stale_keys_are_pruned() {
        let limiter = limiter(5, 0, 0);

        assert!(limiter.is_allowed("a@example.com").await);
        assert!(limiter.is_allowed("b@example.com").await);
        // "a" fell out of its zero-length window before "b" was recorded
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn test_active_and_banned_keys_are_kept() {
        let limiter = limiter(1, 300, 3600);

        assert!(limiter.is_allowed("a@example.com").await);
        assert!(!limiter.is_allowed("a@example.com").await);
        assert!(limiter.is_allowed("b@example.com").await);
        assert_eq!(limiter.tracked_keys().await, 2);
        assert!(!limiter.is_allowed("a@example.com").await);
    }

    #[test]
    fn test_default_config() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        assert_eq!(limiter.config().max_attempts, 5);
        assert_eq!(limiter.config().window_seconds, 300);
    }
}
