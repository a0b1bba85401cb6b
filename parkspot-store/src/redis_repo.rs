use redis::RedisResult;
use tracing::info;

use crate::StoreError;

/// INCR the window counter; the TTL is set only by the hit that opens the
/// window, so later hits (rejected ones included) never extend it.
const FIXED_WINDOW_SCRIPT: &str = r#"
    local count = redis.call("INCR", KEYS[1])
    if count == 1 then
        redis.call("EXPIRE", KEYS[1], ARGV[1])
    end
    return count
"#;

/// Shared counters for request throttling. Reservations never live here.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_string)?;
        info!("Redis client configured");
        Ok(Self { client })
    }

    /// Fixed-window counter: true while `key` has been hit at most `limit`
    /// times in the current window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let count: i64 = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }

    #[cfg(test)]
    async fn ttl(&self, key: &str) -> RedisResult<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("TTL").arg(key).query_async(&mut conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn redis_url() -> String {
        std::env::var("PARKSPOT_TEST_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at PARKSPOT_TEST_REDIS_URL"]
    async fn test_rejected_hits_do_not_extend_the_window() {
        let client = RedisClient::new(&redis_url()).await.unwrap();
        let key = format!("ratelimit:test:{}", uuid::Uuid::new_v4());

        assert!(client.check_rate_limit(&key, 1, 2).await.unwrap());
        assert!(!client.check_rate_limit(&key, 1, 2).await.unwrap());

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!client.check_rate_limit(&key, 1, 2).await.unwrap());
        // still the TTL set by the first hit
        assert!(client.ttl(&key).await.unwrap() <= 1);

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(client.check_rate_limit(&key, 1, 2).await.unwrap());
    }
}
