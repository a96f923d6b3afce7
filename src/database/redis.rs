use log::info;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};

/// Fixed-window request counters kept in Redis
#[derive(Clone)]
pub struct RedisService {
    connection: MultiplexedConnection,
}

fn window_key(key: &str) -> String {
    format!("ratelimit:{}", key)
}

impl RedisService {
    /// Counts one hit for `key` and reports whether it went over `max_requests`
    /// inside the current window. The first hit opens the window.
    pub async fn is_rate_limited(
        &self,
        key: &str,
        max_requests: u64,
        window_seconds: u64,
    ) -> Result<bool, String> {
        let mut conn = self.connection.clone();
        let window_key = window_key(key);

        let hits: u64 = conn
            .incr(&window_key, 1)
            .await
            .map_err(|e| format!("Failed to count request: {}", e))?;

        if hits == 1 {
            conn.expire::<_, ()>(&window_key, window_seconds as i64)
                .await
                .map_err(|e| format!("Failed to open rate limit window: {}", e))?;
        }

        Ok(hits > max_requests)
    }
}

pub async fn connect_to_redis(redis_url: &str) -> Result<RedisService, String> {
    let client =
        Client::open(redis_url).map_err(|e| format!("Invalid Redis URL: {}", e))?;

    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| format!("Failed to connect to Redis: {}", e))?;

    info!("Connected successfully to Redis");
    Ok(RedisService { connection })
}
