use crate::redis_client::RedisClient;
use tracing::info;

pub mod search;

/// Кеш поверх Redis. Без Redis все операции - пустые: промах на чтении,
/// ничего не делается на записи.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        info!("Search cache enabled (ttl {}s)", ttl_seconds);
        Self {
            redis: Some(redis),
            ttl_seconds,
        }
    }

    pub fn disabled() -> Self {
        Self {
            redis: None,
            ttl_seconds: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some()
    }
}
