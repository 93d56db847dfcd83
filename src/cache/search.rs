use crate::cache::CacheService;
use crate::listing::ListingPage;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

// Счетчик поколений: любая запись в события увеличивает его, и старые ключи
// просто перестают читаться, пока не истечет их TTL.
const GENERATION_KEY: &str = "search:generation";

/// Ключ страницы поиска: поколение плюс sha256 нормализованного запроса.
pub fn search_key(generation: i64, term: &str, page: u32, limit: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(term.trim().to_lowercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(page.to_string().as_bytes());
    hasher.update(b"\n");
    hasher.update(limit.to_string().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("search:v{generation}:{hex}")
}

/// Результат чтения кеша вместе с поколением, под которым читали.
/// Запись после промаха идет под тем же поколением: если события успели
/// измениться, ключ уже устарел и страница не будет прочитана.
#[derive(Debug, Default)]
pub struct SearchLookup {
    pub page: Option<ListingPage>,
    generation: Option<i64>,
}

impl SearchLookup {
    fn key(&self, term: &str, page: u32, limit: u32) -> Option<String> {
        self.generation
            .map(|generation| search_key(generation, term, page, limit))
    }
}

impl CacheService {
    async fn generation(&self) -> Result<Option<i64>, redis::RedisError> {
        let Some(redis) = &self.redis else {
            return Ok(None);
        };
        let mut conn = redis.conn.clone();
        let generation: Option<i64> = conn.get(GENERATION_KEY).await?;
        Ok(Some(generation.unwrap_or(0)))
    }

    async fn read(&self, term: &str, page: u32, limit: u32) -> Result<(Option<i64>, Option<String>), redis::RedisError> {
        let (Some(redis), Some(generation)) = (&self.redis, self.generation().await?) else {
            return Ok((None, None));
        };
        let mut conn = redis.conn.clone();
        let raw = conn.get(search_key(generation, term, page, limit)).await?;
        Ok((Some(generation), raw))
    }

    async fn write(&self, key: String, raw: String) -> Result<(), redis::RedisError> {
        let Some(redis) = &self.redis else {
            return Ok(());
        };
        let mut conn = redis.conn.clone();
        conn.set_ex(key, raw, self.ttl_seconds).await
    }

    /// Закешированная страница поиска. Ошибки Redis - это промах без поколения,
    /// такой промах в кеш не записывается.
    pub async fn get_search(&self, term: &str, page: u32, limit: u32) -> SearchLookup {
        let (generation, raw) = match self.read(term, page, limit).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Search cache read failed: {:?}", e);
                return SearchLookup::default();
            }
        };
        let page = raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(page) => {
                debug!("Search cache hit for '{}'", term);
                Some(page)
            }
            Err(e) => {
                warn!("Discarding unreadable search cache entry: {:?}", e);
                None
            }
        });
        SearchLookup { page, generation }
    }

    /// Кладет страницу под поколение из `lookup`, не перечитывая счетчик.
    pub async fn put_search(&self, lookup: &SearchLookup, term: &str, page: u32, limit: u32, value: &ListingPage) {
        let Some(key) = lookup.key(term, page, limit) else {
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize search page: {:?}", e);
                return;
            }
        };
        if let Err(e) = self.write(key, raw).await {
            warn!("Search cache write failed: {:?}", e);
        }
    }

    /// Сбрасывает кеш поиска после изменения событий.
    pub async fn invalidate_search(&self) {
        let Some(redis) = &self.redis else {
            return;
        };
        let mut conn = redis.conn.clone();
        if let Err(e) = conn.incr::<_, _, i64>(GENERATION_KEY, 1).await {
            warn!("Search cache invalidation failed: {:?}", e);
        }
    }
}
