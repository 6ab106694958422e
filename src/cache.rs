//! Read-through cache over Redis, generalized from `RedisService`
//! (`services/redis_service.rs` in the reference tree) into the
//! `get_or_load` pattern SPEC_FULL's Cache Layer section calls for, plus
//! singleflight coalescing and prefix invalidation.

pub mod rate_limiter;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub default_ttl: Duration,
}

/// Wraps a `redis::Client` behind a typed `get_or_load` and backs the shared
/// rate limiter. The same connection also plays job-broker and result-store
/// roles elsewhere (`ingestion::broker`, `ingestion::result_store`) — all
/// three are modeled as Redis in this deployment.
#[derive(Clone)]
pub struct CacheLayer {
    client: Option<Arc<redis::Client>>,
    config: CacheConfig,
    inflight: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
}

impl CacheLayer {
    pub fn new(redis_url: &SecretString, config: CacheConfig) -> Result<Self, AppError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        let client = redis::Client::open(redis_url.expose_secret())
            .map_err(|e| AppError::Internal(format!("failed to create redis client: {e}")))?;
        tracing::info!("cache: redis client created");
        Ok(Self {
            client: Some(Arc::new(client)),
            config,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// A pass-through cache that always calls `loader`. Used when
    /// `cache_enabled = false` or in tests that don't want a Redis
    /// dependency.
    pub fn disabled() -> Self {
        Self {
            client: None,
            config: CacheConfig {
                enabled: false,
                default_ttl: Duration::from_secs(60),
            },
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.client.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "cache: failed to get redis connection");
                None
            }
        }
    }

    /// Read-through with singleflight: concurrent callers for the same key
    /// while a load is in flight wait on the same `Notify` rather than each
    /// issuing their own `loader` call.
    #[tracing::instrument(skip(self, loader), fields(cache_key = %key))]
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, AppError>>,
    {
        if !self.config.enabled {
            return loader().await;
        }
        let Some(mut conn) = self.connection().await else {
            return loader().await;
        };

        if let Ok(Some(raw)) = conn.get::<_, Option<String>>(key).await {
            if let Ok(value) = serde_json::from_str::<T>(&raw) {
                return Ok(value);
            }
        }

        let notify = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(key) {
                Some(existing.clone())
            } else {
                inflight.insert(key.to_string(), Arc::new(Notify::new()));
                None
            }
        };

        if let Some(notify) = notify {
            notify.notified().await;
            if let Ok(Some(raw)) = conn.get::<_, Option<String>>(key).await {
                if let Ok(value) = serde_json::from_str::<T>(&raw) {
                    return Ok(value);
                }
            }
            return loader().await;
        }

        let result = loader().await;
        if let Ok(value) = &result {
            if let Ok(serialized) = serde_json::to_string(value) {
                let _: Result<(), _> = conn.set_ex(key, serialized, ttl.as_secs().max(1)).await;
            }
        }

        let mut inflight = self.inflight.lock().await;
        if let Some(n) = inflight.remove(key) {
            n.notify_waiters();
        }

        result
    }

    /// Best-effort cache invalidation: SCAN + DEL. Missing entries beat the
    /// TTL anyway; this just shortens the staleness window after a write.
    #[tracing::instrument(skip(self))]
    pub async fn invalidate_prefix(&self, prefix: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let pattern = format!("{prefix}*");
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "cache: SCAN failed during invalidation");
                    return;
                }
            };
            if !keys.is_empty() {
                let _: Result<(), _> = conn.del(&keys).await;
            }
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Raw INCR+EXPIRE, shared with `rate_limiter` — uses the same
    /// connection so rate-limit counters live alongside cached reads.
    pub(crate) async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<i64, AppError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(0);
        };
        let count: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| AppError::Transient(format!("redis INCR failed: {e}")))?;
        if count == 1 {
            let _: Result<(), _> = conn.expire(key, window.as_secs() as i64).await;
        }
        Ok(count)
    }

    /// Raw SETEX, used by `identity` for refresh-token family state and by
    /// `ingestion::result_store` for task records — both are plain strings
    /// this layer doesn't need to interpret.
    pub async fn put_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let Some(mut conn) = self.connection().await else {
            return Err(AppError::Transient("redis unavailable".into()));
        };
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| AppError::Transient(format!("redis SETEX failed: {e}")))
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        let Some(mut conn) = self.connection().await else {
            return Err(AppError::Transient("redis unavailable".into()));
        };
        conn.get(key)
            .await
            .map_err(|e| AppError::Transient(format!("redis GET failed: {e}")))
    }

    pub async fn delete_raw(&self, key: &str) -> Result<(), AppError> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };
        let _: Result<(), _> = conn.del(key).await;
        Ok(())
    }

    /// Push onto the tail of a Redis list — the job broker's enqueue.
    pub async fn list_push(&self, key: &str, value: &str) -> Result<(), AppError> {
        let Some(mut conn) = self.connection().await else {
            return Err(AppError::Transient("redis unavailable".into()));
        };
        conn.lpush::<_, _, ()>(key, value)
            .await
            .map_err(|e| AppError::Transient(format!("redis LPUSH failed: {e}")))
    }

    /// Blocking pop from the head of a Redis list — the job broker's
    /// dequeue. Returns `None` on timeout with nothing queued.
    pub async fn list_blocking_pop(&self, key: &str, timeout: Duration) -> Result<Option<String>, AppError> {
        let Some(mut conn) = self.connection().await else {
            return Err(AppError::Transient("redis unavailable".into()));
        };
        let result: Option<(String, String)> = conn
            .blpop(key, timeout.as_secs_f64())
            .await
            .map_err(|e| AppError::Transient(format!("redis BLPOP failed: {e}")))?;
        Ok(result.map(|(_, v)| v))
    }
}

fn namespaced(domain: &str, args: &[&str]) -> String {
    format!("mt:dao:{domain}:{}", args.join(":"))
}

pub fn standings_key(league_id: uuid::Uuid, division_id: uuid::Uuid, season_id: uuid::Uuid, age_group_id: uuid::Uuid) -> String {
    namespaced(
        "standings",
        &[
            &league_id.to_string(),
            &division_id.to_string(),
            &season_id.to_string(),
            &age_group_id.to_string(),
        ],
    )
}

pub fn standings_prefix(league_id: uuid::Uuid, division_id: uuid::Uuid, season_id: uuid::Uuid) -> String {
    format!(
        "mt:dao:standings:{}:{}:{}",
        league_id, division_id, season_id
    )
}
