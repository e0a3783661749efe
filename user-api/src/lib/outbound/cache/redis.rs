use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::sentinel::Sentinel;
use ::redis::sentinel::SentinelNodeConnectionInfo;
use ::redis::Cmd;
use ::redis::ConnectionAddr;
use ::redis::ConnectionInfo;
use ::redis::FromRedisValue;
use ::redis::IntoConnectionInfo;
use ::redis::RedisConnectionInfo;
use ::redis::RedisResult;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::RwLock;

use crate::config::RedisConfig;
use crate::domain::cache::errors::CacheError;
use crate::domain::cache::models::CacheKey;
use crate::domain::cache::ports::Cache;

/// Master lookup through a set of Sentinels.
struct SentinelMaster {
    sentinel: Sentinel,
    master_name: String,
    master_info: SentinelNodeConnectionInfo,
}

impl SentinelMaster {
    fn from_config(config: &RedisConfig) -> Result<Self, CacheError> {
        if config.sentinel_addrs.is_empty() {
            return Err(CacheError::Unavailable(
                "sentinel mode needs at least one sentinel address".to_string(),
            ));
        }
        if config.sentinel_master.trim().is_empty() {
            return Err(CacheError::Unavailable(
                "sentinel mode needs a master name".to_string(),
            ));
        }

        let master = config
            .url
            .as_str()
            .into_connection_info()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?
            .redis;

        let nodes = config
            .sentinel_addrs
            .iter()
            .map(|addr| sentinel_node(addr, config.sentinel_password.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let sentinel = Sentinel::build(nodes).map_err(|e| CacheError::Unavailable(e.to_string()))?;

        Ok(Self {
            sentinel,
            master_name: config.sentinel_master.trim().to_string(),
            master_info: SentinelNodeConnectionInfo {
                tls_mode: None,
                redis_connection_info: Some(master),
            },
        })
    }

    async fn connect(&mut self, timeout: Duration) -> Result<ConnectionManager, CacheError> {
        let resolve = async {
            let client = self
                .sentinel
                .async_master_for(&self.master_name, Some(&self.master_info))
                .await?;
            ConnectionManager::new(client).await
        };

        let manager = tokio::time::timeout(timeout, resolve)
            .await
            .map_err(|_| CacheError::Timeout(timeout))?
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        tracing::info!(master = %self.master_name, "Resolved Redis master through Sentinel");

        Ok(manager)
    }
}

fn sentinel_node(addr: &str, password: Option<String>) -> Result<ConnectionInfo, CacheError> {
    let invalid = || CacheError::Unavailable(format!("invalid sentinel address: {addr}"));

    let (host, port) = addr.trim().rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    if host.is_empty() {
        return Err(invalid());
    }

    Ok(ConnectionInfo {
        addr: ConnectionAddr::Tcp(host.to_string(), port),
        redis: RedisConnectionInfo {
            password,
            ..Default::default()
        },
    })
}

/// Redis-backed cache, connected directly or through Sentinel.
///
/// Every command is bounded by `timeout`. The connection manager reconnects on
/// its own after a dropped connection. In Sentinel mode a failed command
/// re-resolves the master once and is retried against it.
#[derive(Clone)]
pub struct RedisCache {
    manager: Arc<RwLock<ConnectionManager>>,
    sentinel: Option<Arc<Mutex<SentinelMaster>>>,
    timeout: Duration,
}

impl RedisCache {
    /// Connect to Redis and check the connection with a PING.
    ///
    /// # Errors
    /// * `Unavailable` - Invalid URL or sentinel settings, or the server refused the connection
    /// * `Timeout` - Server did not answer within `timeout_ms`
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        let timeout = config.timeout();

        let (manager, sentinel) = if config.use_sentinel {
            let mut sentinel = SentinelMaster::from_config(config)?;
            tracing::info!(
                sentinels = ?config.sentinel_addrs,
                master = %sentinel.master_name,
                "Connecting to Redis through Sentinel"
            );
            let manager = sentinel.connect(timeout).await?;
            (manager, Some(Arc::new(Mutex::new(sentinel))))
        } else {
            let client = ::redis::Client::open(config.url.as_str())
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
            let manager = tokio::time::timeout(timeout, ConnectionManager::new(client))
                .await
                .map_err(|_| CacheError::Timeout(timeout))?
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
            (manager, None)
        };

        let cache = Self {
            manager: Arc::new(RwLock::new(manager)),
            sentinel,
            timeout,
        };
        cache.ping().await?;

        tracing::info!(
            timeout_ms = timeout.as_millis() as u64,
            sentinel = config.use_sentinel,
            "Redis connection established"
        );

        Ok(cache)
    }

    pub async fn ping(&self) -> Result<(), CacheError> {
        let _: String = self.query(&::redis::cmd("PING")).await?;
        Ok(())
    }

    async fn query<T: FromRedisValue + Send>(&self, command: &Cmd) -> Result<T, CacheError> {
        let mut conn = self.manager.read().await.clone();

        match self.bounded(command.query_async(&mut conn)).await {
            Err(CacheError::Unavailable(reason)) if self.sentinel.is_some() => {
                tracing::warn!(error = %reason, "Redis command failed, re-resolving master");
                let mut conn = self.follow_master().await?;
                self.bounded(command.query_async(&mut conn)).await
            }
            result => result,
        }
    }

    async fn follow_master(&self) -> Result<ConnectionManager, CacheError> {
        let Some(sentinel) = &self.sentinel else {
            return Ok(self.manager.read().await.clone());
        };

        let manager = sentinel.lock().await.connect(self.timeout).await?;
        *self.manager.write().await = manager.clone();

        Ok(manager)
    }

    async fn bounded<T>(
        &self,
        command: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, command)
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut command = ::redis::cmd("SET");
        command.arg(key.as_str()).arg(value);
        if let Some(ttl) = ttl {
            // PX rejects zero.
            command.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }

        let _: () = self.query(&command).await?;

        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let mut command = ::redis::cmd("GET");
        command.arg(key.as_str());

        self.query(&command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentinel_config(addrs: &[&str], master: &str) -> RedisConfig {
        RedisConfig {
            enabled: true,
            url: "redis://:master-pass@127.0.0.1:6379/3".to_string(),
            timeout_ms: 100,
            use_sentinel: true,
            sentinel_addrs: addrs.iter().map(|addr| addr.to_string()).collect(),
            sentinel_master: master.to_string(),
            sentinel_password: Some("sentinel-pass".to_string()),
        }
    }

    #[test]
    fn test_sentinel_node_parses_host_and_port() {
        let info = sentinel_node(" 10.0.0.1:26379 ", Some("pw".to_string())).unwrap();

        assert!(matches!(
            info.addr,
            ConnectionAddr::Tcp(ref host, 26379) if host == "10.0.0.1"
        ));
        assert_eq!(info.redis.password.as_deref(), Some("pw"));
        assert_eq!(info.redis.db, 0);
    }

    #[test]
    fn test_sentinel_node_rejects_bad_addresses() {
        for addr in ["10.0.0.1", ":26379", "10.0.0.1:port", "10.0.0.1:70000"] {
            assert!(
                matches!(sentinel_node(addr, None), Err(CacheError::Unavailable(_))),
                "addr: {addr}"
            );
        }
    }

    #[test]
    fn test_sentinel_master_takes_credentials_from_url() {
        let master = SentinelMaster::from_config(&sentinel_config(&["10.0.0.1:26379"], "mymaster"))
            .map_err(|e| e.to_string())
            .unwrap();

        assert_eq!(master.master_name, "mymaster");
        let info = master.master_info.redis_connection_info.unwrap();
        assert_eq!(info.password.as_deref(), Some("master-pass"));
        assert_eq!(info.db, 3);
    }

    #[test]
    fn test_sentinel_master_requires_addresses_and_name() {
        assert!(matches!(
            SentinelMaster::from_config(&sentinel_config(&[], "mymaster")),
            Err(CacheError::Unavailable(_))
        ));
        assert!(matches!(
            SentinelMaster::from_config(&sentinel_config(&["10.0.0.1:26379"], " ")),
            Err(CacheError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_sentinel_fails() {
        // Nothing listens on port 1.
        let result = RedisCache::connect(&sentinel_config(&["127.0.0.1:1"], "mymaster")).await;

        assert!(matches!(
            result,
            Err(CacheError::Unavailable(_) | CacheError::Timeout(_))
        ));
    }
}
