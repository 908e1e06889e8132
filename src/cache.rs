//! 进程内 access token 缓存
//!
//! 所有渠道共享同一个实例（启动时构造，通过 `Arc` 注入）。
//! 过期采用惰性淘汰：读到过期条目时删除，没有后台清理任务。

use std::fmt;
use std::future::Future;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::error::ChannelError;

/// 默认安全余量（秒）：提前这么久把 token 视为过期
pub const DEFAULT_SAFETY_MARGIN_SECS: u64 = 200;

/// 有效期上限（秒）：厂商返回的超大 expires_in 截断到 30 天
pub const MAX_TTL_SECS: i64 = 30 * 24 * 3600;

/// 日志里用的 key 指纹，key 可能包含 secret
fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// 带过期时间的 key → token 存储
///
/// 内部是分片 map，不同 key 的读写互不阻塞；`get` / `set` 各自原子。
/// 同一 key 并发未命中时可能重复刷新 token，这是允许的。
pub struct TokenCache {
    entries: DashMap<String, CachedToken>,
    safety_margin_secs: i64,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("entries", &self.entries.len())
            .field("safety_margin_secs", &self.safety_margin_secs)
            .finish()
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_safety_margin(DEFAULT_SAFETY_MARGIN_SECS)
    }

    pub fn with_safety_margin(safety_margin_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            safety_margin_secs: i64::try_from(safety_margin_secs).unwrap_or(i64::MAX),
        }
    }

    /// 读取 token；过期条目视为不存在并顺手删除
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.token.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            // 期间可能已有其他调用方写入新 token，只删仍然过期的条目
            self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
            debug!("token 已过期，淘汰缓存 [key={}]", key_fingerprint(key));
        }
        None
    }

    /// 写入 token，有效期 = max(1, ttl_secs - 安全余量)，最长 [`MAX_TTL_SECS`]
    pub fn set(&self, key: impl Into<String>, token: impl Into<String>, ttl_secs: i64) {
        let effective_secs = ttl_secs
            .saturating_sub(self.safety_margin_secs)
            .clamp(1, MAX_TTL_SECS);
        let expires_at = Instant::now() + Duration::from_secs(effective_secs as u64);
        self.entries.insert(
            key.into(),
            CachedToken {
                token: token.into(),
                expires_at,
            },
        );
    }

    /// 命中则直接返回，否则调用 `fetch` 获取 `(token, ttl_secs)` 并写入缓存
    ///
    /// `fetch` 失败时不写缓存，下次调用会重新获取。`fetch` 执行期间不持有任何锁。
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, fetch: F) -> Result<String, ChannelError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, i64), ChannelError>>,
    {
        if let Some(token) = self.get(key) {
            return Ok(token);
        }

        debug!("token 未命中缓存，重新获取 [key={}]", key_fingerprint(key));
        let (token, ttl_secs) = fetch().await?;
        self.set(key, token.clone(), ttl_secs);
        Ok(token)
    }

    /// 当前存储的条目数（含尚未被淘汰的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
