//! 渠道注册表
//!
//! 渠道标识 → 渠道实现。标识统一 trim + 小写；同名冲突时权重高者胜出，
//! 权重相同取实现类型名字典序较小者，结果与注册顺序无关。

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::cache::TokenCache;
use crate::channels::{self, pipeline, ChannelAdapter};
use crate::error::{ChannelError, RegistryError};
use crate::http::HttpClient;
use crate::model::{PushConfig, PushMessage, PushResult};

/// 渠道工厂：实例化失败返回错误，panic 也会被注册表拦截
pub type ChannelFactory =
    Box<dyn FnOnce() -> Result<Arc<dyn ChannelAdapter>, ChannelError> + Send>;

/// 标识规范化：trim + 小写，空白标识非法
pub fn normalize_type(channel_type: &str) -> Result<String, RegistryError> {
    let normalized = channel_type.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(RegistryError::BlankType);
    }
    Ok(normalized)
}

/// 新实现是否应该替换已注册的实现
fn outranks(candidate: &dyn ChannelAdapter, current: &dyn ChannelAdapter) -> bool {
    match candidate.weight().cmp(&current.weight()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.impl_name() < current.impl_name(),
    }
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: DashMap<String, Arc<dyn ChannelAdapter>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册所有内置渠道
    pub fn with_builtin(http: Arc<dyn HttpClient>, cache: Arc<TokenCache>) -> Self {
        let registry = Self::new();
        let count = registry.discover(channels::builtin_providers(http, cache).into_iter().map(Ok));
        info!("已注册 {} 个内置渠道", count);
        registry
    }

    /// 从枚举器加载渠道，返回成功注册的数量
    ///
    /// 单个条目枚举失败、工厂报错或 panic、注册失败都只记录日志并跳过。
    /// 枚举器本身 panic 时停止枚举，已注册的保留。
    pub fn discover<I>(&self, providers: I) -> usize
    where
        I: IntoIterator<Item = Result<ChannelFactory, ChannelError>>,
    {
        let mut providers = providers.into_iter();
        let mut registered = 0;

        loop {
            let next = match catch_unwind(AssertUnwindSafe(|| providers.next())) {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(_) => {
                    warn!("渠道枚举 panic，停止加载");
                    break;
                }
            };

            let factory = match next {
                Ok(factory) => factory,
                Err(e) => {
                    warn!("渠道枚举失败，跳过: {}", e);
                    continue;
                }
            };

            let channel = match catch_unwind(AssertUnwindSafe(factory)) {
                Ok(Ok(channel)) => channel,
                Ok(Err(e)) => {
                    warn!("渠道实例化失败，跳过: {}", e);
                    continue;
                }
                Err(_) => {
                    warn!("渠道实例化 panic，跳过");
                    continue;
                }
            };

            match self.register(channel) {
                Ok(()) => registered += 1,
                Err(e) => warn!("渠道注册失败，跳过: {}", e),
            }
        }

        registered
    }

    /// 以渠道自身声明的标识注册
    pub fn register(&self, channel: Arc<dyn ChannelAdapter>) -> Result<(), RegistryError> {
        let channel_type = channel.channel_type().to_string();
        self.register_as(&channel_type, channel)
    }

    /// 以指定标识注册，标识必须与渠道自身声明的一致（规范化后比较）
    pub fn register_as(
        &self,
        channel_type: &str,
        channel: Arc<dyn ChannelAdapter>,
    ) -> Result<(), RegistryError> {
        let requested = normalize_type(channel_type)?;
        let declared = channel.channel_type().trim().to_lowercase();
        if requested != declared {
            return Err(RegistryError::TypeMismatch {
                requested,
                declared,
            });
        }

        match self.channels.entry(requested) {
            Entry::Vacant(slot) => {
                debug!(
                    "注册渠道 [{}] {} (weight={})",
                    slot.key(),
                    channel.impl_name(),
                    channel.weight()
                );
                slot.insert(channel);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if outranks(channel.as_ref(), current.as_ref()) {
                    warn!(
                        "渠道 [{}] 被覆盖: {} (weight={}) -> {} (weight={})",
                        slot.key(),
                        current.impl_name(),
                        current.weight(),
                        channel.impl_name(),
                        channel.weight()
                    );
                    slot.insert(channel);
                } else {
                    warn!(
                        "渠道 [{}] 已存在，保留 {} (weight={})，忽略 {} (weight={})",
                        slot.key(),
                        current.impl_name(),
                        current.weight(),
                        channel.impl_name(),
                        channel.weight()
                    );
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, channel_type: &str) -> Result<Arc<dyn ChannelAdapter>, RegistryError> {
        let key = normalize_type(channel_type)?;
        match self.channels.get(&key) {
            Some(channel) => Ok(Arc::clone(channel.value())),
            None => Err(RegistryError::NotFound(key)),
        }
    }

    /// 已注册的渠道标识，按字典序
    pub fn channel_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.channels.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// 按渠道标识发送
///
/// 只有找不到渠道（或标识非法）时返回 `Err`，发送本身的失败都在 `PushResult` 里。
pub async fn dispatch(
    registry: &ChannelRegistry,
    channel_type: &str,
    message: &PushMessage,
    config: &PushConfig,
) -> Result<PushResult, RegistryError> {
    let channel = registry.get(channel_type)?;
    Ok(pipeline::send(channel.as_ref(), Some(message), Some(config)).await)
}
