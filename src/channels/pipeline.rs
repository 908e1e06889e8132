//! 所有渠道共用的发送管线
//!
//! 依次执行：空值检查 → 消息类型检查 → target 检查 → `check_config` → `do_send`。
//! 任何一步失败都立即返回失败结果；`check_config` / `do_send` 中的错误乃至 panic
//! 都在这里被转换为 `PushResult`，不会传递给调用方。

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{debug, error};

use super::traits::ChannelAdapter;
use crate::model::{PushConfig, PushMessage, PushResult};

pub const ERR_EMPTY_CONTENT: &str = "Content cannot be empty";
pub const ERR_NULL_CONFIG: &str = "Config cannot be null";
pub const ERR_NULL_TYPE: &str = "Message type cannot be null";
pub const ERR_BLANK_TARGET: &str = "Target cannot be blank";

/// 通过固定管线发送一条消息，永不返回错误
pub async fn send(
    channel: &dyn ChannelAdapter,
    message: Option<&PushMessage>,
    config: Option<&PushConfig>,
) -> PushResult {
    let Some(message) = message else {
        return PushResult::fail(ERR_EMPTY_CONTENT);
    };
    let Some(config) = config else {
        return PushResult::fail(ERR_NULL_CONFIG);
    };
    if message.msg_type().is_none() {
        return PushResult::fail(ERR_NULL_TYPE);
    }
    let target_blank = message.target().map_or(true, |t| t.trim().is_empty());
    if target_blank && !channel.allow_empty_target() {
        return PushResult::fail(ERR_BLANK_TARGET);
    }

    debug!(
        "开始发送 [channel={}] target={:?}",
        channel.channel_type(),
        message.target()
    );

    let outcome = AssertUnwindSafe(async {
        channel.check_config(config)?;
        channel.do_send(message, config).await
    })
    .catch_unwind()
    .await;

    match outcome {
        Ok(Ok(result)) => {
            if !result.success {
                debug!(
                    "渠道返回失败 [channel={}]: {:?}",
                    channel.channel_type(),
                    result.error_msg
                );
            }
            result
        }
        Ok(Err(e)) => {
            error!("发送失败 [channel={}]: {}", channel.channel_type(), e);
            PushResult::fail(e.to_string())
        }
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            error!("渠道 panic [channel={}]: {}", channel.channel_type(), msg);
            PushResult::fail(msg)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "channel panicked".to_string()
    }
}

impl<'a> dyn ChannelAdapter + 'a {
    /// `pipeline::send` 的便捷入口
    pub async fn send(&self, message: &PushMessage, config: &PushConfig) -> PushResult {
        send(self, Some(message), Some(config)).await
    }
}
