use async_trait::async_trait;

use crate::error::ChannelError;
use crate::model::{PushConfig, PushMessage, PushResult};

/// 渠道能力抽象
///
/// 每个厂商实现一次。调用方不直接调用这里的钩子，而是通过
/// [`pipeline::send`](super::pipeline::send) 走固定的 校验 → 鉴权 → 转换 → 发送 → 解析 流程。
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// 渠道标识，如 `wecom`；注册时会 trim + 小写
    fn channel_type(&self) -> &str;

    /// 同名渠道冲突时的优先级，越大越优先
    fn weight(&self) -> i32 {
        0
    }

    /// 实现的完整类型名，权重相同时按字典序取较小者
    fn impl_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Webhook 类渠道的接收方隐含在配置里，可以不填 target
    fn allow_empty_target(&self) -> bool {
        false
    }

    /// 校验渠道必需的凭证字段，错误信息会原样返回给调用方
    fn check_config(&self, config: &PushConfig) -> Result<(), ChannelError>;

    /// 获取 token、组装请求体、发起请求并解析响应
    async fn do_send(
        &self,
        message: &PushMessage,
        config: &PushConfig,
    ) -> Result<PushResult, ChannelError>;

    /// 解析厂商原始响应
    fn parse_result(&self, raw: &str) -> PushResult;
}

/// 必填字段校验：缺失或空白时返回给定的错误信息
pub fn require<'a>(field: &'a Option<String>, msg: &str) -> Result<&'a str, ChannelError> {
    crate::model::config::non_blank(field).ok_or_else(|| ChannelError::invalid_config(msg))
}

/// 解析响应 JSON；非对象一律视为解析失败
pub fn parse_json_object(raw: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}
