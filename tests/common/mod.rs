//! 集成测试公共辅助函数
//!
//! 供 dispatch_e2e.rs 和 registry_integration.rs 共用。

// 每个集成测试文件只使用 common 的一部分，未用到的辅助函数属于预期 dead_code
#![allow(dead_code)]

pub mod mock_http;
pub use mock_http::MockHttp;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use qingpush::channels::traits::{parse_json_object, require};
use qingpush::http::HttpClient;
use qingpush::{
    ChannelAdapter, ChannelError, ChannelRegistry, PushConfig, PushMessage, PushResult, TokenCache,
};

/// 本地 mock 服务地址，渠道通过 with_base_url 指向这里
pub const MOCK_BASE: &str = "http://mock.local";

/// 用 MockHttp 构造内置渠道的注册表
pub fn registry_with(http: Arc<MockHttp>, cache: Arc<TokenCache>) -> ChannelRegistry {
    let registry = ChannelRegistry::new();
    let http: Arc<dyn HttpClient> = http;
    registry
        .register(Arc::new(qingpush::channels::WecomChannel::with_base_url(
            http.clone(),
            cache.clone(),
            MOCK_BASE,
        )))
        .unwrap();
    registry
        .register(Arc::new(qingpush::channels::FeishuChannel::with_base_url(
            http.clone(),
            cache,
            MOCK_BASE,
        )))
        .unwrap();
    registry
        .register(Arc::new(qingpush::channels::DingTalkChannel::new(http)))
        .unwrap();
    registry
}

pub fn wecom_config() -> PushConfig {
    PushConfig::app("ww_corp", "corp_secret").with_agent_id("1000002")
}

pub fn feishu_config() -> PushConfig {
    PushConfig::app("cli_app", "app_secret")
}

pub const WECOM_TOKEN_OK: &str =
    r#"{"errcode":0,"errmsg":"ok","access_token":"AT_1","expires_in":7200}"#;
pub const FEISHU_TOKEN_OK: &str =
    r#"{"code":0,"msg":"ok","tenant_access_token":"t-1","expire":7200}"#;

// ─── 通用测试渠道 ─────────────────────────────────────────────────────────────

/// 最小的 code/msgid 协议渠道：一次 POST，`code == 0` 为成功
pub struct EchoChannel {
    http: Arc<dyn HttpClient>,
}

impl EchoChannel {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChannelAdapter for EchoChannel {
    fn channel_type(&self) -> &str {
        "echo"
    }

    fn check_config(&self, config: &PushConfig) -> Result<(), ChannelError> {
        require(&config.webhook_url, "Echo Webhook URL cannot be empty")?;
        Ok(())
    }

    async fn do_send(
        &self,
        message: &PushMessage,
        config: &PushConfig,
    ) -> Result<PushResult, ChannelError> {
        let url = require(&config.webhook_url, "Echo Webhook URL cannot be empty")?;
        let body = serde_json::to_string(message)?;
        let raw = self.http.post_json(url, &[], &body).await?;
        Ok(self.parse_result(&raw))
    }

    fn parse_result(&self, raw: &str) -> PushResult {
        let Some(node) = parse_json_object(raw) else {
            return PushResult::fail_with_raw("Parse Response Fail", raw);
        };
        if node.get("code").and_then(Value::as_i64) == Some(0) {
            let msg_id = node.get("msgid").and_then(Value::as_str).unwrap_or_default();
            PushResult::success(msg_id, raw)
        } else {
            let error_msg = node.get("errmsg").and_then(Value::as_str).unwrap_or(raw);
            PushResult::fail_with_raw(format!("Echo Error: {}", error_msg), raw)
        }
    }
}
