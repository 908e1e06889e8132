use serde::{Deserialize, Serialize};

/// 单次调用的渠道凭证
///
/// 不属于任何渠道实例，由调用方每次发送时传入。哪些字段必填由具体渠道决定。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    /// CorpId / AppId / BotToken
    #[serde(default)]
    pub app_key: Option<String>,
    /// Secret（钉钉机器人为加签密钥）
    #[serde(default)]
    pub app_secret: Option<String>,
    /// AgentId（企业微信专用）
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Webhook 模式专用
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl PushConfig {
    /// 应用模式：appKey + appSecret
    pub fn app(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: Some(app_key.into()),
            app_secret: Some(app_secret.into()),
            ..Default::default()
        }
    }

    /// Webhook 模式
    pub fn webhook(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: Some(webhook_url.into()),
            ..Default::default()
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_secret(mut self, app_secret: impl Into<String>) -> Self {
        self.app_secret = Some(app_secret.into());
        self
    }
}

/// 取出非空白字段，否则返回 None
pub(crate) fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}
