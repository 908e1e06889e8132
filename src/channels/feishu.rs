//! 飞书应用机器人消息
//!
//! 凭证：appKey = App ID，appSecret = App Secret。
//! Markdown / 文本卡片 / 图文统一渲染为 interactive 卡片。

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::ids;
use super::traits::{parse_json_object, require, ChannelAdapter};
use crate::cache::TokenCache;
use crate::error::ChannelError;
use crate::http::{with_query, HttpClient};
use crate::model::{MessageType, PushConfig, PushMessage, PushResult};

const API_BASE: &str = "https://open.feishu.cn";
const CACHE_KEY_PREFIX: &str = "feishu_token_";
const DEFAULT_EXPIRE: i64 = 7200;
const CARD_BUTTON_TEXT: &str = "详情";

/// 飞书消息接收者 ID 类型
///
/// 参考: <https://open.feishu.cn/document/server-docs/im-v1/message/create>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeishuReceiveIdType {
    /// 用户在某个应用中的身份，同一用户在不同应用中不同
    #[default]
    OpenId,
    /// 用户在某个开发商下的身份
    UnionId,
    /// 用户在某个租户内的身份
    UserId,
    /// 以用户的真实邮箱标识用户
    Email,
    /// 群 ID
    ChatId,
}

impl FeishuReceiveIdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenId => "open_id",
            Self::UnionId => "union_id",
            Self::UserId => "user_id",
            Self::Email => "email",
            Self::ChatId => "chat_id",
        }
    }
}

impl fmt::Display for FeishuReceiveIdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeishuReceiveIdType {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open_id" => Ok(Self::OpenId),
            "union_id" => Ok(Self::UnionId),
            "user_id" => Ok(Self::UserId),
            "email" => Ok(Self::Email),
            "chat_id" => Ok(Self::ChatId),
            other => Err(ChannelError::invalid_message(format!(
                "Unsupported Feishu receive_id_type: {}",
                other
            ))),
        }
    }
}

pub struct FeishuChannel {
    http: Arc<dyn HttpClient>,
    cache: Arc<TokenCache>,
    base_url: String,
}

impl FeishuChannel {
    pub fn new(http: Arc<dyn HttpClient>, cache: Arc<TokenCache>) -> Self {
        Self::with_base_url(http, cache, API_BASE)
    }

    pub fn with_base_url(
        http: Arc<dyn HttpClient>,
        cache: Arc<TokenCache>,
        base_url: &str,
    ) -> Self {
        Self {
            http,
            cache,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_url(&self) -> String {
        format!("{}/open-apis/auth/v3/tenant_access_token/internal", self.base_url)
    }

    fn send_url(&self) -> String {
        format!("{}/open-apis/im/v1/messages", self.base_url)
    }

    async fn access_token(&self, app_id: &str, app_secret: &str) -> Result<String, ChannelError> {
        let key = format!("{}{}", CACHE_KEY_PREFIX, app_id);
        self.cache
            .get_or_refresh(&key, || async {
                let body = json!({ "app_id": app_id, "app_secret": app_secret }).to_string();
                let raw = self.http.post_json(&self.auth_url(), &[], &body).await?;
                Self::parse_token_response(&raw)
            })
            .await
    }

    fn parse_token_response(raw: &str) -> Result<(String, i64), ChannelError> {
        let node = parse_json_object(raw)
            .ok_or_else(|| ChannelError::Token("Parse Feishu Token Response Fail".to_string()))?;
        let code = node.get("code").and_then(Value::as_i64).unwrap_or(0);
        let token = node
            .get("tenant_access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        match token {
            Some(token) if code == 0 => {
                let expire = node
                    .get("expire")
                    .and_then(Value::as_i64)
                    .unwrap_or(DEFAULT_EXPIRE);
                Ok((token.to_string(), expire))
            }
            _ => Err(ChannelError::Token(format!("Get Feishu Token Fail: {}", raw))),
        }
    }

    fn receive_id_type(message: &PushMessage) -> Result<FeishuReceiveIdType, ChannelError> {
        match message.extra_str("receive_id_type") {
            Some(value) => value.parse(),
            None => Ok(FeishuReceiveIdType::default()),
        }
    }

    /// 组装请求体；飞书的 content 字段是 JSON 字符串
    fn build_body(message: &PushMessage) -> Result<Value, ChannelError> {
        let (msg_type, content) = match message.msg_type().unwrap_or(MessageType::Text) {
            MessageType::Text => {
                let text = message.content().ok_or_else(|| {
                    ChannelError::invalid_message("Text message content cannot be null")
                })?;
                let text = match message.non_blank_title() {
                    Some(title) => format!("{}\n{}", title, text),
                    None => text.to_string(),
                };
                ("text", json!({ "text": text }))
            }
            MessageType::Image => {
                let media_id = message.extra_str("media_id").ok_or_else(|| {
                    ChannelError::invalid_message(
                        "Image message must have 'media_id' in extras (mapped to image_key)",
                    )
                })?;
                ("image", json!({ "image_key": media_id }))
            }
            MessageType::Markdown => {
                let content = message.content().ok_or_else(|| {
                    ChannelError::invalid_message("Markdown content cannot be null")
                })?;
                let mut card = card_skeleton(message.non_blank_title(), "blue");
                card["elements"] = json!([lark_md_div(content)]);
                ("interactive", card)
            }
            MessageType::TextCard => {
                let url = message
                    .extra_str("url")
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        ChannelError::invalid_message("TextCard message must have 'url' in extras")
                    })?;
                let mut card = card_skeleton(message.non_blank_title(), "wathet");
                card["elements"] = json!([
                    lark_md_div(message.content().unwrap_or_default()),
                    {
                        "tag": "action",
                        "actions": [{
                            "tag": "button",
                            "text": { "tag": "plain_text", "content": CARD_BUTTON_TEXT },
                            "url": url,
                            "type": "primary",
                        }],
                    },
                ]);
                ("interactive", card)
            }
            MessageType::News => {
                if message.articles().is_empty() {
                    return Err(ChannelError::invalid_message(
                        "News message must have at least one article",
                    ));
                }
                // 卡片里的图片需要先上传拿 image_key，这里只渲染文字
                let mut elements = Vec::with_capacity(message.articles().len() * 2);
                for article in message.articles() {
                    let md = format!(
                        "**[{}]({})**\n{}",
                        article.title,
                        article.url,
                        article.description.as_deref().unwrap_or_default()
                    );
                    elements.push(lark_md_div(&md));
                    elements.push(json!({ "tag": "hr" }));
                }
                let mut card = card_skeleton(None, "blue");
                card["elements"] = Value::Array(elements);
                ("interactive", card)
            }
        };

        Ok(json!({
            "receive_id": message.target().unwrap_or_default(),
            "msg_type": msg_type,
            "content": serde_json::to_string(&content)?,
        }))
    }
}

fn card_skeleton(title: Option<&str>, template: &str) -> Value {
    let mut card = json!({ "config": { "wide_screen_mode": true } });
    if let Some(title) = title {
        card["header"] = json!({
            "template": template,
            "title": { "tag": "plain_text", "content": title },
        });
    }
    card
}

fn lark_md_div(content: &str) -> Value {
    json!({ "tag": "div", "text": { "tag": "lark_md", "content": content } })
}

#[async_trait]
impl ChannelAdapter for FeishuChannel {
    fn channel_type(&self) -> &str {
        ids::FEISHU
    }

    fn weight(&self) -> i32 {
        100
    }

    fn check_config(&self, config: &PushConfig) -> Result<(), ChannelError> {
        require(&config.app_key, "Feishu App ID (appKey) cannot be empty")?;
        require(&config.app_secret, "Feishu App Secret (appSecret) cannot be empty")?;
        Ok(())
    }

    async fn do_send(
        &self,
        message: &PushMessage,
        config: &PushConfig,
    ) -> Result<PushResult, ChannelError> {
        let app_id = require(&config.app_key, "Feishu App ID (appKey) cannot be empty")?;
        let app_secret = require(&config.app_secret, "Feishu App Secret (appSecret) cannot be empty")?;

        let receive_id_type = Self::receive_id_type(message)?;
        let body = Self::build_body(message)?;
        let token = self.access_token(app_id, app_secret).await?;

        let url = with_query(&self.send_url(), &[("receive_id_type", receive_id_type.as_str())])?;
        let auth = format!("Bearer {}", token);
        let raw = self
            .http
            .post_json(&url, &[("Authorization", auth.as_str())], &serde_json::to_string(&body)?)
            .await
            .map_err(|e| ChannelError::Transport(format!("Feishu Send Exception: {}", e)))?;
        Ok(self.parse_result(&raw))
    }

    fn parse_result(&self, raw: &str) -> PushResult {
        let Some(node) = parse_json_object(raw) else {
            return PushResult::fail_with_raw("Parse Feishu Response Fail", raw);
        };

        let code = node.get("code").and_then(Value::as_i64).unwrap_or(0);
        if code == 0 {
            let msg_id = node
                .get("data")
                .and_then(|d| d.get("message_id"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            PushResult::success(msg_id, raw)
        } else {
            let msg = node.get("msg").and_then(Value::as_str).unwrap_or_default();
            PushResult::fail_with_raw(format!("Feishu Error: {} (code: {})", msg, code), raw)
        }
    }
}
