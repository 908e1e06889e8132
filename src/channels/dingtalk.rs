//! 钉钉自定义机器人（Webhook）
//!
//! 接收方由 webhookUrl 决定，target 可为空；填写时作为 @ 的用户 ID 列表（逗号分隔）。
//! 配置了 appSecret 时启用加签：`sign = sign(secret, "{timestamp}\n{secret}")`。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::ids;
use super::traits::{parse_json_object, require, ChannelAdapter};
use crate::error::ChannelError;
use crate::http::HttpClient;
use crate::model::config::non_blank;
use crate::model::{MessageType, PushConfig, PushMessage, PushResult};
use crate::sign::sign;

const CARD_BUTTON_TEXT: &str = "详情";

pub struct DingTalkChannel {
    http: Arc<dyn HttpClient>,
}

impl DingTalkChannel {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// 加签后的 webhook 地址；sign 已经 URL 编码，直接拼接
    fn signed_url(webhook_url: &str, secret: &str, timestamp_ms: i64) -> String {
        let signature = sign(secret, &format!("{}\n{}", timestamp_ms, secret));
        let sep = if webhook_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}timestamp={}&sign={}",
            webhook_url, sep, timestamp_ms, signature
        )
    }

    fn build_body(message: &PushMessage) -> Result<Value, ChannelError> {
        let mut body = match message.msg_type().unwrap_or(MessageType::Text) {
            MessageType::Text => {
                let content = message.content().ok_or_else(|| {
                    ChannelError::invalid_message("Text message content cannot be null")
                })?;
                let text = match message.non_blank_title() {
                    Some(title) => format!("{}\n{}", title, content),
                    None => content.to_string(),
                };
                json!({ "msgtype": "text", "text": { "content": text } })
            }
            MessageType::Markdown => {
                let content = message.content().ok_or_else(|| {
                    ChannelError::invalid_message("Markdown content cannot be null")
                })?;
                // 钉钉 markdown 的 title 必填，只用于会话列表预览
                let title = message
                    .non_blank_title()
                    .unwrap_or_else(|| content.lines().next().unwrap_or_default());
                json!({ "msgtype": "markdown", "markdown": { "title": title, "text": content } })
            }
            MessageType::TextCard => {
                let title = message.non_blank_title().ok_or_else(|| {
                    ChannelError::invalid_message("TextCard title cannot be blank")
                })?;
                let text = message
                    .content()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| {
                        ChannelError::invalid_message("TextCard description cannot be blank")
                    })?;
                let url = message
                    .extra_str("url")
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        ChannelError::invalid_message("TextCard message must have 'url' in extras")
                    })?;
                json!({
                    "msgtype": "actionCard",
                    "actionCard": {
                        "title": title,
                        "text": text,
                        "singleTitle": CARD_BUTTON_TEXT,
                        "singleURL": url,
                    },
                })
            }
            MessageType::Image => {
                // 机器人没有图片类型，用 markdown 图片语法承载（media_id 或图片 URL 均可）
                let media_id = message
                    .extra_str("media_id")
                    .or_else(|| message.extra_str("url"))
                    .ok_or_else(|| {
                        ChannelError::invalid_message("Image message must have 'media_id' in extras")
                    })?;
                let title = message.non_blank_title().unwrap_or("image");
                json!({
                    "msgtype": "markdown",
                    "markdown": { "title": title, "text": format!("![{}]({})", title, media_id) },
                })
            }
            MessageType::News => {
                if message.articles().is_empty() {
                    return Err(ChannelError::invalid_message(
                        "News message must have at least one article",
                    ));
                }
                let links: Vec<Value> = message
                    .articles()
                    .iter()
                    .map(|a| {
                        json!({
                            "title": a.title,
                            "messageURL": a.url,
                            "picURL": a.pic_url.as_deref().unwrap_or_default(),
                        })
                    })
                    .collect();
                json!({ "msgtype": "feedCard", "feedCard": { "links": links } })
            }
        };

        let at_user_ids: Vec<&str> = message
            .target()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if !at_user_ids.is_empty() {
            body["at"] = json!({ "atUserIds": at_user_ids });
        }

        Ok(body)
    }
}

#[async_trait]
impl ChannelAdapter for DingTalkChannel {
    fn channel_type(&self) -> &str {
        ids::DINGTALK
    }

    fn weight(&self) -> i32 {
        100
    }

    fn allow_empty_target(&self) -> bool {
        true
    }

    fn check_config(&self, config: &PushConfig) -> Result<(), ChannelError> {
        require(&config.webhook_url, "DingTalk Webhook URL cannot be empty")?;
        Ok(())
    }

    async fn do_send(
        &self,
        message: &PushMessage,
        config: &PushConfig,
    ) -> Result<PushResult, ChannelError> {
        let webhook_url = require(&config.webhook_url, "DingTalk Webhook URL cannot be empty")?;
        let body = Self::build_body(message)?;

        let url = match non_blank(&config.app_secret) {
            Some(secret) => {
                Self::signed_url(webhook_url, secret, chrono::Utc::now().timestamp_millis())
            }
            None => webhook_url.to_string(),
        };

        let raw = self
            .http
            .post_json(&url, &[], &serde_json::to_string(&body)?)
            .await?;
        Ok(self.parse_result(&raw))
    }

    fn parse_result(&self, raw: &str) -> PushResult {
        let Some(node) = parse_json_object(raw) else {
            return PushResult::fail_with_raw("Parse DingTalk Response Fail", raw);
        };

        if node.get("errcode").and_then(Value::as_i64).unwrap_or(0) == 0 {
            // 机器人接口不返回消息 ID
            PushResult::success("", raw)
        } else {
            let error_msg = node
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or(raw);
            PushResult::fail_with_raw(format!("DingTalk Error: {}", error_msg), raw)
        }
    }
}
