//! 企业微信应用消息
//!
//! 凭证：appKey = CorpId，appSecret = 应用 Secret，agentId = 应用 AgentId。
//! 响应示例：
//! - 成功 `{"errcode":0,"errmsg":"ok","msgid":"..."}`
//! - 失败 `{"errcode":40014,"errmsg":"invalid access_token"}`

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::ids;
use super::traits::{parse_json_object, require, ChannelAdapter};
use crate::cache::TokenCache;
use crate::error::ChannelError;
use crate::http::HttpClient;
use crate::model::{MessageType, PushConfig, PushMessage, PushResult};

const API_BASE: &str = "https://qyapi.weixin.qq.com";
const CACHE_KEY_PREFIX: &str = "wecom_token_";
/// 官方返回的有效期通常为 7200 秒
const DEFAULT_EXPIRES_IN: i64 = 7200;
const CARD_BUTTON_TEXT: &str = "详情";

pub struct WecomChannel {
    http: Arc<dyn HttpClient>,
    cache: Arc<TokenCache>,
    base_url: String,
}

impl WecomChannel {
    pub fn new(http: Arc<dyn HttpClient>, cache: Arc<TokenCache>) -> Self {
        Self::with_base_url(http, cache, API_BASE)
    }

    /// 指定 API 地址（私有化部署或测试）
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

    fn token_url(&self) -> String {
        format!("{}/cgi-bin/gettoken", self.base_url)
    }

    fn send_url(&self, token: &str) -> String {
        format!("{}/cgi-bin/message/send?access_token={}", self.base_url, token)
    }

    /// 企业 ID + Secret 才能唯一确定一个 token
    fn cache_key(corp_id: &str, secret: &str) -> String {
        format!("{}{}_{}", CACHE_KEY_PREFIX, corp_id, secret)
    }

    async fn access_token(&self, corp_id: &str, secret: &str) -> Result<String, ChannelError> {
        let key = Self::cache_key(corp_id, secret);
        self.cache
            .get_or_refresh(&key, || async {
                let raw = self
                    .http
                    .get_json(&self.token_url(), &[("corpid", corp_id), ("corpsecret", secret)])
                    .await?;
                Self::parse_token_response(&raw)
            })
            .await
    }

    fn parse_token_response(raw: &str) -> Result<(String, i64), ChannelError> {
        let node = parse_json_object(raw)
            .ok_or_else(|| ChannelError::Token("Parse Token Response Fail".to_string()))?;
        match node.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => {
                let expires_in = node
                    .get("expires_in")
                    .and_then(Value::as_i64)
                    .unwrap_or(DEFAULT_EXPIRES_IN);
                Ok((token.to_string(), expires_in))
            }
            _ => Err(ChannelError::Token(format!("Get WeCom Token Fail: {}", raw))),
        }
    }

    /// 按消息类型组装请求体
    fn build_body(message: &PushMessage, agent_id: &str) -> Result<Value, ChannelError> {
        let mut body = json!({
            "touser": message.target().unwrap_or_default(),
            // agentid 官方为整数，非数字时原样透传
            "agentid": agent_id
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(agent_id)),
        });

        match message.msg_type().unwrap_or(MessageType::Text) {
            MessageType::Text => {
                let content = message.content().ok_or_else(|| {
                    ChannelError::invalid_message("Text message content cannot be null")
                })?;
                let text = match message.non_blank_title() {
                    Some(title) => format!("{}\n{}", title, content),
                    None => content.to_string(),
                };
                body["msgtype"] = json!("text");
                body["text"] = json!({ "content": text });
            }
            MessageType::Markdown => {
                // 企业微信 markdown 没有标题字段，标题需要写在 content 里
                let content = message.content().ok_or_else(|| {
                    ChannelError::invalid_message("Markdown content cannot be null")
                })?;
                body["msgtype"] = json!("markdown");
                body["markdown"] = json!({ "content": content });
            }
            MessageType::TextCard => {
                let title = message.non_blank_title().ok_or_else(|| {
                    ChannelError::invalid_message("TextCard title cannot be blank")
                })?;
                let description = message
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
                body["msgtype"] = json!("textcard");
                body["textcard"] = json!({
                    "title": title,
                    "description": description,
                    "url": url,
                    "btntxt": CARD_BUTTON_TEXT,
                });
            }
            MessageType::Image => {
                let media_id = message.extra_str("media_id").ok_or_else(|| {
                    ChannelError::invalid_message("Image message must have 'media_id' in extras")
                })?;
                body["msgtype"] = json!("image");
                body["image"] = json!({ "media_id": media_id });
            }
            MessageType::News => {
                if message.articles().is_empty() {
                    return Err(ChannelError::invalid_message(
                        "News message must have at least one article",
                    ));
                }
                body["msgtype"] = json!("news");
                body["news"] = json!({ "articles": message.articles() });
            }
        }

        Ok(body)
    }
}

#[async_trait]
impl ChannelAdapter for WecomChannel {
    fn channel_type(&self) -> &str {
        ids::WECOM
    }

    fn weight(&self) -> i32 {
        100
    }

    fn check_config(&self, config: &PushConfig) -> Result<(), ChannelError> {
        require(&config.app_key, "WeCom CorpId (appKey) cannot be empty")?;
        require(&config.app_secret, "WeCom Secret cannot be empty")?;
        require(&config.agent_id, "WeCom AgentId cannot be empty")?;
        Ok(())
    }

    async fn do_send(
        &self,
        message: &PushMessage,
        config: &PushConfig,
    ) -> Result<PushResult, ChannelError> {
        let corp_id = require(&config.app_key, "WeCom CorpId (appKey) cannot be empty")?;
        let secret = require(&config.app_secret, "WeCom Secret cannot be empty")?;
        let agent_id = require(&config.agent_id, "WeCom AgentId cannot be empty")?;

        // 先组装请求体，消息本身不合法时不必去拿 token
        let body = Self::build_body(message, agent_id)?;
        let token = self.access_token(corp_id, secret).await?;

        let raw = self
            .http
            .post_json(&self.send_url(&token), &[], &serde_json::to_string(&body)?)
            .await?;
        Ok(self.parse_result(&raw))
    }

    fn parse_result(&self, raw: &str) -> PushResult {
        let Some(node) = parse_json_object(raw) else {
            // 网关返回 502 HTML 之类
            return PushResult::fail_with_raw("Parse Response Fail", raw);
        };

        if node.get("errcode").and_then(Value::as_i64).unwrap_or(0) == 0 {
            let msg_id = node.get("msgid").and_then(Value::as_str).unwrap_or_default();
            PushResult::success(msg_id, raw)
        } else {
            let error_msg = node
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or(raw);
            PushResult::fail_with_raw(format!("WeCom Error: {}", error_msg), raw)
        }
    }
}
