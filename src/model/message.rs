use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// 文本（最常用）
    Text,
    /// Markdown
    Markdown,
    /// 文本卡片：标题 + 摘要 + 跳转链接
    TextCard,
    /// 图片（需要 extras.media_id）
    Image,
    /// 图文（articles 列表）
    News,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Markdown => "MARKDOWN",
            Self::TextCard => "TEXT_CARD",
            Self::Image => "IMAGE",
            Self::News => "NEWS",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    /// 大小写不敏感，`text_card` / `textcard` / `text-card` 均可
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "text" => Ok(Self::Text),
            "markdown" | "md" => Ok(Self::Markdown),
            "text_card" | "textcard" => Ok(Self::TextCard),
            "image" => Ok(Self::Image),
            "news" => Ok(Self::News),
            other => Err(format!("unknown message type: {}", other)),
        }
    }
}

/// 图文条目
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    #[serde(rename = "picurl", default, skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_pic_url(mut self, pic_url: impl Into<String>) -> Self {
        self.pic_url = Some(pic_url.into());
        self
    }

    fn check(&self) -> Result<(), ChannelError> {
        if self.title.trim().is_empty() {
            return Err(ChannelError::invalid_message("Article title cannot be null"));
        }
        if self.url.trim().is_empty() {
            return Err(ChannelError::invalid_message("Article URL cannot be null"));
        }
        Ok(())
    }
}

fn default_type() -> Option<MessageType> {
    Some(MessageType::Text)
}

/// 一条逻辑推送消息，构造后不可变
///
/// `msg_type` 缺省为 TEXT；只有 JSON 里显式写 `"type": null` 时才会为空，
/// 这种消息会在发送管线中被拒绝。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    target: Option<String>,
    #[serde(rename = "type", default = "default_type")]
    msg_type: Option<MessageType>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    extras: HashMap<String, Value>,
    #[serde(default)]
    articles: Vec<Article>,
}

impl PushMessage {
    pub fn builder() -> PushMessageBuilder {
        PushMessageBuilder::default()
    }

    /// 普通文本
    pub fn text(target: impl Into<String>, content: impl Into<String>) -> Self {
        Self::builder()
            .msg_type(MessageType::Text)
            .target(target)
            .content(content)
            .build()
    }

    /// Markdown，标题可选
    pub fn markdown(
        target: impl Into<String>,
        title: Option<&str>,
        content: impl Into<String>,
    ) -> Self {
        let mut builder = Self::builder()
            .msg_type(MessageType::Markdown)
            .target(target)
            .content(content);
        if let Some(title) = title {
            builder = builder.title(title);
        }
        builder.build()
    }

    /// 文本卡片，跳转链接放在 extras.url
    pub fn text_card(
        target: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        jump_url: impl Into<String>,
    ) -> Self {
        Self::builder()
            .msg_type(MessageType::TextCard)
            .target(target)
            .title(title)
            .content(content)
            .extra("url", Value::String(jump_url.into()))
            .build()
    }

    /// 图片消息，media_id 放在 extras.media_id
    pub fn image(target: impl Into<String>, media_id: impl Into<String>) -> Self {
        Self::builder()
            .msg_type(MessageType::Image)
            .target(target)
            .extra("media_id", Value::String(media_id.into()))
            .build()
    }

    /// 单条图文
    pub fn news_single(target: impl Into<String>, article: Article) -> Result<Self, ChannelError> {
        Self::news(target, vec![article])
    }

    /// 多条图文，列表不能为空，每条都必须有标题和链接
    pub fn news(target: impl Into<String>, articles: Vec<Article>) -> Result<Self, ChannelError> {
        if articles.is_empty() {
            return Err(ChannelError::invalid_message("News articles cannot be empty"));
        }
        for article in &articles {
            article.check()?;
        }
        Ok(Self::builder()
            .msg_type(MessageType::News)
            .target(target)
            .articles(articles)
            .build())
    }

    /// 只替换接收者，其余字段（包括未设置的类型）保持原样
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn msg_type(&self) -> Option<MessageType> {
        self.msg_type
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// 非空白标题
    pub fn non_blank_title(&self) -> Option<&str> {
        self.title().filter(|t| !t.trim().is_empty())
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn extras(&self) -> &HashMap<String, Value> {
        &self.extras
    }

    /// 以字符串形式读取 extras 中的值；null 视为不存在，数字等按 JSON 文本输出
    pub fn extra_str(&self, key: &str) -> Option<String> {
        match self.extras.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }
}

/// `PushMessage` 构造器
#[derive(Debug, Clone)]
pub struct PushMessageBuilder {
    inner: PushMessage,
}

impl Default for PushMessageBuilder {
    fn default() -> Self {
        Self {
            inner: PushMessage {
                target: None,
                msg_type: default_type(),
                title: None,
                content: None,
                extras: HashMap::new(),
                articles: Vec::new(),
            },
        }
    }
}

impl PushMessageBuilder {
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.inner.target = Some(target.into());
        self
    }

    pub fn msg_type(mut self, msg_type: MessageType) -> Self {
        self.inner.msg_type = Some(msg_type);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.inner.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.inner.content = Some(content.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.extras.insert(key.into(), value.into());
        self
    }

    pub fn articles(mut self, articles: Vec<Article>) -> Self {
        self.inner.articles = articles;
        self
    }

    pub fn article(mut self, article: Article) -> Self {
        self.inner.articles.push(article);
        self
    }

    pub fn build(self) -> PushMessage {
        self.inner
    }
}
