use thiserror::Error;

/// 单次发送过程中的错误
///
/// 管线会在边界处把它转换为失败的 `PushResult`，不会传递给调用方。
#[derive(Debug, Error)]
pub enum ChannelError {
    /// 消息字段缺失或不满足消息类型要求
    #[error("{0}")]
    InvalidMessage(String),

    /// 渠道凭证配置缺失
    #[error("{0}")]
    InvalidConfig(String),

    /// 获取 access token 失败（不会写入缓存）
    #[error("{0}")]
    Token(String),

    /// 网络层失败（连接、超时、读取响应体）
    #[error("{0}")]
    Transport(String),

    /// 请求体序列化失败
    #[error("Serialize Request Fail: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 渠道工厂实例化失败
    #[error("{0}")]
    Provider(String),
}

impl ChannelError {
    pub fn invalid_message(msg: impl Into<String>) -> Self {
        Self::InvalidMessage(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// 注册表错误：未知渠道或非法标识符
///
/// 这是唯一以硬错误返回给调用方的情况，属于编程/配置错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Channel type cannot be blank")]
    BlankType,

    #[error("Channel type mismatch: {requested} vs {declared}")]
    TypeMismatch { requested: String, declared: String },

    #[error("Channel not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_display_verbatim() {
        let err = ChannelError::invalid_config("WeCom AgentId cannot be empty");
        assert_eq!(err.to_string(), "WeCom AgentId cannot be empty");
    }

    #[test]
    fn serialize_error_has_prefix() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ChannelError::from(bad);
        assert!(err.to_string().starts_with("Serialize Request Fail"));
    }

    #[test]
    fn registry_not_found_names_the_type() {
        let err = RegistryError::NotFound("slack".to_string());
        assert_eq!(err.to_string(), "Channel not found: slack");
    }
}
