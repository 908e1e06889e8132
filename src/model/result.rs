use serde::{Deserialize, Serialize};

/// 统一发送结果
///
/// 成功时只有 `msg_id`，失败时只有 `error_msg`；`raw_result` 尽力保留上游原始响应，
/// 便于排查（网络调用之前就失败时为空）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_result: Option<String>,
}

impl PushResult {
    pub fn success(msg_id: impl Into<String>, raw_result: impl Into<String>) -> Self {
        Self {
            success: true,
            msg_id: Some(msg_id.into()),
            error_msg: None,
            raw_result: Some(raw_result.into()),
        }
    }

    pub fn fail(error_msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg_id: None,
            error_msg: Some(error_msg.into()),
            raw_result: None,
        }
    }

    pub fn fail_with_raw(error_msg: impl Into<String>, raw_result: impl Into<String>) -> Self {
        Self {
            raw_result: Some(raw_result.into()),
            ..Self::fail(error_msg)
        }
    }
}
