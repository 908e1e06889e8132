use async_trait::async_trait;

use crate::error::ChannelError;

/// 渠道使用的 HTTP 能力
///
/// 只返回响应体文本，不区分 2xx 与非 2xx：渠道必须自己检查响应体里的状态字段。
/// 超时由实现方负责。
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST JSON 请求体
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, ChannelError>;

    /// GET 请求，参数编码到查询串
    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<String, ChannelError>;
}
