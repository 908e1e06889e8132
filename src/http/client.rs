use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::{debug, warn};

use super::traits::HttpClient;
use crate::error::ChannelError;

/// 默认单次请求超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// 基于 reqwest 的 HTTP 实现，进程内复用同一个连接池
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn read_body(resp: reqwest::Response, url: &str) -> Result<String, ChannelError> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ChannelError::Transport(format!("Read Response Fail: {}", e)))?;
        if !status.is_success() {
            // 状态码不做特殊处理，交给渠道解析响应体
            warn!("HTTP {} <- {}", status, strip_query(url));
        }
        Ok(text)
    }
}

/// 日志里去掉查询串，避免输出 access_token / secret
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<String, ChannelError> {
        debug!("POST {}", strip_query(url));
        let mut req = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json; charset=utf-8");
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ChannelError::Transport(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ChannelError::Transport(format!("Invalid header value: {}", e)))?;
            req = req.header(name, value);
        }

        let resp = req
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("HTTP Request Fail: {}", e)))?;
        Self::read_body(resp, url).await
    }

    async fn get_json(&self, url: &str, params: &[(&str, &str)]) -> Result<String, ChannelError> {
        let full_url = super::with_query(url, params)?;
        debug!("GET {}", strip_query(&full_url));
        let resp = self
            .client
            .get(&full_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(format!("HTTP Request Fail: {}", e)))?;
        Self::read_body(resp, &full_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_ten_seconds() {
        assert_eq!(ReqwestHttpClient::default().timeout(), Duration::from_secs(10));
    }

    #[test]
    fn strip_query_hides_token() {
        assert_eq!(
            strip_query("https://qyapi.weixin.qq.com/cgi-bin/message/send?access_token=abc"),
            "https://qyapi.weixin.qq.com/cgi-bin/message/send"
        );
        assert_eq!(strip_query("https://a.b/c"), "https://a.b/c");
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        // port 1: 立即 connection refused
        let client = ReqwestHttpClient::new(Duration::from_secs(2));
        let err = client
            .post_json("http://127.0.0.1:1/send", &[], "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
        assert!(err.to_string().starts_with("HTTP Request Fail"));
    }

    #[tokio::test]
    async fn invalid_header_is_rejected_before_sending() {
        let client = ReqwestHttpClient::default();
        let err = client
            .post_json("http://127.0.0.1:1/send", &[("bad header", "x")], "{}")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid header name"));
    }
}
