pub mod client;
pub mod traits;

pub use client::{ReqwestHttpClient, DEFAULT_TIMEOUT_SECS};
pub use traits::HttpClient;

use crate::error::ChannelError;

/// 把查询参数编码后拼到 URL 上
pub fn with_query(url: &str, params: &[(&str, &str)]) -> Result<String, ChannelError> {
    let parsed = url::Url::parse_with_params(url, params)
        .map_err(|e| ChannelError::Transport(format!("Invalid URL {}: {}", url, e)))?;
    Ok(parsed.into())
}
