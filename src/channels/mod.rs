pub mod pipeline;
pub mod traits;

#[cfg(feature = "dingtalk")]
pub mod dingtalk;
#[cfg(feature = "feishu")]
pub mod feishu;
#[cfg(feature = "wecom")]
pub mod wecom;

use std::sync::Arc;

use crate::cache::TokenCache;
use crate::http::HttpClient;
use crate::registry::ChannelFactory;

pub use pipeline::send;
pub use traits::ChannelAdapter;

#[cfg(feature = "dingtalk")]
pub use dingtalk::DingTalkChannel;
#[cfg(feature = "feishu")]
pub use feishu::{FeishuChannel, FeishuReceiveIdType};
#[cfg(feature = "wecom")]
pub use wecom::WecomChannel;

/// 预置的渠道标识。注册表接受任意字符串，这里只是常用值。
pub mod ids {
    pub const WECOM: &str = "wecom";
    pub const DINGTALK: &str = "dingtalk";
    pub const FEISHU: &str = "feishu";
    pub const TELEGRAM: &str = "telegram";
    pub const EMAIL: &str = "email";
}

/// 内置渠道的工厂列表，由 cargo feature 决定包含哪些
///
/// 所有渠道共享同一个 HTTP 客户端和 token 缓存。
pub fn builtin_providers(http: Arc<dyn HttpClient>, cache: Arc<TokenCache>) -> Vec<ChannelFactory> {
    let mut factories: Vec<ChannelFactory> = Vec::new();

    #[cfg(feature = "wecom")]
    {
        let (http, cache) = (http.clone(), cache.clone());
        factories.push(Box::new(move || {
            Ok(Arc::new(WecomChannel::new(http, cache)) as Arc<dyn ChannelAdapter>)
        }));
    }

    #[cfg(feature = "feishu")]
    {
        let (http, cache) = (http.clone(), cache.clone());
        factories.push(Box::new(move || {
            Ok(Arc::new(FeishuChannel::new(http, cache)) as Arc<dyn ChannelAdapter>)
        }));
    }

    #[cfg(feature = "dingtalk")]
    {
        let http = http.clone();
        factories.push(Box::new(move || {
            Ok(Arc::new(DingTalkChannel::new(http)) as Arc<dyn ChannelAdapter>)
        }));
    }

    // 未启用任何渠道 feature 时参数不会被用到
    let _ = (http, cache);
    factories
}
