//! 注册表集成测试：内置渠道发现、覆盖内置实现、并发读写

mod common;

use std::sync::Arc;

use async_trait::async_trait;

use common::{wecom_config, MockHttp, WECOM_TOKEN_OK};
use qingpush::channels::{builtin_providers, ids, WecomChannel};
use qingpush::http::{HttpClient, ReqwestHttpClient};
use qingpush::{
    dispatch, ChannelAdapter, ChannelError, ChannelFactory, ChannelRegistry, PushConfig,
    PushMessage, PushResult, TokenCache,
};

/// 自建的企业微信替代实现，权重高于内置
struct PrivateWecom;

#[async_trait]
impl ChannelAdapter for PrivateWecom {
    fn channel_type(&self) -> &str {
        ids::WECOM
    }

    fn weight(&self) -> i32 {
        200
    }

    fn check_config(&self, _config: &PushConfig) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn do_send(
        &self,
        _message: &PushMessage,
        _config: &PushConfig,
    ) -> Result<PushResult, ChannelError> {
        Ok(self.parse_result("{}"))
    }

    fn parse_result(&self, raw: &str) -> PushResult {
        PushResult::success("private", raw)
    }
}

fn reqwest_client() -> Arc<dyn HttpClient> {
    Arc::new(ReqwestHttpClient::default())
}

#[test]
fn builtin_channels_are_discovered() {
    let registry = ChannelRegistry::with_builtin(reqwest_client(), Arc::new(TokenCache::new()));
    assert_eq!(
        registry.channel_types(),
        vec![ids::DINGTALK, ids::FEISHU, ids::WECOM]
    );
    for channel_type in registry.channel_types() {
        assert_eq!(registry.get(&channel_type).unwrap().weight(), 100);
    }
}

#[tokio::test]
async fn higher_weight_provider_overrides_builtin() {
    let registry = ChannelRegistry::new();
    let mut providers: Vec<Result<ChannelFactory, ChannelError>> =
        builtin_providers(reqwest_client(), Arc::new(TokenCache::new()))
            .into_iter()
            .map(Ok)
            .collect();
    let private: ChannelFactory = Box::new(|| Ok(Arc::new(PrivateWecom) as Arc<dyn ChannelAdapter>));
    providers.insert(0, Ok(private));

    assert_eq!(registry.discover(providers), 4);
    assert_eq!(registry.len(), 3);

    let result = dispatch(&registry, "wecom", &PushMessage::text("u", "x"), &PushConfig::default())
        .await
        .unwrap();
    assert_eq!(result.msg_id.as_deref(), Some("private"));
}

#[tokio::test]
async fn broken_provider_does_not_block_the_rest() {
    let http = Arc::new(MockHttp::new(vec![WECOM_TOKEN_OK, r#"{"errcode":0,"msgid":"ok"}"#]));
    let cache = Arc::new(TokenCache::new());
    let client: Arc<dyn HttpClient> = http.clone();

    let wecom: ChannelFactory = Box::new(move || {
        Ok(Arc::new(WecomChannel::with_base_url(client, cache, common::MOCK_BASE))
            as Arc<dyn ChannelAdapter>)
    });
    let providers: Vec<Result<ChannelFactory, ChannelError>> = vec![
        Err(ChannelError::Provider("plugin jar missing".to_string())),
        Ok(Box::new(|| Err(ChannelError::Provider("bad credentials file".to_string())))),
        Ok(wecom),
    ];

    let registry = ChannelRegistry::new();
    assert_eq!(registry.discover(providers), 1);

    let result = dispatch(&registry, "wecom", &PushMessage::text("u", "x"), &wecom_config())
        .await
        .unwrap();
    assert!(result.success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispatch_shares_one_registry() {
    let http = Arc::new(MockHttp::default());
    for i in 0..16 {
        http.push(&format!(r#"{{"code":0,"msgid":"m{}"}}"#, i));
    }
    let registry = Arc::new(ChannelRegistry::new());
    registry
        .register(Arc::new(common::EchoChannel::new(http.clone())))
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let msg = PushMessage::text(format!("u{}", i), "x");
            dispatch(&registry, "echo", &msg, &PushConfig::webhook("http://mock.local/hook"))
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().success);
    }
    assert_eq!(http.request_count(), 16);
}
