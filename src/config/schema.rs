use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{eyre, Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_SAFETY_MARGIN_SECS;
use crate::http::DEFAULT_TIMEOUT_SECS;
use crate::model::PushConfig;

/// 全局配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// 凭证档案，key 为档案名
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelProfile>,
}

/// HTTP 客户端设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// 单次请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Token 缓存设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// 提前多少秒把 token 视为过期
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: u64,
}

fn default_safety_margin_secs() -> u64 {
    DEFAULT_SAFETY_MARGIN_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            safety_margin_secs: default_safety_margin_secs(),
        }
    }
}

/// 一组渠道凭证
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelProfile {
    /// 渠道标识，省略时用档案名
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub app_key: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl ChannelProfile {
    pub fn to_push_config(&self) -> PushConfig {
        PushConfig {
            app_key: self.app_key.clone(),
            app_secret: self.app_secret.clone(),
            agent_id: self.agent_id.clone(),
            webhook_url: self.webhook_url.clone(),
        }
    }
}

/// 默认配置 TOML 模板
pub const DEFAULT_CONFIG_TOML: &str = r#"[http]
timeout_secs = 10

[cache]
safety_margin_secs = 200   # token 提前过期的秒数

# 在下方添加渠道凭证，档案名即默认渠道标识
# [channels.wecom]
# app_key = "ww_corp_id"
# app_secret = "your-secret"
# agent_id = "1000002"

# [channels.feishu]
# app_key = "cli_xxx"
# app_secret = "your-secret"

# [channels.dingtalk]
# webhook_url = "https://oapi.dingtalk.com/robot/send?access_token=xxx"
# app_secret = "SECxxx"          # 加签密钥（可选）

# 同一渠道多套凭证时用 channel 指明渠道
# [channels.ops-alert]
# channel = "dingtalk"
# webhook_url = "https://oapi.dingtalk.com/robot/send?access_token=yyy"
"#;

impl Config {
    /// 数据目录: `~/.qingpush`
    pub fn data_dir() -> Result<PathBuf> {
        let base_dirs =
            directories::BaseDirs::new().ok_or_else(|| eyre!("无法获取 home 目录"))?;
        Ok(base_dirs.home_dir().join(".qingpush"))
    }

    /// 配置文件路径: `~/.qingpush/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("config.toml"))
    }

    /// 日志目录: `~/.qingpush/logs`
    pub fn log_dir() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }

    /// 写入默认配置；文件已存在时不覆盖，返回是否新建
    pub fn init_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).wrap_err("创建配置目录失败")?;
        }
        std::fs::write(path, DEFAULT_CONFIG_TOML).wrap_err("写入默认配置失败")?;
        Ok(true)
    }

    /// 加载配置，如果配置文件不存在则创建默认配置
    pub fn load_or_init() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::init_at(&config_path)?;
        Self::load_from_path(&config_path)
    }

    /// 从指定路径加载配置（figment 多层合并）
    ///
    /// 环境变量用双下划线分隔层级，如 `QINGPUSH_HTTP__TIMEOUT_SECS=5`。
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("QINGPUSH_").split("__"))
            .extract()
            .wrap_err("解析配置文件失败")?;

        Ok(config)
    }

    /// 解析发送目标：返回 (渠道标识, 凭证)
    ///
    /// 指定了档案时渠道取档案的 `channel`（缺省为档案名）；
    /// 没指定档案时按渠道标识查同名档案，找不到就用空凭证。
    pub fn resolve(
        &self,
        channel: Option<&str>,
        profile: Option<&str>,
    ) -> Result<(String, PushConfig)> {
        if let Some(name) = profile {
            let found = self
                .channels
                .get(name)
                .ok_or_else(|| eyre!("配置中没有档案 [channels.{}]", name))?;
            let channel_type = match (channel, found.channel.as_deref()) {
                (Some(explicit), _) => explicit,
                (None, Some(declared)) => declared,
                (None, None) => name,
            };
            return Ok((channel_type.to_string(), found.to_push_config()));
        }

        let channel_type = channel.ok_or_else(|| eyre!("必须指定 --channel 或 --profile"))?;
        let config = self
            .channels
            .get(channel_type.trim().to_lowercase().as_str())
            .map(ChannelProfile::to_push_config)
            .unwrap_or_default();
        Ok((channel_type.to_string(), config))
    }
}
