pub mod schema;

pub use schema::{CacheConfig, ChannelProfile, Config, HttpConfig, DEFAULT_CONFIG_TOML};
