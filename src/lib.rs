pub mod cache;
pub mod channels;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod registry;
pub mod sign;

pub use cache::TokenCache;
pub use channels::ChannelAdapter;
pub use error::{ChannelError, RegistryError};
pub use model::{Article, MessageType, PushConfig, PushMessage, PushResult};
pub use registry::{dispatch, ChannelFactory, ChannelRegistry};
