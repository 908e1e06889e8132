pub mod config;
pub mod message;
pub mod result;

pub use config::PushConfig;
pub use message::{Article, MessageType, PushMessage, PushMessageBuilder};
pub use result::PushResult;
