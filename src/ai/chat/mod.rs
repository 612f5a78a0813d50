mod core;
pub mod models;

pub use self::core::{ChatError, ChatService, ChatServiceBuilder};
pub use models::{Message, Role, Transcript};
