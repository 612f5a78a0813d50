use std::sync::Arc;

use crate::ai::chat::ChatService;

pub struct AppState {
    pub chat: ChatService,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self { chat }
    }
}

pub type SharedState = Arc<AppState>;
