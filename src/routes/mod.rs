pub mod api_routes;

use crate::service::chat_service::ChatService;
use crate::service::conversation_service::ConversationService;

/// Shared handler state: the two services, constructed once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: ChatService,
    pub conversation_service: ConversationService,
}
