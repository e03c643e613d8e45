mod error;
mod paths;
mod schema;
mod store;

pub use error::ConversationStoreError;
pub use paths::{default_state_path, state_path_under, STATE_DIR, STATE_FILE};
pub use schema::{
    ChatState, Conversation, ConversationMessage, Role, Settings, Theme, DEFAULT_BACKEND,
    DEFAULT_TITLE,
};
pub use store::{new_id, now_millis, ConversationStore};
