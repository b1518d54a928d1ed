pub mod chat_session;
pub mod message_store;
pub mod user_turn;

pub use chat_session::ChatSession;
pub use message_store::MessageStore;
pub use user_turn::UserTurn;
