mod store;

pub use store::{ConversationRecord, ConversationStore};
