// Knowledge store module
// SQLite persistence for knowledge records and chat history

pub mod sqlite;

pub use sqlite::Database;
pub use sqlite::models::{
    ChatRecord, KnowledgeRecord, NewChatRecord, NewKnowledgeRecord, SOURCE_FEEDBACK,
    SOURCE_MANUAL,
};
