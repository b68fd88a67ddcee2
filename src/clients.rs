pub mod encyclopedia;
pub mod llm;
pub mod search;

pub use encyclopedia::EncyclopediaClient;
pub use llm::LlmClient;
pub use search::{OfficialSearchClient, SearchItem};
