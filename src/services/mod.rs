pub mod auth;
pub mod catalog;
pub mod community;
pub mod recommend;
pub mod suggestions;

pub use auth::{AccountService, SessionKeys};
pub use catalog::{ListFilter, MovieCatalog, TmdbCatalog};
pub use community::{CommunityStore, PgCommunityStore};
pub use recommend::{BrowseFilter, BrowseRequest, ChatReply, Recommender};
pub use suggestions::{GeminiSuggestions, Suggestion, SuggestionEngine};
