// Service exports
pub mod auth;
pub mod cache;
pub mod entity_store;
pub mod matching;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod text_gen;

pub use auth::{issue_token, AuthError, TokenVerifier};
pub use cache::{CacheError, CacheKey, CacheManager, CachedEntityStore};
pub use entity_store::{EntityStore, EntityStoreError, HttpEntityStore};
pub use matching::{Caller, Collaborators, MatchService, ServiceError};
pub use memory::{InMemoryEntityStore, MemoryStore};
pub use postgres::PostgresStore;
pub use store::{MatchRepository, PlanLookup, RematchCounterStore, ShareStore, StoreError};
pub use text_gen::{ChatCompletionClient, TextGenerationError, TextGenerator};
