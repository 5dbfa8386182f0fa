pub mod auth;
pub mod core;
pub mod error;
pub mod models;
pub mod store;
pub mod theme;
pub mod utils;

// Re-export commonly used types and traits
pub use crate::auth::{IdentityProvider, TokenIdentityProvider};
pub use crate::core::{AppState, BlogService, Server};
pub use crate::error::{BlogError, BlogResult};
pub use crate::models::{BlogPost, Config, Identity, NewPost, Notice, PostUpdate};
pub use crate::store::{FileStore, MemoryStore, PostStore, Query};
pub use crate::theme::ThemeRenderer;
