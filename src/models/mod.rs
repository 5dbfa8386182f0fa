pub mod config;
pub mod types;

pub use config::Config;
pub use types::{BlogPost, Identity, NewPost, NewRecord, Notice, NoticeLevel, PostUpdate};
