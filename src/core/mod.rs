pub mod feed;
pub mod server;
pub mod service;

pub use server::{router, AppState, Server};
pub use service::BlogService;
