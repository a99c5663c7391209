pub mod http;
pub mod loader;
pub mod search;
pub mod store;
