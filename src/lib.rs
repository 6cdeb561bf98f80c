pub mod cache;
pub mod config;
pub mod metrics;
pub mod server;
pub mod store;

// Re-export commonly used types for easier testing
pub use config::Config;
pub use server::http_server::HttpServer;
pub use server::request_handler::RequestHandler;
