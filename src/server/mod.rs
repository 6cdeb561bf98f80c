pub mod http_server;
pub mod middleware;
pub mod request_handler;
pub mod response;
pub mod static_files;
pub mod tls;

pub use http_server::HttpServer;
pub use middleware::{Flow, MiddlewareChain};
pub use request_handler::RequestHandler;
pub use response::{ApiResponse, ResponseBuilder};
pub use static_files::StaticFileHandler;
pub use tls::TlsManager;
