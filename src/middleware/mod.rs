pub mod auth;
pub mod security_headers;

pub use auth::{AuthMiddleware, OptionalViewer};
pub use security_headers::SecurityHeaders;
