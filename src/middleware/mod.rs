pub mod auth;
pub mod panic;
pub mod security_headers;
