pub mod server;

pub use server::{Handler, ServerError, ServerHandle, serve, serve_with};
