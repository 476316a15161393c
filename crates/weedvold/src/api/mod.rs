//! Docker volume plugin API.

mod protocol;
pub mod server;

pub use server::app;
