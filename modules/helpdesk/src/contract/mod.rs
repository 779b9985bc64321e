pub mod client;
pub mod error;
pub mod model;

pub use client::HelpdeskApi;
pub use error::HelpdeskError;
pub use model::*;
