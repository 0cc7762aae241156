//! Request handlers.

pub mod health;
pub mod users;
pub mod videos;

pub use health::*;
pub use users::*;
pub use videos::*;
