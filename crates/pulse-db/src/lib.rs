//! Postgres persistence layer.
//!
//! Repositories for user identities and video records, plus pool setup and
//! embedded migrations.

pub mod error;
pub mod pool;
pub mod users;
pub mod videos;

pub use error::{DbError, DbResult};
pub use pool::{connect, connect_from_env, migrate, DbConfig};
pub use users::UserRepository;
pub use videos::VideoRepository;
