//! User accounts: profiles, statistics, password hashing and signed
//! access/refresh tokens.

pub mod auth;
pub mod models;
pub mod storage;

pub use auth::{AuthError, TokenSigner};
pub use models::{User, UserStatistics, UserUpdate};
pub use storage::UserStorage;
