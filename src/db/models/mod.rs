//! Database models split into domain-specific modules.

pub mod article;
pub mod category;
pub mod chat;
pub mod fraud_log;
pub mod user;

pub use article::*;
pub use category::*;
pub use chat::*;
pub use fraud_log::*;
pub use user::*;
