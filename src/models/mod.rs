pub mod common;
pub mod job;
pub mod project;
pub mod task;
pub mod token;
pub mod user;

// Re-export so we can do "use crate::models::{UserProfile, TokenPair};"
pub use common::*;
pub use job::*;
pub use project::*;
pub use task::*;
pub use token::*;
pub use user::*;
