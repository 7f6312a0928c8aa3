pub mod auth;
pub mod bootstrap;
pub mod guard;
pub mod refresh;
pub mod session;

// Re-export from auth.rs so we can do "use crate::auth::*;"
pub use auth::Auth;
pub use bootstrap::Bootstrapper;
pub use guard::{GuardDecision, RouteGuard};
pub use refresh::{RefreshCoordinator, RefreshError};
pub use session::{Session, SessionContext, SessionStatus};
