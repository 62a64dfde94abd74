pub mod access;
pub mod login;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod subscription;
pub mod tick;

// Re-export what the binaries need to assemble the server.
pub use rest::{api_router, ApiDoc};
pub use state::AppState;
pub use tick::entitlement_watch;
