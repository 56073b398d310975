//! Session lifecycle: identity, registry and idle eviction.

mod cleanup;
mod identity;
mod registry;

pub use cleanup::CleanupScheduler;
pub use identity::{
    ConnectionContext, SessionIdentity, TransportKind, ALL_TOOLS_MODE, DEFAULT_TOOLS_MODE,
    STDIO_SENTINEL,
};
pub use registry::{Session, SessionRegistry, SessionSettings};
