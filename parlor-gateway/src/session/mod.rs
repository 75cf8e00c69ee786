//! Per-session conversation handling.
//!
//! ```text
//! router → SessionRegistry ─(lazy)→ SessionActor ─┬→ ConversationStore
//!                                                 ├→ ContextWindow
//!                                                 └→ InferenceGateway
//! ```

mod actor;
mod registry;
pub mod window;

pub use actor::{SendReply, SessionActor, SessionContext, DEFAULT_HISTORY_LIMIT};
pub use registry::SessionRegistry;
pub use window::{build_window, ContextWindow, DEFAULT_WINDOW_SIZE};
