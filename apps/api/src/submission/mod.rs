// Exit interview submissions: per-session state, the validate → assemble →
// deliver pipeline and its HTTP handlers.

pub mod handlers;
pub mod pipeline;
pub mod session;
