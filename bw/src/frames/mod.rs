//! Transport frames
//!
//! Every turn, chat or system-initiated, is delivered to the end-user surface
//! as an ordered sequence of named frames. The orchestrator emits them onto a
//! broadcast bus; the transport (SSE, websocket, CLI printer) subscribes.
//!
//! Per turn the order is fixed:
//!
//! ```text
//! Metadata → PatchProposal* → Navigation? → Text → Error? → Done
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, FrameBus, FrameEmitter};
pub use types::{TurnFrame, TurnKind};
