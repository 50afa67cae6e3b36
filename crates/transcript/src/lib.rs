//! # Context Transcript
//!
//! Chat turns whose context resolves lazily and is filtered on every read.
//!
//! ```text
//! ContextFragment[] (future)
//!     │
//!     └──> Interaction
//!            ├─> get_full_context()  resolve once, filter, cache
//!            ├─> to_chat()           messages + used context
//!            └─> to_json()           persisted record (legacy `context` mirror)
//! ```

mod context_cache;
mod error;
mod filter;
mod interaction;
mod transcript;

pub use context_cache::ContextState;
pub use error::{Result, TranscriptError};
pub use filter::filter_ignored_context;
pub use interaction::Interaction;
pub use transcript::{Transcript, TranscriptJson};
