//! # Context Retrieval
//!
//! Workspace scanning and context assembly for chat requests.
//!
//! ## Pipeline
//!
//! ```text
//! Target file
//!     │
//!     ├──> Workspace (injected capability set)
//!     │      └─> listings, reads, pattern searches (20s deadline)
//!     │
//!     ├──> File Scanner (size cap, decode, failure → skip)
//!     │
//!     ├──> Test File Matcher (naming conventions)
//!     │
//!     └──> Context Assembler (truncate, pair, early exit)
//!            └─> ContextFragment[]
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use context_retrieval::{AssembleRequest, AssemblerConfig, ContextAssembler, LocalWorkspace};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let workspace = Arc::new(LocalWorkspace::new("/path/to/project"));
//!     let assembler = ContextAssembler::new(workspace, AssemblerConfig::default());
//!     let request = AssembleRequest::new("/path/to/project/src/lib.rs");
//!
//!     for fragment in assembler.assemble(&request).await {
//!         println!("{:?}", fragment.file().map(|f| &f.file_name));
//!     }
//! }
//! ```

mod assembler;
mod config;
mod error;
mod local;
mod scanner;
pub mod test_files;
mod truncate;
mod workspace;

pub use assembler::{AssembleRequest, ContextAssembler};
pub use config::AssemblerConfig;
pub use error::{Result, RetrievalError};
pub use local::LocalWorkspace;
pub use scanner::FileScanner;
pub use truncate::{estimate_tokens, truncate_text, truncate_text_start, CHARS_PER_TOKEN};
pub use workspace::{DirEntry, EntryKind, FileQuery, FileStat, Workspace};
