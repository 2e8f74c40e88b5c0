//! The channel collection: owns a container's data stores, mediates their
//! lifecycle (create, attach, process, summarize, garbage-collect, delete),
//! and maintains the alias namespace used to discover root objects.
//!
//! See `DESIGN.md` at the repository root for how each module here is
//! grounded.

pub mod alias;
pub mod attach;
pub mod channel;
pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod gc;
pub mod id;
pub mod request;
pub mod router;
pub mod summary;
pub mod table;
pub mod upstream;
pub mod wire;

pub mod testutil;

pub use collection::ChannelCollection;
pub use config::Config;
pub use error::{Error, Severity};
pub use table::AliasOutcome;
