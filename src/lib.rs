//! Spell Bridge
//!
//! Host-side runtime bridge for the SymSpell WebAssembly lookup engine.
//!
//! # Overview
//!
//! The engine is a precompiled linear-memory module that performs
//! approximate-string dictionary lookups. This crate is everything on the
//! host side of that boundary:
//!
//! - **MemoryBridge**: safe host→guest byte transfer into a relocatable
//!   linear memory (the guest may grow — and thereby move — its memory on
//!   any call)
//! - **WireCodec**: decoding of the length-prefixed ranked-result stream
//!   the guest writes back, as zero-copy views with lazily decoded terms
//! - **ModuleFacade**: the four guest entry points and the single result
//!   callback, wrapped into a synchronous request/response surface
//! - **WorkerChannel**: a facade hosted on its own worker thread, driven
//!   by message passing with at most one request in flight
//!
//! # Data flow
//!
//! ```text
//! caller text
//!      │
//!      ▼
//! ┌─────────────┐    encode     ┌──────────────┐   write at 0
//! │ TextEncoding│──────────────►│ MemoryBridge │──────────────┐
//! └─────────────┘               └──────────────┘              ▼
//!                                                     guest linear memory
//! ┌─────────────┐  result_handler(offset, len)                │
//! │ ModuleFacade│◄────────────────────────────────────────────┘
//! └──────┬──────┘
//!        │ copied window
//!        ▼
//! ┌─────────────┐
//! │  WireCodec  │──► ResultBatch ──► caller (or WorkerChannel)
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use spell_bridge::{LookupOptions, ModuleFacade, SliceSource, SpellerOptions};
//!
//! # async fn run() -> spell_bridge::BridgeResult<()> {
//! let mut facade =
//!     ModuleFacade::from_file("engine.wasm", SpellerOptions::default())?;
//!
//! let mut dictionary = SliceSource::new(&b"hello 100\nworld 50\n"[..]);
//! facade.ingest_dictionary(&mut dictionary, false).await?;
//!
//! let batch = facade.lookup("helo", &LookupOptions::default())?;
//! for record in &batch {
//!     println!("{} (distance {})", record.term()?, record.distance());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Guest module requirements
//!
//! The engine module must:
//!
//! 1. Export its linear memory as `memory`
//! 2. Export `symspell(max_edit_distance, count_threshold)`,
//!    `write_to_dictionary(offset, length, is_secondary)`,
//!    `lookup(offset, length, verbosity, max_edit_distance,
//!    include_unknown, include_self)`, and
//!    `lookup_compound(offset, length, max_edit_distance)`
//! 3. Import `env::result_handler(offset, length)` and invoke it exactly
//!    once, synchronously, per lookup

pub mod codec;
pub mod dictionary;
pub mod encoding;
pub mod error;
pub mod memory;
pub mod wasm;
pub mod worker;

// Re-exports for convenience
pub use codec::{ResultBatch, SuggestionRecord, TermLengthWidth, WireCodec};
pub use dictionary::{DictionarySource, FileSource, SliceSource, DEFAULT_CHUNK_SIZE};
pub use encoding::{TextEncoding, Utf8, Utf8Lossy};
pub use error::{BridgeError, BridgeResult};
pub use memory::{LinearMemory, MemoryBridge, MemoryIdentity};
pub use wasm::{LookupOptions, ModuleFacade, SpellerOptions, Verbosity};
pub use worker::{WorkerChannel, WorkerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
