//! Guest Memory Bridge
//!
//! All host→guest transfers stage their bytes at offset 0 of the guest's
//! linear memory. That memory is relocatable: any call into the guest may
//! grow it, which moves the backing allocation and invalidates every view
//! taken before the growth. The bridge caches one [`TransferWindow`] and
//! revalidates it against the live memory's identity token before every
//! write, recreating it only when it has actually gone stale.

use crate::error::{BridgeError, BridgeResult};

/// WebAssembly page size in bytes
pub const PAGE_SIZE: usize = 65536;

/// Identity token of a guest memory's current backing allocation.
///
/// Both fields change when the guest grows memory; a view captured against
/// one identity must never be used once the live memory reports another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryIdentity {
    base: usize,
    len: usize,
}

impl MemoryIdentity {
    pub fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }
}

/// A relocatable guest linear memory, as seen by the bridge.
///
/// Implemented by the wasmtime-backed view in the facade; tests provide
/// native implementations.
pub trait LinearMemory {
    /// Identity token of the current backing allocation
    fn identity(&mut self) -> MemoryIdentity;

    /// Current byte capacity
    fn len(&mut self) -> usize;

    /// Grow the memory so at least `required` bytes are addressable.
    ///
    /// Failing to reach `required` (the guest's declared maximum is smaller)
    /// is a fatal configuration error.
    fn ensure_len(&mut self, required: usize) -> BridgeResult<()>;

    /// Copy `bytes` into the memory starting at `offset`
    fn write_at(&mut self, offset: usize, bytes: &[u8]) -> BridgeResult<()>;
}

/// Bounded view at offset 0 used for all host→guest writes.
///
/// Valid only while `identity` matches the live memory and `len` covers the
/// chunk about to be written.
#[derive(Debug, Clone, Copy)]
struct TransferWindow {
    identity: MemoryIdentity,
    len: usize,
}

/// Stages variable-length chunks at offset 0 of a relocatable guest memory
#[derive(Debug, Default)]
pub struct MemoryBridge {
    window: Option<TransferWindow>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self { window: None }
    }

    /// Write `chunk` to offset 0, recreating the transfer window first if it
    /// is missing, stale, or too small.
    ///
    /// The caller is responsible for then invoking the guest entry point
    /// that consumes bytes `[0, chunk.len())` — and must assume the window
    /// is stale again once that call returns.
    pub fn write<M: LinearMemory>(&mut self, memory: &mut M, chunk: &[u8]) -> BridgeResult<()> {
        let live = memory.identity();
        let usable = match self.window {
            Some(w) if w.identity == live && w.len >= chunk.len() => true,
            _ => false,
        };

        if !usable {
            memory.ensure_len(chunk.len())?;
            // Growth relocates; capture the identity after it, not before.
            self.window = Some(TransferWindow {
                identity: memory.identity(),
                len: memory.len(),
            });
        }

        memory.write_at(0, chunk)
    }

    /// Drop the cached window; the next write recreates it
    pub fn invalidate(&mut self) {
        self.window = None;
    }

    /// Length of the cached window, if one is held
    pub fn window_len(&self) -> Option<usize> {
        self.window.map(|w| w.len)
    }
}

/// Number of whole pages needed to cover `bytes`
pub fn pages_for(bytes: usize) -> u64 {
    bytes.div_ceil(PAGE_SIZE) as u64
}
