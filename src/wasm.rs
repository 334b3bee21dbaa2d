//! Lookup Engine Facade
//!
//! Owns one instance of the precompiled lookup engine module and presents
//! its four entry points (`symspell`, `write_to_dictionary`, `lookup`,
//! `lookup_compound`) as typed, synchronous operations. The engine returns
//! results by invoking the imported `env::result_handler(offset, length)`
//! callback from inside the host's call into it; the handler copies that
//! window out of guest memory before returning control, because the guest
//! is free to reuse the region on its next action.
//!
//! A facade is constructed directly into the ready state: instantiation
//! plus the one-time `symspell` initialization either succeed together or
//! fail terminally. A failed facade is never retried — callers construct a
//! fresh one.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wasmtime::{Caller, Engine, Instance, Linker, Memory, Module, Store, TypedFunc};

use crate::codec::{ResultBatch, TermLengthWidth, WireCodec, STREAM_TERMINATOR};
use crate::dictionary::DictionarySource;
use crate::encoding::{TextEncoding, Utf8};
use crate::error::{BridgeError, BridgeResult};
use crate::memory::{pages_for, LinearMemory, MemoryBridge, MemoryIdentity};

/// How many and which ranked suggestions a lookup returns.
///
/// The policy is applied by the guest; the host only transports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// The single highest-frequency suggestion at the smallest distance found
    Top,
    /// All suggestions at the smallest distance found, by descending frequency
    #[default]
    Closest,
    /// All suggestions within the maximum distance, by ascending distance
    /// then descending frequency
    All,
}

impl Verbosity {
    fn as_wire(self) -> i32 {
        match self {
            Verbosity::Top => 0,
            Verbosity::Closest => 1,
            Verbosity::All => 2,
        }
    }
}

/// Construction-time engine configuration.
///
/// Passed explicitly to every facade; there are no process-wide defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpellerOptions {
    /// Maximum edit distance the dictionary index is built for
    pub dictionary_edit_distance: u32,
    /// Minimum occurrence count for a dictionary entry to be considered a
    /// valid correction
    pub count_threshold: u32,
    /// Term-length framing of the result wire format; part of the guest
    /// module's contract version
    pub term_length: TermLengthWidth,
}

impl Default for SpellerOptions {
    fn default() -> Self {
        Self {
            dictionary_edit_distance: 2,
            count_threshold: 1,
            term_length: TermLengthWidth::default(),
        }
    }
}

/// Per-lookup request options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LookupOptions {
    pub verbosity: Verbosity,
    /// Must not exceed the `dictionary_edit_distance` the facade was
    /// initialized with; violating this is a guest-side contract violation
    /// and is the caller's responsibility, not defended against here.
    pub max_edit_distance: u32,
    /// Report the input itself (with a sentinel distance above the
    /// requested maximum) when nothing matches
    pub include_unknown: bool,
    /// Report an exact dictionary hit as a distance-0 suggestion
    pub include_self: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Closest,
            max_edit_distance: 2,
            include_unknown: false,
            include_self: false,
        }
    }
}

/// State held by the store: the result window captured by the guest's
/// callback during the current call
#[derive(Debug, Default)]
struct HostState {
    pending: Option<Bytes>,
    callbacks: u32,
}

impl HostState {
    fn begin_call(&mut self) {
        self.pending = None;
        self.callbacks = 0;
    }
}

/// One lookup engine instance and its typed entry points
pub struct ModuleFacade {
    store: Store<HostState>,
    memory: Memory,
    ingest_fn: TypedFunc<(i32, i32, i32), ()>,
    lookup_fn: TypedFunc<(i32, i32, i32, i32, i32, i32), ()>,
    compound_fn: TypedFunc<(i32, i32, i32), ()>,
    bridge: MemoryBridge,
    codec: WireCodec,
    encoding: Arc<dyn TextEncoding>,
    options: SpellerOptions,
}

impl ModuleFacade {
    /// Load the engine module from a file and initialize it
    pub fn from_file(path: impl AsRef<Path>, options: SpellerOptions) -> BridgeResult<Self> {
        let path = path.as_ref();
        info!("loading lookup engine module from {:?}", path);

        let wasm = std::fs::read(path).map_err(|e| {
            BridgeError::module(format!("failed to read module {:?}: {}", path, e))
        })?;
        Self::from_bytes(&wasm, options)
    }

    /// Instantiate and initialize the engine from module bytes
    pub fn from_bytes(wasm: &[u8], options: SpellerOptions) -> BridgeResult<Self> {
        Self::with_encoding(wasm, options, Arc::new(Utf8))
    }

    /// Instantiate with an explicit text-encoding strategy
    pub fn with_encoding(
        wasm: &[u8],
        options: SpellerOptions,
        encoding: Arc<dyn TextEncoding>,
    ) -> BridgeResult<Self> {
        let engine = Engine::default();
        let module = Module::new(&engine, wasm)
            .map_err(|e| BridgeError::module_with_source("failed to compile engine module", e))?;

        debug!("engine module compiled");

        let mut linker: Linker<HostState> = Linker::new(&engine);
        register_result_handler(&mut linker)?;

        let mut store = Store::new(&engine, HostState::default());
        let instance = linker.instantiate(&mut store, &module).map_err(|e| {
            BridgeError::module_with_source("failed to instantiate engine module", e)
        })?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| BridgeError::module("engine module has no memory export"))?;

        let init_fn = entry_point::<(i32, i32), ()>(&instance, &mut store, "symspell")?;
        let ingest_fn =
            entry_point::<(i32, i32, i32), ()>(&instance, &mut store, "write_to_dictionary")?;
        let lookup_fn =
            entry_point::<(i32, i32, i32, i32, i32, i32), ()>(&instance, &mut store, "lookup")?;
        let compound_fn =
            entry_point::<(i32, i32, i32), ()>(&instance, &mut store, "lookup_compound")?;

        // One-time initialization; a trap here is as terminal as a failed
        // instantiation.
        init_fn
            .call(
                &mut store,
                (
                    options.dictionary_edit_distance as i32,
                    options.count_threshold as i32,
                ),
            )
            .map_err(|e| BridgeError::module_with_source("engine initialization trapped", e))?;

        info!(
            dictionary_edit_distance = options.dictionary_edit_distance,
            count_threshold = options.count_threshold,
            encoding = encoding.name(),
            "lookup engine initialized"
        );

        let codec = WireCodec::with_encoding(options.term_length, Arc::clone(&encoding));

        Ok(Self {
            store,
            memory,
            ingest_fn,
            lookup_fn,
            compound_fn,
            bridge: MemoryBridge::new(),
            codec,
            encoding,
            options,
        })
    }

    /// The configuration this facade was initialized with
    pub fn options(&self) -> &SpellerOptions {
        &self.options
    }

    /// Feed one chunk of newline-delimited dictionary text to the engine.
    ///
    /// `is_secondary` selects the bigram dictionary channel used for
    /// compound lookups. The engine buffers partial trailing lines; callers
    /// streaming a whole source should finish with
    /// [`ingest_dictionary`](Self::ingest_dictionary), which transmits the
    /// terminating newline.
    pub fn ingest_dictionary_chunk(
        &mut self,
        chunk: &[u8],
        is_secondary: bool,
    ) -> BridgeResult<()> {
        self.write_chunk(chunk)?;
        self.ingest_fn
            .call(
                &mut self.store,
                (0, chunk.len() as i32, is_secondary as i32),
            )
            .map_err(|e| BridgeError::module_with_source("dictionary ingestion trapped", e))?;
        Ok(())
    }

    /// Stream a whole dictionary source into the engine, then flush its
    /// trailing entry with a terminating newline
    pub async fn ingest_dictionary<S>(
        &mut self,
        source: &mut S,
        is_secondary: bool,
    ) -> BridgeResult<()>
    where
        S: DictionarySource + ?Sized,
    {
        let mut total = 0usize;
        while let Some(chunk) = source.next_chunk().await? {
            total += chunk.len();
            self.ingest_dictionary_chunk(&chunk, is_secondary)?;
        }
        self.ingest_dictionary_chunk(STREAM_TERMINATOR, is_secondary)?;
        debug!(total_bytes = total, is_secondary, "dictionary stream ingested");
        Ok(())
    }

    /// Single-term lookup, decoded into a ranked batch
    pub fn lookup(&mut self, text: &str, options: &LookupOptions) -> BridgeResult<ResultBatch> {
        let raw = self.lookup_raw(text, options)?;
        self.codec.decode_batch(&raw, 0, raw.len())
    }

    /// Single-term lookup returning the undecoded result buffer (an
    /// independent copy, safe to hold or ship across threads)
    pub fn lookup_raw(&mut self, text: &str, options: &LookupOptions) -> BridgeResult<Bytes> {
        let bytes = self.encoding.encode(text);
        self.write_chunk(&bytes)?;

        self.store.data_mut().begin_call();
        self.lookup_fn
            .call(
                &mut self.store,
                (
                    0,
                    bytes.len() as i32,
                    options.verbosity.as_wire(),
                    options.max_edit_distance as i32,
                    options.include_unknown as i32,
                    options.include_self as i32,
                ),
            )
            .map_err(|e| BridgeError::module_with_source("lookup trapped", e))?;
        self.take_result()
    }

    /// Multi-word lookup, decoded into a ranked batch
    pub fn lookup_compound(
        &mut self,
        text: &str,
        max_edit_distance: u32,
    ) -> BridgeResult<ResultBatch> {
        let raw = self.lookup_compound_raw(text, max_edit_distance)?;
        self.codec.decode_batch(&raw, 0, raw.len())
    }

    /// Multi-word lookup returning the undecoded result buffer
    pub fn lookup_compound_raw(
        &mut self,
        text: &str,
        max_edit_distance: u32,
    ) -> BridgeResult<Bytes> {
        let bytes = self.encoding.encode(text);
        self.write_chunk(&bytes)?;

        self.store.data_mut().begin_call();
        self.compound_fn
            .call(
                &mut self.store,
                (0, bytes.len() as i32, max_edit_distance as i32),
            )
            .map_err(|e| BridgeError::module_with_source("compound lookup trapped", e))?;
        self.take_result()
    }

    /// Decode a raw result buffer with this facade's codec
    pub fn decode(&self, raw: &Bytes) -> BridgeResult<ResultBatch> {
        self.codec.decode_batch(raw, 0, raw.len())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> BridgeResult<()> {
        let mut view = GuestMemoryView {
            memory: self.memory,
            store: &mut self.store,
        };
        self.bridge.write(&mut view, chunk)
    }

    /// The engine must invoke `result_handler` exactly once per lookup,
    /// synchronously, before the entry point returns
    fn take_result(&mut self) -> BridgeResult<Bytes> {
        let state = self.store.data_mut();
        let callbacks = state.callbacks;
        match (callbacks, state.pending.take()) {
            (1, Some(raw)) => Ok(raw),
            (0, _) => Err(BridgeError::contract(
                "guest returned without invoking result_handler",
            )),
            (n, _) => Err(BridgeError::contract(format!(
                "guest invoked result_handler {} times for one lookup",
                n
            ))),
        }
    }
}

impl std::fmt::Debug for ModuleFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleFacade")
            .field("options", &self.options)
            .field("encoding", &self.encoding.name())
            .finish_non_exhaustive()
    }
}

fn entry_point<P, R>(
    instance: &Instance,
    store: &mut Store<HostState>,
    name: &str,
) -> BridgeResult<TypedFunc<P, R>>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    instance.get_typed_func::<P, R>(&mut *store, name).map_err(|e| {
        BridgeError::module_with_source(format!("engine module missing entry point {}", name), e)
    })
}

/// The guest returns results by calling `env::result_handler(offset, len)`
/// synchronously from inside `lookup`/`lookup_compound`. The window is
/// copied out of guest memory here — the region is not guaranteed to
/// survive the guest's next action.
fn register_result_handler(linker: &mut Linker<HostState>) -> BridgeResult<()> {
    linker
        .func_wrap(
            "env",
            "result_handler",
            |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
                let memory = caller
                    .get_export("memory")
                    .and_then(|e| e.into_memory())
                    .ok_or_else(|| anyhow::anyhow!("result_handler: no memory export"))?;

                let data = memory.data(&caller);
                let start = ptr as u32 as usize;
                let end = start
                    .checked_add(len as u32 as usize)
                    .filter(|&e| e <= data.len())
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "result_handler: window {}..{}+{} out of bounds (memory size: {})",
                            ptr,
                            ptr,
                            len,
                            data.len()
                        )
                    })?;

                let raw = Bytes::copy_from_slice(&data[start..end]);
                let state = caller.data_mut();
                state.pending = Some(raw);
                state.callbacks += 1;
                Ok(())
            },
        )
        .map_err(|e| BridgeError::module_with_source("failed to define result_handler", e))?;
    Ok(())
}

/// Wasmtime-backed view implementing the bridge's memory seam
struct GuestMemoryView<'a> {
    memory: Memory,
    store: &'a mut Store<HostState>,
}

impl LinearMemory for GuestMemoryView<'_> {
    fn identity(&mut self) -> MemoryIdentity {
        MemoryIdentity::new(
            self.memory.data_ptr(&*self.store) as usize,
            self.memory.data_size(&*self.store),
        )
    }

    fn len(&mut self) -> usize {
        self.memory.data_size(&*self.store)
    }

    fn ensure_len(&mut self, required: usize) -> BridgeResult<()> {
        let current = self.memory.data_size(&*self.store);
        if required <= current {
            return Ok(());
        }

        let required_pages = pages_for(required);
        let current_pages = self.memory.size(&*self.store);
        let delta = required_pages.saturating_sub(current_pages);
        if delta > 0 {
            self.memory.grow(&mut *self.store, delta).map_err(|e| {
                BridgeError::contract(format!(
                    "cannot stage {} bytes: guest refused growth by {} pages: {}",
                    required, delta, e
                ))
            })?;
        }
        Ok(())
    }

    fn write_at(&mut self, offset: usize, bytes: &[u8]) -> BridgeResult<()> {
        self.memory
            .write(&mut *self.store, offset, bytes)
            .map_err(|e| {
                BridgeError::memory(format!(
                    "failed to write {} bytes at offset {}: {}",
                    bytes.len(),
                    offset,
                    e
                ))
            })
    }
}
