//! Worker Channel
//!
//! Hosts one [`ModuleFacade`] on a dedicated OS thread and exposes it to a
//! controller through a pair of message channels. The worker instantiates
//! the engine, streams both dictionary sources end-to-end, then signals
//! `Ready`; after that it answers one lookup request at a time, in arrival
//! order, with the raw result buffer (already an independent copy of the
//! guest's window). The controller decodes replies with an identically
//! configured codec.
//!
//! The protocol carries no correlation identifiers, so only one request may
//! be outstanding; the controller API takes `&mut self`, which makes
//! pipelining unrepresentable rather than merely discouraged.
//!
//! An initialization failure is terminal: the worker reports one error and
//! exits, and `Ready` is never sent after an error.

use std::path::PathBuf;
use std::thread::JoinHandle;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::codec::{ResultBatch, WireCodec};
use crate::dictionary::FileSource;
use crate::error::{BridgeError, BridgeResult};
use crate::wasm::{LookupOptions, ModuleFacade, SpellerOptions};

/// Worker initialization message: where the engine and its dictionaries
/// live, plus optional JSON-encoded [`SpellerOptions`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Location of the compiled engine module
    pub module_path: PathBuf,
    /// Primary dictionary, newline-delimited `term frequency` text
    pub dictionary_path: PathBuf,
    /// Optional bigram dictionary enabling compound lookups
    #[serde(default)]
    pub bigram_path: Option<PathBuf>,
    /// JSON-encoded engine options; defaults apply when absent
    #[serde(default)]
    pub options: Option<String>,
}

#[derive(Debug)]
enum WorkerRequest {
    Plain(String),
    WithOptions { word: String, options: LookupOptions },
}

#[derive(Debug)]
enum WorkerReply {
    Ready,
    Error(String),
    Batch(Bytes),
}

/// Controller-side handle to a worker-hosted engine
pub struct WorkerChannel {
    tx: Option<mpsc::Sender<WorkerRequest>>,
    rx: mpsc::Receiver<WorkerReply>,
    codec: WireCodec,
    thread: Option<JoinHandle<()>>,
}

impl WorkerChannel {
    /// Spawn a worker thread, wait for it to ingest its dictionaries, and
    /// return once it signals readiness.
    ///
    /// Any error message received before `Ready` is fatal: the worker is
    /// discarded and the error returned.
    pub async fn spawn(config: WorkerConfig) -> BridgeResult<Self> {
        let options = match &config.options {
            Some(json) => serde_json::from_str::<SpellerOptions>(json)
                .map_err(|e| BridgeError::worker(format!("invalid options JSON: {}", e)))?,
            None => SpellerOptions::default(),
        };
        let codec = WireCodec::new(options.term_length);

        let (req_tx, req_rx) = mpsc::channel(1);
        let (reply_tx, mut reply_rx) = mpsc::channel(4);

        let thread = std::thread::Builder::new()
            .name("spell-worker".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = reply_tx.blocking_send(WorkerReply::Error(format!(
                            "failed to build worker runtime: {}",
                            e
                        )));
                        return;
                    }
                };
                runtime.block_on(worker_main(config, options, reply_tx, req_rx));
            })
            .map_err(|e| BridgeError::worker(format!("failed to spawn worker thread: {}", e)))?;

        match reply_rx.recv().await {
            Some(WorkerReply::Ready) => {
                info!("spell worker ready");
                Ok(Self {
                    tx: Some(req_tx),
                    rx: reply_rx,
                    codec,
                    thread: Some(thread),
                })
            }
            Some(WorkerReply::Error(message)) => {
                let _ = thread.join();
                Err(BridgeError::worker(message))
            }
            Some(WorkerReply::Batch(_)) => {
                let _ = thread.join();
                Err(BridgeError::worker("protocol violation: result before ready"))
            }
            None => {
                let _ = thread.join();
                Err(BridgeError::worker("worker exited before signalling readiness"))
            }
        }
    }

    /// Look up `input` with default options. Input containing whitespace is
    /// routed to compound lookup, anything else to single-term lookup.
    pub async fn lookup(&mut self, input: &str) -> BridgeResult<ResultBatch> {
        self.request(WorkerRequest::Plain(input.to_string())).await
    }

    /// Look up `input` with explicit options; the same whitespace routing
    /// applies (compound lookups honor only `max_edit_distance`)
    pub async fn lookup_with(
        &mut self,
        input: &str,
        options: LookupOptions,
    ) -> BridgeResult<ResultBatch> {
        self.request(WorkerRequest::WithOptions {
            word: input.to_string(),
            options,
        })
        .await
    }

    async fn request(&mut self, request: WorkerRequest) -> BridgeResult<ResultBatch> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| BridgeError::worker("worker already shut down"))?;
        tx.send(request)
            .await
            .map_err(|_| BridgeError::worker("worker is gone"))?;

        match self.rx.recv().await {
            Some(WorkerReply::Batch(raw)) => self.codec.decode_batch(&raw, 0, raw.len()),
            Some(WorkerReply::Error(message)) => Err(BridgeError::worker(message)),
            Some(WorkerReply::Ready) => {
                Err(BridgeError::worker("protocol violation: duplicate ready"))
            }
            None => Err(BridgeError::worker("worker exited mid-request")),
        }
    }

    /// Stop the worker and wait for its thread to exit
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        // Closing the request channel ends the worker loop.
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("spell worker panicked during shutdown");
            }
        }
    }
}

impl Drop for WorkerChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WorkerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerChannel")
            .field("alive", &self.tx.is_some())
            .finish_non_exhaustive()
    }
}

async fn worker_main(
    config: WorkerConfig,
    options: SpellerOptions,
    reply_tx: mpsc::Sender<WorkerReply>,
    mut requests: mpsc::Receiver<WorkerRequest>,
) {
    let mut facade = match initialize(&config, options).await {
        Ok(facade) => facade,
        Err(e) => {
            error!("worker initialization failed: {}", e);
            // Terminal: never follow an error with a ready signal.
            let _ = reply_tx.send(WorkerReply::Error(e.to_string())).await;
            return;
        }
    };

    if reply_tx.send(WorkerReply::Ready).await.is_err() {
        return;
    }

    while let Some(request) = requests.recv().await {
        let reply = match handle(&mut facade, request) {
            Ok(raw) => WorkerReply::Batch(raw),
            Err(e) => WorkerReply::Error(e.to_string()),
        };
        if reply_tx.send(reply).await.is_err() {
            break;
        }
    }

    debug!("spell worker loop ended");
}

async fn initialize(config: &WorkerConfig, options: SpellerOptions) -> BridgeResult<ModuleFacade> {
    info!("initializing spell worker from {:?}", config.module_path);

    let mut facade = ModuleFacade::from_file(&config.module_path, options)?;

    let mut primary = FileSource::open(&config.dictionary_path).await?;
    facade.ingest_dictionary(&mut primary, false).await?;

    if let Some(bigram) = &config.bigram_path {
        let mut secondary = FileSource::open(bigram).await?;
        facade.ingest_dictionary(&mut secondary, true).await?;
    }

    Ok(facade)
}

fn handle(facade: &mut ModuleFacade, request: WorkerRequest) -> BridgeResult<Bytes> {
    match request {
        WorkerRequest::Plain(word) => dispatch(facade, &word, &LookupOptions::default()),
        WorkerRequest::WithOptions { word, options } => dispatch(facade, &word, &options),
    }
}

/// Whitespace in the input routes to compound lookup
fn dispatch(facade: &mut ModuleFacade, word: &str, options: &LookupOptions) -> BridgeResult<Bytes> {
    if word.contains(char::is_whitespace) {
        facade.lookup_compound_raw(word, options.max_edit_distance)
    } else {
        facade.lookup_raw(word, options)
    }
}
