//! Engine Scenario Tests
//!
//! Semantic end-to-end scenarios that need the real compiled lookup engine
//! rather than a synthetic guest. They are ignored by default; run them
//! with the engine module's location in the environment:
//!
//! ```sh
//! SPELL_ENGINE_WASM=/path/to/spellchecker.wasm cargo test -- --ignored
//! ```

use std::path::PathBuf;

use spell_bridge::{LookupOptions, ModuleFacade, SliceSource, SpellerOptions, Verbosity};

fn engine_path() -> PathBuf {
    std::env::var_os("SPELL_ENGINE_WASM")
        .map(PathBuf::from)
        .expect("set SPELL_ENGINE_WASM to the compiled engine module")
}

async fn facade_with(dictionary: &'static [u8]) -> ModuleFacade {
    let mut facade =
        ModuleFacade::from_file(engine_path(), SpellerOptions::default()).unwrap();
    let mut source = SliceSource::new(dictionary);
    facade.ingest_dictionary(&mut source, false).await.unwrap();
    facade
}

#[tokio::test]
#[ignore = "requires the compiled lookup engine module"]
async fn scenario_single_correction_at_distance_one() {
    let mut facade = facade_with(b"hello 100\n").await;

    let batch = facade
        .lookup(
            "helo",
            &LookupOptions {
                verbosity: Verbosity::Closest,
                max_edit_distance: 2,
                ..LookupOptions::default()
            },
        )
        .unwrap();

    assert_eq!(batch.len(), 1);
    let record = batch.get(0).unwrap();
    assert_eq!(record.term().unwrap(), "hello");
    assert_eq!(record.count(), 100);
    assert_eq!(record.distance(), 1);
}

#[tokio::test]
#[ignore = "requires the compiled lookup engine module"]
async fn scenario_exact_hit_honors_include_self() {
    let mut facade = facade_with(b"hello 100\n").await;

    let without_self = facade
        .lookup(
            "hello",
            &LookupOptions {
                include_self: false,
                ..LookupOptions::default()
            },
        )
        .unwrap();
    assert!(without_self.is_empty());

    let with_self = facade
        .lookup(
            "hello",
            &LookupOptions {
                include_self: true,
                ..LookupOptions::default()
            },
        )
        .unwrap();
    assert_eq!(with_self.len(), 1);
    assert_eq!(with_self.get(0).unwrap().distance(), 0);
}

#[tokio::test]
#[ignore = "requires the compiled lookup engine module"]
async fn scenario_unmatched_word_honors_include_unknown() {
    let mut facade = facade_with(b"hello 100\n").await;

    let options = LookupOptions {
        max_edit_distance: 2,
        include_unknown: false,
        ..LookupOptions::default()
    };
    let silent = facade.lookup("zzzzzzzz", &options).unwrap();
    assert!(silent.is_empty());

    let reported = facade
        .lookup(
            "zzzzzzzz",
            &LookupOptions {
                include_unknown: true,
                ..options
            },
        )
        .unwrap();
    assert_eq!(reported.len(), 1);
    let record = reported.get(0).unwrap();
    assert_eq!(record.term().unwrap(), "zzzzzzzz");
    // sentinel distance marks the word as unmatched
    assert!(record.distance() > 2);
}

#[tokio::test]
#[ignore = "requires the compiled lookup engine module"]
async fn scenario_compound_correction() {
    let mut facade = facade_with(b"hello 100\nworld 80\n").await;

    let batch = facade.lookup_compound("helo wrold", 2).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.get(0).unwrap().term().unwrap(), "hello world");
}
