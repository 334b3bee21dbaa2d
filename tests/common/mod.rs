//! Shared test support: synthetic guest modules assembled from WAT.
//!
//! The echo guest implements the engine's entry-point contract without any
//! lookup logic: `lookup` answers with a single record whose term is the
//! query bytes echoed back and whose numeric fields encode the arguments it
//! received, so every hop of the write→invoke→callback→decode loop is
//! observable from the outside. `write_to_dictionary` grows memory by one
//! page per call, which invalidates any cached transfer window exactly the
//! way a real ingestion-driven growth does. `lookup_compound` reports the
//! total number of dictionary bytes ingested in its `count` field.

#![allow(dead_code)]

/// Record layout used by the echo guest (4-byte term length):
///
/// - `count`  = include_self * 1000 + include_unknown * 100 + verbosity
/// - `distance` = the max_edit_distance argument
/// - `term` = the query bytes
///
/// For `lookup_compound`, `count` is the total ingested byte count instead.
pub const ECHO_GUEST_WAT: &str = r#"
(module
  (import "env" "result_handler" (func $result_handler (param i32 i32)))
  (memory (export "memory") 1)
  (global $max_ed (mut i32) (i32.const -1))
  (global $threshold (mut i32) (i32.const -1))
  (global $ingested (mut i32) (i32.const 0))

  (func (export "symspell") (param i32 i32)
    (global.set $max_ed (local.get 0))
    (global.set $threshold (local.get 1)))

  ;; Count every ingested byte and grow (relocate) memory on each call.
  (func (export "write_to_dictionary") (param i32 i32 i32)
    (global.set $ingested (i32.add (global.get $ingested) (local.get 1)))
    (drop (memory.grow (i32.const 1))))

  (func (export "lookup")
        (param $ptr i32) (param $len i32) (param $verb i32)
        (param $maxed i32) (param $unk i32) (param $self i32)
    (local $base i32)
    (local.set $base (i32.const 4096))
    ;; item_count = 1
    (i32.store (local.get $base) (i32.const 1))
    ;; item_len = 12 + term length
    (i32.store (i32.add (local.get $base) (i32.const 4))
               (i32.add (i32.const 12) (local.get $len)))
    ;; count encodes the flag arguments
    (i32.store (i32.add (local.get $base) (i32.const 8))
      (i32.add
        (i32.add (i32.mul (local.get $self) (i32.const 1000))
                 (i32.mul (local.get $unk) (i32.const 100)))
        (local.get $verb)))
    ;; distance echoes max_edit_distance
    (i32.store (i32.add (local.get $base) (i32.const 12)) (local.get $maxed))
    ;; term_len + term bytes copied from the transfer window
    (i32.store (i32.add (local.get $base) (i32.const 16)) (local.get $len))
    (memory.copy (i32.add (local.get $base) (i32.const 20))
                 (local.get $ptr) (local.get $len))
    (call $result_handler (local.get $base)
                          (i32.add (i32.const 20) (local.get $len))))

  (func (export "lookup_compound")
        (param $ptr i32) (param $len i32) (param $maxed i32)
    (local $base i32)
    (local.set $base (i32.const 8192))
    (i32.store (local.get $base) (i32.const 1))
    (i32.store (i32.add (local.get $base) (i32.const 4))
               (i32.add (i32.const 12) (local.get $len)))
    ;; count reports the total dictionary bytes seen so far
    (i32.store (i32.add (local.get $base) (i32.const 8)) (global.get $ingested))
    (i32.store (i32.add (local.get $base) (i32.const 12)) (local.get $maxed))
    (i32.store (i32.add (local.get $base) (i32.const 16)) (local.get $len))
    (memory.copy (i32.add (local.get $base) (i32.const 20))
                 (local.get $ptr) (local.get $len))
    (call $result_handler (local.get $base)
                          (i32.add (i32.const 20) (local.get $len))))
)
"#;

/// Guest whose `lookup` never invokes the result callback
pub const SILENT_GUEST_WAT: &str = r#"
(module
  (import "env" "result_handler" (func $result_handler (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "symspell") (param i32 i32))
  (func (export "write_to_dictionary") (param i32 i32 i32))
  (func (export "lookup") (param i32 i32 i32 i32 i32 i32))
  (func (export "lookup_compound") (param i32 i32 i32)
    (call $result_handler (i32.const 0) (i32.const 4)))
)
"#;

/// Guest whose `lookup` invokes the result callback twice
pub const CHATTY_GUEST_WAT: &str = r#"
(module
  (import "env" "result_handler" (func $result_handler (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "symspell") (param i32 i32))
  (func (export "write_to_dictionary") (param i32 i32 i32))
  ;; offset 1024 stays zeroed, so each window decodes as an empty batch
  (func (export "lookup") (param i32 i32 i32 i32 i32 i32)
    (call $result_handler (i32.const 1024) (i32.const 4))
    (call $result_handler (i32.const 1024) (i32.const 4)))
  (func (export "lookup_compound") (param i32 i32 i32)
    (call $result_handler (i32.const 1024) (i32.const 4)))
)
"#;

/// Guest that reports a result window past the end of its own memory
pub const OOB_GUEST_WAT: &str = r#"
(module
  (import "env" "result_handler" (func $result_handler (param i32 i32)))
  (memory (export "memory") 1)
  (func (export "symspell") (param i32 i32))
  (func (export "write_to_dictionary") (param i32 i32 i32))
  (func (export "lookup") (param i32 i32 i32 i32 i32 i32)
    (call $result_handler (i32.const 65532) (i32.const 64)))
  (func (export "lookup_compound") (param i32 i32 i32)
    (call $result_handler (i32.const 0) (i32.const 4)))
)
"#;

/// Assemble a WAT guest into binary form
pub fn module_bytes(wat_source: &str) -> Vec<u8> {
    wat::parse_str(wat_source).expect("test guest WAT failed to assemble")
}
