//! Text Encoding Strategies
//!
//! The bridge moves text across the guest boundary as raw bytes. How text
//! becomes bytes (and back) differs by deployment: strict UTF-8 for trusted
//! dictionaries, lossy UTF-8 when upstream sources may carry mojibake. The
//! strategy is chosen once at facade construction and threaded through the
//! codec, instead of branching per call site.

use std::borrow::Cow;
use std::fmt;

use crate::error::{BridgeError, BridgeResult};

/// Byte-encoding strategy for text crossing the guest boundary
pub trait TextEncoding: fmt::Debug + Send + Sync {
    /// Encode host text into the byte form the guest consumes
    fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]>;

    /// Decode guest-produced bytes into host text
    fn decode(&self, bytes: &[u8]) -> BridgeResult<String>;

    /// Strategy name, for logging
    fn name(&self) -> &'static str;
}

/// Strict UTF-8: invalid sequences are an error
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8;

impl TextEncoding for Utf8 {
    fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        Cow::Borrowed(text.as_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> BridgeResult<String> {
        std::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|e| BridgeError::encoding(format!("invalid UTF-8 in term: {}", e)))
    }

    fn name(&self) -> &'static str {
        "utf-8"
    }
}

/// Lossy UTF-8: invalid sequences become U+FFFD replacement characters
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Lossy;

impl TextEncoding for Utf8Lossy {
    fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        Cow::Borrowed(text.as_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> BridgeResult<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn name(&self) -> &'static str {
        "utf-8-lossy"
    }
}
