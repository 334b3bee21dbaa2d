//! Result Wire Codec
//!
//! Decodes the binary record stream the guest engine writes back into its
//! own memory after a lookup. The layout, all integers little-endian:
//!
//! ```text
//! batch  := item_count:u32  item*
//! item   := item_len:u32  record
//! record := count:u32  distance:u32  term_len  term_bytes
//! ```
//!
//! The width of `term_len` depends on the engine generation: older builds
//! emit a single length byte (term bytes start at record offset 9), current
//! builds emit a 4-byte length (term bytes start at offset 12). The codec is
//! configured with the framing of the exact module it targets; the two are
//! never mixed within one instance.
//!
//! Decoding takes one slice over the response window and re-bases every
//! internal offset to 0, so no guest-memory address survives the call. Each
//! record is a zero-copy view into that slice; the term string is decoded at
//! most once, on first access.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::encoding::{TextEncoding, Utf8};
use crate::error::{BridgeError, BridgeResult};

/// Byte length of the batch header (`item_count`)
pub const BATCH_HEADER_LEN: usize = 4;

/// Terminator transmitted after the final chunk of each dictionary stream,
/// so the guest flushes a partially buffered trailing entry
pub const STREAM_TERMINATOR: &[u8] = b"\n";

// item_count is read before any record bounds are validated; cap the
// preallocation so a hostile header cannot force a huge reservation.
const MAX_PREALLOC: u32 = 1024;

/// Width of the `term_len` field, fixed per guest-module generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermLengthWidth {
    /// Single length byte, term bytes at record offset 9
    U8,
    /// 4-byte little-endian length, term bytes at record offset 12
    #[default]
    U32,
}

/// Decoder for the guest's ranked-result stream
#[derive(Debug, Clone)]
pub struct WireCodec {
    term_length: TermLengthWidth,
    encoding: Arc<dyn TextEncoding>,
}

impl WireCodec {
    /// Create a codec for the given term-length framing, decoding terms as
    /// strict UTF-8
    pub fn new(term_length: TermLengthWidth) -> Self {
        Self::with_encoding(term_length, Arc::new(Utf8))
    }

    /// Create a codec with an explicit text-encoding strategy
    pub fn with_encoding(term_length: TermLengthWidth, encoding: Arc<dyn TextEncoding>) -> Self {
        Self {
            term_length,
            encoding,
        }
    }

    /// The term-length framing this codec targets
    pub fn term_length(&self) -> TermLengthWidth {
        self.term_length
    }

    /// Decode the batch occupying `[offset, offset + length)` of `buffer`.
    ///
    /// The window is sliced once; every record in the returned batch is a
    /// view into that slice. Any length field implying a read past the
    /// window is a [`BridgeError::Decode`] fault, reported with the window-
    /// relative offset and the needed vs. available byte counts.
    pub fn decode_batch(
        &self,
        buffer: &Bytes,
        offset: usize,
        length: usize,
    ) -> BridgeResult<ResultBatch> {
        let end = offset
            .checked_add(length)
            .filter(|&e| e <= buffer.len())
            .ok_or_else(|| {
                BridgeError::decode(offset, length, buffer.len().saturating_sub(offset))
            })?;
        let window = buffer.slice(offset..end);

        let mut pos = 0usize;
        let item_count = read_u32(&window, &mut pos, window.len())?;

        let mut records = Vec::with_capacity(item_count.min(MAX_PREALLOC) as usize);
        for _ in 0..item_count {
            let item_len = read_u32(&window, &mut pos, window.len())? as usize;
            let record_end = pos
                .checked_add(item_len)
                .filter(|&e| e <= window.len())
                .ok_or_else(|| BridgeError::decode(pos, item_len, window.len() - pos))?;
            records.push(self.decode_record(&window, pos, record_end)?);
            pos = record_end;
        }

        Ok(ResultBatch { records })
    }

    fn decode_record(
        &self,
        window: &Bytes,
        start: usize,
        end: usize,
    ) -> BridgeResult<SuggestionRecord> {
        let mut pos = start;
        let count = read_u32(window, &mut pos, end)?;
        let distance = read_u32(window, &mut pos, end)?;

        let term_len = match self.term_length {
            TermLengthWidth::U8 => {
                if pos >= end {
                    return Err(BridgeError::decode(pos, 1, end - pos));
                }
                let len = window[pos] as usize;
                pos += 1;
                len
            }
            TermLengthWidth::U32 => read_u32(window, &mut pos, end)? as usize,
        };

        let term_end = pos
            .checked_add(term_len)
            .filter(|&e| e <= end)
            .ok_or_else(|| BridgeError::decode(pos, term_len, end - pos))?;

        Ok(SuggestionRecord {
            raw: window.slice(start..end),
            count,
            distance,
            term_range: (pos - start)..(term_end - start),
            term: OnceCell::new(),
            encoding: Arc::clone(&self.encoding),
        })
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new(TermLengthWidth::default())
    }
}

/// Read a little-endian u32 at `*pos`, bounded by `end`
fn read_u32(window: &Bytes, pos: &mut usize, end: usize) -> BridgeResult<u32> {
    let start = *pos;
    let stop = start
        .checked_add(4)
        .filter(|&e| e <= end)
        .ok_or_else(|| BridgeError::decode(start, 4, end.saturating_sub(start)))?;
    let bytes: [u8; 4] = window[start..stop]
        .try_into()
        .map_err(|_| BridgeError::decode(start, 4, 0))?;
    *pos = stop;
    Ok(u32::from_le_bytes(bytes))
}

/// One ranked suggestion, a view over the decoded response slice
pub struct SuggestionRecord {
    raw: Bytes,
    count: u32,
    distance: u32,
    term_range: Range<usize>,
    term: OnceCell<String>,
    encoding: Arc<dyn TextEncoding>,
}

impl SuggestionRecord {
    /// Occurrence count of the suggested term in the dictionary
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Edit distance between the query and the suggested term
    pub fn distance(&self) -> u32 {
        self.distance
    }

    /// The suggested term, decoded on first access and memoized.
    ///
    /// The backing bytes never change after the batch is decoded, so
    /// repeated calls return the identical string.
    pub fn term(&self) -> BridgeResult<&str> {
        self.term
            .get_or_try_init(|| self.encoding.decode(&self.raw[self.term_range.clone()]))
            .map(|s| s.as_str())
    }

    /// The raw term bytes, without text decoding
    pub fn term_bytes(&self) -> &[u8] {
        &self.raw[self.term_range.clone()]
    }
}

impl fmt::Debug for SuggestionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuggestionRecord")
            .field("count", &self.count)
            .field("distance", &self.distance)
            .field("term", &String::from_utf8_lossy(self.term_bytes()))
            .finish()
    }
}

/// Ordered suggestions from one lookup, most relevant first.
///
/// The order is assigned by the guest and preserved exactly as decoded.
#[derive(Debug, Default)]
pub struct ResultBatch {
    records: Vec<SuggestionRecord>,
}

impl ResultBatch {
    /// Number of suggestions in the batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no suggestions
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The suggestion at `index`, in guest rank order
    pub fn get(&self, index: usize) -> Option<&SuggestionRecord> {
        self.records.get(index)
    }

    /// Iterate the suggestions in rank order
    pub fn iter(&self) -> std::slice::Iter<'_, SuggestionRecord> {
        self.records.iter()
    }

    /// The suggestions as a slice
    pub fn records(&self) -> &[SuggestionRecord] {
        &self.records
    }
}

impl IntoIterator for ResultBatch {
    type Item = SuggestionRecord;
    type IntoIter = std::vec::IntoIter<SuggestionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultBatch {
    type Item = &'a SuggestionRecord;
    type IntoIter = std::slice::Iter<'a, SuggestionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
