use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("malformed json value starting at byte {offset} of the export body: {source}")]
pub struct DecodeError {
    pub offset: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Incremental decoder for a body made of back to back JSON values, with or without
/// whitespace between them. Bytes are pushed in whatever pieces the network hands us; values
/// are handed out as soon as they are complete.
pub struct ConcatenatedJsonDecoder<T> {
    buffer: Vec<u8>,
    // Start of the first undecoded byte in `buffer`
    cursor: usize,
    // Bytes of the body already dropped from the front of `buffer`
    discarded: usize,
    scan: BoundaryScan,
    _marker: PhantomData<fn() -> T>,
}

// Tracks object/array nesting over the bytes after `cursor`, so a value is only handed to
// serde once its closing bracket has arrived. Each byte is scanned once however many pieces the
// value arrives in.
#[derive(Debug, Default)]
struct BoundaryScan {
    // Next byte of `buffer` to look at
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl BoundaryScan {
    fn reset(&mut self, pos: usize) {
        *self = Self {
            pos,
            ..Self::default()
        };
    }

    // True once the value starting at `start` may be complete. Values that aren't objects or
    // arrays are always worth a parse attempt.
    fn value_ready(&mut self, buffer: &[u8], start: usize) -> bool {
        let remaining = &buffer[start..];
        match remaining.get(leading_whitespace(remaining)) {
            Some(b'{') | Some(b'[') => {}
            _ => return true,
        }

        while self.pos < buffer.len() {
            let byte = buffer[self.pos];
            self.pos += 1;
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }
            match byte {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
}

impl<T: DeserializeOwned> ConcatenatedJsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            discarded: 0,
            scan: BoundaryScan::default(),
            _marker: PhantomData,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        if self.cursor > 0 {
            self.buffer.drain(..self.cursor);
            self.discarded += self.cursor;
            self.scan.pos -= self.cursor;
            self.cursor = 0;
        }
        self.buffer.extend_from_slice(data);
    }

    /// Returns the next complete value, or `None` if more input is needed.
    pub fn next_value(&mut self) -> Result<Option<T>, DecodeError> {
        if !self.scan.value_ready(&self.buffer, self.cursor) {
            return Ok(None);
        }

        let remaining = &self.buffer[self.cursor..];
        let mut values = serde_json::Deserializer::from_slice(remaining).into_iter::<T>();

        match values.next() {
            Some(Ok(value)) => {
                self.cursor += values.byte_offset();
                self.scan.reset(self.cursor);
                Ok(Some(value))
            }
            // The value runs past what we've received so far, wait for the next piece
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(source)) => Err(DecodeError {
                offset: self.offset() + leading_whitespace(remaining),
                source,
            }),
            // Only whitespace left
            None => {
                self.cursor = self.buffer.len();
                self.scan.reset(self.cursor);
                Ok(None)
            }
        }
    }

    /// Called once the body is exhausted. Anything left in the buffer at that point is a
    /// value that was cut off.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        let remaining = &self.buffer[self.cursor..];
        let skip = leading_whitespace(remaining);
        if skip == remaining.len() {
            return Ok(());
        }
        match serde_json::from_slice::<T>(remaining) {
            Err(source) => Err(DecodeError {
                offset: self.offset() + skip,
                source,
            }),
            // next_value() would have produced it, so callers only reach this by skipping it
            Ok(_) => Err(DecodeError {
                offset: self.offset() + skip,
                source: serde::de::Error::custom("undrained value at end of body"),
            }),
        }
    }

    /// Position of the next undecoded byte within the whole body.
    pub fn offset(&self) -> usize {
        self.discarded + self.cursor
    }
}

impl<T: DeserializeOwned> Default for ConcatenatedJsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn leading_whitespace(data: &[u8]) -> usize {
    data.iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count()
}
