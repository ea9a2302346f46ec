/*
 * boundary.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Missiva, a mail and news compose pipeline.
 *
 * Missiva is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Missiva is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Missiva.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Incremental header/body splitter for raw RFC 822 streams.
//!
//! The header section ends at the first blank line, written as `CR CR`, `LF LF` or
//! `CR LF CR LF`. Chunks arrive with arbitrary boundaries, so the separator may straddle two
//! (or, fed byte by byte, four) chunks. While in the header section the last three bytes seen
//! are carried over and scanned again in front of the next chunk; three bytes is the longest
//! lookahead a separator match needs.
//!
//! At each position the two-byte form is tried before the four-byte form, so `CR LF LF` ends
//! the header at the `LF LF`, and the earliest position always wins.

use bytes::{Bytes, BytesMut};

/// Bytes of header tail carried from one chunk to the next.
const CARRY_LEN: usize = 3;

/// Splits a chunked message stream at the header/body separator and accumulates the body.
#[derive(Debug, Default)]
pub struct BoundaryExtractor {
    seen_body: bool,
    carry: [u8; CARRY_LEN],
    /// Valid bytes in `carry`. Only meaningful while `seen_body` is false.
    carry_len: usize,
    body: BytesMut,
}

impl BoundaryExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the separator has been found.
    pub fn in_body(&self) -> bool {
        self.seen_body
    }

    /// Body bytes accumulated so far.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Feed the next chunk of the stream.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.seen_body {
            self.body.extend_from_slice(chunk);
            return;
        }
        if chunk.is_empty() {
            return;
        }
        let mut window = Vec::with_capacity(self.carry_len + chunk.len());
        window.extend_from_slice(&self.carry[..self.carry_len]);
        window.extend_from_slice(chunk);

        match find_separator(&window) {
            Some(body_start) => {
                // A separator ending inside the carry would have been found on the previous chunk.
                debug_assert!(body_start > self.carry_len);
                self.seen_body = true;
                self.carry_len = 0;
                self.body.extend_from_slice(&window[body_start..]);
            }
            None => {
                // Keep the tail of carry + chunk, so a short chunk never shrinks the carry.
                let keep = window.len().min(CARRY_LEN);
                self.carry[..keep].copy_from_slice(&window[window.len() - keep..]);
                self.carry_len = keep;
            }
        }
    }

    /// End of stream. Returns the body, or an empty buffer when no separator was ever seen.
    pub fn finish(self) -> Bytes {
        if !self.seen_body {
            tracing::debug!("stream ended inside the header section; no body");
            return Bytes::new();
        }
        self.body.freeze()
    }
}

/// Offset just past the first header/body separator in `buf`, if any.
fn find_separator(buf: &[u8]) -> Option<usize> {
    let len = buf.len();
    for i in 0..len {
        let b = buf[i];
        if b != b'\r' && b != b'\n' {
            continue;
        }
        if i + 1 < len {
            if buf[i + 1] == b {
                return Some(i + 2);
            }
            if i + 3 < len && &buf[i..i + 4] == b"\r\n\r\n" {
                return Some(i + 4);
            }
        }
    }
    None
}
