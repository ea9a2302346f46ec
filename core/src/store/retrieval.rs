/*
 * retrieval.rs
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

//! Message retrieval service: streams raw message bytes for a message URI.
//!
//! All streaming methods return immediately. `on_chunk` is called zero or more times, strictly
//! in order and never concurrently, then `on_complete` exactly once. A synchronous `Err` means
//! the stream never started and neither callback will fire.

use crate::compose::SurfaceId;
use crate::store::error::StoreError;
use std::sync::Arc;

/// Called for each chunk of message data. The slice is only valid for the duration of the call.
pub type ChunkCallback = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Called once when a stream ends, with the stream's completion status.
pub type CompletionCallback = Box<dyn FnOnce(Result<(), StoreError>) + Send>;

/// A resolved message URL, ready to be streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUrl {
    pub spec: String,
    /// Character set to decode with instead of the one declared by the message.
    pub charset_override: Option<String>,
}

impl MessageUrl {
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            charset_override: None,
        }
    }
}

/// Retrieval service for one kind of message URI (mailbox, imap-message, news-message, ...).
pub trait MessageRetrievalService: Send + Sync {
    /// Resolve a message URI into a URL the service can stream.
    fn url_for_uri(&self, uri: &str, surface: Option<SurfaceId>) -> Result<MessageUrl, StoreError>;

    /// Stream the raw message. `convert_data` false delivers the RFC 822 bytes unchanged.
    fn stream_message(
        &self,
        uri: &str,
        surface: Option<SurfaceId>,
        convert_data: bool,
        on_chunk: ChunkCallback,
        on_complete: CompletionCallback,
    ) -> Result<(), StoreError>;

    /// Stream the message for display (into a converter). `charset` overrides the message charset.
    fn display_message(
        &self,
        uri: &str,
        surface: Option<SurfaceId>,
        charset: Option<&str>,
        on_chunk: ChunkCallback,
        on_complete: CompletionCallback,
    ) -> Result<(), StoreError>;
}

/// Locates the retrieval service responsible for a message URI.
pub trait MessageServices: Send + Sync {
    fn service_for_uri(&self, uri: &str) -> Result<Arc<dyn MessageRetrievalService>, StoreError>;
}
