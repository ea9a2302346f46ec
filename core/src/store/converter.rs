/*
 * converter.rs
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

//! MIME draft converter: black-box sink that decodes a stored message into compose-ready content.
//! Push model: `async_convert` binds the URL and result channel, then `receive` gets each chunk
//! and `finish` the stream status. The converter reports its own result through the channel.

use crate::compose::SessionHandle;
use crate::identity::Identity;
use crate::store::error::StoreError;
use crate::store::message::MessageHeader;
use crate::store::retrieval::MessageUrl;

/// What the converter should produce from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Draft, or forward inline: fields and body restored as they were.
    DraftOrTemplate,
    /// Template-style editing (template, reply with template, redirect, edit as new).
    EditorTemplate,
}

/// Settings applied to a converter before conversion starts.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterSettings {
    pub output: OutputKind,
    pub forward_inline: bool,
    /// Set when `forward_to` is non-empty: skip the compose surface and send directly.
    pub forward_inline_filter: bool,
    pub forward_to: Option<String>,
    pub override_compose_format: bool,
    pub identity: Option<Identity>,
    pub original_uri: String,
    pub original_header: Option<MessageHeader>,
}

/// Result produced by a converter once the message has been consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOutcome {
    /// A compose surface was opened for the converted message.
    Opened(SessionHandle),
    /// Forward-inline filter mode: the message was sent without a compose surface.
    Forwarded,
}

/// Callback receiving the converter's result.
pub type DraftResultCallback = Box<dyn FnOnce(Result<DraftOutcome, StoreError>) + Send>;

/// MIME decoding converter.
pub trait MimeConverter: Send {
    fn configure(&mut self, settings: ConverterSettings);

    /// Bind the converter to `url`. The result is delivered through `on_result` after `finish`.
    fn async_convert(&mut self, url: &MessageUrl, on_result: DraftResultCallback) -> Result<(), StoreError>;

    /// Receive a chunk of raw message data.
    fn receive(&mut self, data: &[u8]) -> Result<(), StoreError>;

    /// End of stream with its completion status.
    fn finish(&mut self, status: Result<(), StoreError>);
}

/// Creates converter instances.
pub trait MimeConverterFactory: Send + Sync {
    fn create_converter(&self) -> Result<Box<dyn MimeConverter>, StoreError>;
}
