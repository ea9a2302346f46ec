/*
 * mod.rs
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

//! Collaborator abstractions: message store, folders, retrieval service, MIME converter, compose host.

mod converter;
mod error;
mod folder;
mod host;
mod message;
mod retrieval;
mod store;

pub use converter::{
    ConverterSettings, DraftOutcome, DraftResultCallback, MimeConverter, MimeConverterFactory, OutputKind,
};
pub use error::StoreError;
pub(crate) use error::poisoned;
pub use folder::{MessageDatabase, MessageFolder};
pub use host::{ComposeHost, OpenedCallback, SentCallback};
pub use message::{DispositionState, MessageHeader};
pub use retrieval::{
    ChunkCallback, CompletionCallback, MessageRetrievalService, MessageServices, MessageUrl,
};
pub use store::MessageStore;
