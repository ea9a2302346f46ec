/*
 * folder.rs
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

//! Folder and message database traits: header lookup by Message-ID, message URIs, disposition marking.

use crate::store::error::StoreError;
use crate::store::message::{DispositionState, MessageHeader};
use std::sync::Arc;

/// Per-folder message database (summary file). Lookups never block on the network.
pub trait MessageDatabase: Send + Sync {
    /// Find a header by Message-ID (without angle brackets). None if no such message.
    fn header_for_message_id(&self, message_id: &str) -> Option<MessageHeader>;
}

/// A folder in the persistent message store (e.g. Templates, INBOX).
pub trait MessageFolder: Send + Sync {
    /// Folder URI (e.g. `mailbox://nobody@Local%20Folders/Templates`).
    fn uri(&self) -> &str;

    /// Open the folder's message database. Fails when the summary cannot be opened.
    fn message_database(&self) -> Result<Arc<dyn MessageDatabase>, StoreError>;

    /// URI that addresses `header` through the message retrieval service.
    fn uri_for_message(&self, header: &MessageHeader) -> String;

    /// Add a disposition state (replied, forwarded) to a message in this folder.
    fn add_disposition_state(
        &self,
        _header: &MessageHeader,
        _state: DispositionState,
    ) -> Result<(), StoreError> {
        Err(StoreError::new("disposition state not supported for this folder"))
    }
}
