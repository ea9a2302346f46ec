/*
 * store.rs
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

//! MessageStore trait: resolves folder URIs to existing folders.

use crate::store::error::StoreError;
use crate::store::folder::MessageFolder;
use crate::store::message::MessageHeader;
use std::sync::Arc;

/// The persistent message store. Only existing folders are returned; nothing is created on lookup.
pub trait MessageStore: Send + Sync {
    /// Look up an existing folder by URI.
    fn existing_folder(&self, uri: &str) -> Result<Arc<dyn MessageFolder>, StoreError>;

    /// Folder owning `header`. Default resolves `header.folder_uri`.
    fn folder_for_header(&self, header: &MessageHeader) -> Result<Arc<dyn MessageFolder>, StoreError> {
        self.existing_folder(&header.folder_uri)
    }
}
