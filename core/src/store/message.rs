/*
 * message.rs
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

//! Stored message header and disposition types.

/// Header summary of a stored message, as kept in a folder's message database.
/// Address fields are the raw header text (e.g. `"Ann <ann@example.com>, bob@example.com"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// URI of the folder owning this message.
    pub folder_uri: String,
    /// Database key within the folder.
    pub key: u32,
    /// Message-ID header value without angle brackets.
    pub message_id: String,
    pub author: String,
    /// Explicit Reply-To, when the message had one.
    pub reply_to: Option<String>,
    pub recipients: String,
    pub cc_list: String,
    /// MIME-decoded subject.
    pub subject: String,
    /// Character set the message body was stored in.
    pub charset: Option<String>,
}

impl MessageHeader {
    /// Address a reply should go to: Reply-To when set and non-empty, else the author.
    /// Returns None when neither is available.
    pub fn reply_address(&self) -> Option<&str> {
        match self.reply_to.as_deref() {
            Some(r) if !r.trim().is_empty() => Some(r),
            _ if !self.author.trim().is_empty() => Some(self.author.as_str()),
            _ => None,
        }
    }
}

/// Disposition state recorded on the original message after a reply or forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispositionState {
    Replied,
    Forwarded,
}
