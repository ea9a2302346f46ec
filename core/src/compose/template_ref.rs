/*
 * template_ref.rs
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

//! Template references stored in filter actions: `<folder-uri>?messageId=<id>&subject=<text>`.
//! Neither part is escaped; parsing locates the literal markers.

use std::fmt;

use crate::compose::error::{ComposeError, ResolutionTarget};

const MESSAGE_ID_MARKER: &str = "?messageId=";
const SUBJECT_MARKER: &str = "&subject=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub folder_uri: String,
    pub message_id: String,
    /// Template subject at the time the filter was saved. Informational only.
    pub subject: String,
}

impl TemplateRef {
    pub fn new(folder_uri: impl Into<String>, message_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            folder_uri: folder_uri.into(),
            message_id: message_id.into(),
            subject: subject.into(),
        }
    }

    /// Parse a reference. Both `?messageId=` and `&subject=` must be present.
    pub fn parse(s: &str) -> Result<Self, ComposeError> {
        let query = s
            .find(MESSAGE_ID_MARKER)
            .ok_or_else(|| ComposeError::resolution(ResolutionTarget::TemplateReference, format!("no message id in {}", s)))?;
        let id_start = query + MESSAGE_ID_MARKER.len();
        let subject = s[id_start..]
            .find(SUBJECT_MARKER)
            .map(|i| id_start + i)
            .ok_or_else(|| ComposeError::resolution(ResolutionTarget::TemplateReference, format!("no subject in {}", s)))?;
        Ok(Self {
            folder_uri: s[..query].to_string(),
            message_id: s[id_start..subject].to_string(),
            subject: s[subject + SUBJECT_MARKER.len()..].to_string(),
        })
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.folder_uri, MESSAGE_ID_MARKER, self.message_id, SUBJECT_MARKER, self.subject
        )
    }
}
