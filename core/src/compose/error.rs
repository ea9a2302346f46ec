/*
 * error.rs
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

//! Compose pipeline errors.
//!
//! Configuration gaps (no account) and policy gates (quoting, sanitizing) are not errors: they
//! degrade to a safe default. Auto-reply suppression is a normal outcome (`ReplyStatus::Suppressed`).

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// What could not be resolved before any side effect took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTarget {
    Account,
    Service,
    Url,
    Converter,
    Folder,
    Database,
    MessageId,
    TemplateReference,
}

impl fmt::Display for ResolutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionTarget::Account => "account",
            ResolutionTarget::Service => "message service",
            ResolutionTarget::Url => "message URL",
            ResolutionTarget::Converter => "MIME converter",
            ResolutionTarget::Folder => "folder",
            ResolutionTarget::Database => "message database",
            ResolutionTarget::MessageId => "message id",
            ResolutionTarget::TemplateReference => "template reference",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("no default identity configured")]
    NoDefaultIdentity,
    #[error("no recipient to send to")]
    NoRecipient,
    #[error("could not resolve {what}: {detail}")]
    Resolution { what: ResolutionTarget, detail: String },
    #[error("message stream failed: {0}")]
    Stream(StoreError),
    #[error("send failed: {0}")]
    Send(StoreError),
    #[error("no compose session for surface")]
    NotFound,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ComposeError {
    pub fn resolution(what: ResolutionTarget, detail: impl fmt::Display) -> Self {
        Self::Resolution {
            what,
            detail: detail.to_string(),
        }
    }

    /// True for failures that happen before anything was streamed or sent.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            ComposeError::Resolution { .. } | ComposeError::NoDefaultIdentity | ComposeError::NoRecipient
        )
    }
}
