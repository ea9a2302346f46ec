/*
 * request.rs
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

//! Compose requests, resolved compose parameters and compose fields.

use std::sync::Arc;

use crate::compose::registry::SurfaceId;
use crate::identity::Identity;
use crate::store::{MessageHeader, StoreError};

/// Compose type handed to the compose session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposeType {
    New,
    Reply,
    ReplyAll,
    ReplyToSender,
    ReplyToGroup,
    ReplyToSenderAndGroup,
    ReplyToList,
    ForwardInline,
    ForwardAsAttachment,
    Draft,
    Template,
    ReplyWithTemplate,
    Redirect,
    EditAsNew,
    MailToUrl,
    NewsPost,
}

/// Requested body format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposeFormat {
    Html,
    PlainText,
    #[default]
    Default,
    OppositeOfDefault,
}

/// Recipient, subject and body of the message being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeFields {
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub newsgroups: String,
    /// News server URL (`news://host[:port]`) for a news post.
    pub newspost_url: String,
    pub references: String,
    pub subject: String,
    pub body: String,
    pub character_set: Option<String>,
    /// Extra headers, in insertion order.
    pub raw_headers: Vec<(String, String)>,
}

impl ComposeFields {
    /// Set a raw header, replacing any header of the same name (case-insensitive).
    pub fn set_raw_header(&mut self, name: &str, value: &str) {
        match self.raw_headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.raw_headers.push((name.to_string(), value.to_string())),
        }
    }

    pub fn raw_header(&self, name: &str) -> Option<&str> {
        self.raw_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True when no recipient of any kind is set.
    pub fn has_no_recipient(&self) -> bool {
        self.to.trim().is_empty()
            && self.cc.trim().is_empty()
            && self.bcc.trim().is_empty()
            && self.newsgroups.trim().is_empty()
    }
}

/// The message a reply, forward or draft refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalMessage {
    pub uri: String,
    pub header: Option<MessageHeader>,
}

impl OriginalMessage {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            header: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Reply,
    ReplyAll,
    ReplyToSender,
    ReplyToGroup,
    ReplyToSenderAndGroup,
    ReplyToList,
}

impl ReplyKind {
    pub fn compose_type(self) -> ComposeType {
        match self {
            ReplyKind::Reply => ComposeType::Reply,
            ReplyKind::ReplyAll => ComposeType::ReplyAll,
            ReplyKind::ReplyToSender => ComposeType::ReplyToSender,
            ReplyKind::ReplyToGroup => ComposeType::ReplyToGroup,
            ReplyKind::ReplyToSenderAndGroup => ComposeType::ReplyToSenderAndGroup,
            ReplyKind::ReplyToList => ComposeType::ReplyToList,
        }
    }
}

/// Compose types whose content comes from running a stored message through the MIME converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredMessageKind {
    ForwardInline,
    Draft,
    Template,
    ReplyWithTemplate,
    Redirect,
    EditAsNew,
}

impl StoredMessageKind {
    pub fn compose_type(self) -> ComposeType {
        match self {
            StoredMessageKind::ForwardInline => ComposeType::ForwardInline,
            StoredMessageKind::Draft => ComposeType::Draft,
            StoredMessageKind::Template => ComposeType::Template,
            StoredMessageKind::ReplyWithTemplate => ComposeType::ReplyWithTemplate,
            StoredMessageKind::Redirect => ComposeType::Redirect,
            StoredMessageKind::EditAsNew => ComposeType::EditAsNew,
        }
    }
}

/// A request to compose, one variant per trigger. Each variant carries exactly what it needs.
#[derive(Debug, Clone)]
pub enum ComposeRequest {
    New {
        format: ComposeFormat,
        identity: Option<Identity>,
        fields: ComposeFields,
    },
    Reply {
        kind: ReplyKind,
        format: ComposeFormat,
        identity: Option<Identity>,
        original: OriginalMessage,
        /// Do not quote the current selection even if quoting is enabled.
        ignore_quote: bool,
    },
    ForwardAsAttachment {
        format: ComposeFormat,
        identity: Option<Identity>,
        original: OriginalMessage,
    },
    StoredMessage {
        kind: StoredMessageKind,
        format: ComposeFormat,
        identity: Option<Identity>,
        original: OriginalMessage,
    },
    NewsPost {
        format: ComposeFormat,
        identity: Option<Identity>,
        /// `[s]news://host[:port]/group`
        group_uri: Option<String>,
    },
    MailTo {
        /// Raw `mailto:` URI.
        url: String,
        identity: Option<Identity>,
    },
}

impl ComposeRequest {
    pub fn compose_type(&self) -> ComposeType {
        match self {
            ComposeRequest::New { .. } => ComposeType::New,
            ComposeRequest::Reply { kind, .. } => kind.compose_type(),
            ComposeRequest::ForwardAsAttachment { .. } => ComposeType::ForwardAsAttachment,
            ComposeRequest::StoredMessage { kind, .. } => kind.compose_type(),
            ComposeRequest::NewsPost { .. } => ComposeType::NewsPost,
            ComposeRequest::MailTo { .. } => ComposeType::MailToUrl,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ComposeRequest::New { identity, .. }
            | ComposeRequest::Reply { identity, .. }
            | ComposeRequest::ForwardAsAttachment { identity, .. }
            | ComposeRequest::StoredMessage { identity, .. }
            | ComposeRequest::NewsPost { identity, .. }
            | ComposeRequest::MailTo { identity, .. } => identity.as_ref(),
        }
    }
}

/// Fully resolved compose parameters: what a compose session is created from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    pub compose_type: ComposeType,
    pub format: ComposeFormat,
    /// Effective body format after identity and preference resolution.
    pub compose_html: bool,
    pub identity: Option<Identity>,
    pub original_uri: Option<String>,
    pub original_header: Option<MessageHeader>,
    /// Selection to quote instead of the whole original message.
    pub html_to_quote: Option<String>,
    pub fields: ComposeFields,
}

impl ResolvedParams {
    pub fn new(compose_type: ComposeType, format: ComposeFormat) -> Self {
        Self {
            compose_type,
            format,
            compose_html: matches!(format, ComposeFormat::Html),
            identity: None,
            original_uri: None,
            original_header: None,
            html_to_quote: None,
            fields: ComposeFields::default(),
        }
    }
}

/// Text selection in the message pane the request was issued from.
pub trait SelectionSource: Send + Sync {
    /// Selection as plain text.
    fn selection_text(&self) -> String;
    /// Selection serialized as HTML.
    fn selection_html(&self) -> Result<String, StoreError>;
}

/// The message window a request was issued from.
#[derive(Clone, Default)]
pub struct MessageWindow {
    pub surface: Option<SurfaceId>,
    /// Character set the user forced for display of the current message.
    pub charset_override: Option<String>,
    pub selection: Option<Arc<dyn SelectionSource>>,
}

impl std::fmt::Debug for MessageWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageWindow")
            .field("surface", &self.surface)
            .field("charset_override", &self.charset_override)
            .field("has_selection", &self.selection.is_some())
            .finish()
    }
}
