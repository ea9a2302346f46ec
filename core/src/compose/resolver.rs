/*
 * resolver.rs
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

//! Compose parameter resolution: identity, body format, quoted selection and mailto fields.

use std::sync::Arc;

use crate::compose::draft::DraftRequest;
use crate::compose::error::{ComposeError, ResolutionTarget};
use crate::compose::html::{escape_html, HtmlSanitizer};
use crate::compose::mailto::MailtoUrl;
use crate::compose::quoting::{selection_html_to_quote, QuotingPolicy};
use crate::compose::request::{
    ComposeFields, ComposeFormat, ComposeRequest, ComposeType, MessageWindow, ResolvedParams,
};
use crate::config::{PreferenceStore, PREF_FORWARD_MESSAGE_MODE, PREF_HTML_COMPOSE};
use crate::identity::{Identity, IdentityStore, ServerKey};
use crate::uri::split_news_uri;

/// What a request resolves to: parameters for a compose session, or a stored message that must
/// first go through the MIME converter.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Compose(ResolvedParams),
    Convert(DraftRequest),
}

/// How a filter forwards a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMode {
    /// Use `mail.forward_message_mode`.
    Default,
    Attachment,
    Inline,
}

pub struct ComposeParamResolver {
    identities: Arc<dyn IdentityStore>,
    prefs: Arc<dyn PreferenceStore>,
    sanitizer: Arc<dyn HtmlSanitizer>,
}

impl ComposeParamResolver {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        prefs: Arc<dyn PreferenceStore>,
        sanitizer: Arc<dyn HtmlSanitizer>,
    ) -> Self {
        Self {
            identities,
            prefs,
            sanitizer,
        }
    }

    /// Default identity of the default account. A missing account (or a failing account store) is
    /// not an error here: callers fall back to preferences.
    pub fn default_identity(&self) -> Option<Identity> {
        match self.identities.default_identity() {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("could not read default identity: {}", e);
                None
            }
        }
    }

    fn identity_or_default(&self, identity: Option<Identity>) -> Option<Identity> {
        identity.or_else(|| {
            let found = self.default_identity();
            match &found {
                Some(id) => tracing::debug!("using default identity {}", id.key),
                None => tracing::debug!("no identity configured"),
            }
            found
        })
    }

    /// Whether to compose in HTML for `format`, given the identity (or the default identity).
    pub fn determine_compose_html(&self, identity: Option<&Identity>, format: ComposeFormat) -> bool {
        match format {
            ComposeFormat::Html => true,
            ComposeFormat::PlainText => false,
            ComposeFormat::Default | ComposeFormat::OppositeOfDefault => {
                let default_html = match identity {
                    Some(identity) => identity.compose_html,
                    None => match self.default_identity() {
                        Some(identity) => identity.compose_html,
                        None => self.prefs.bool_pref(PREF_HTML_COMPOSE).unwrap_or(true),
                    },
                };
                if format == ComposeFormat::OppositeOfDefault {
                    !default_html
                } else {
                    default_html
                }
            }
        }
    }

    pub fn quoting_policy(&self) -> QuotingPolicy {
        QuotingPolicy::from_prefs(self.prefs.as_ref())
    }

    fn params(&self, compose_type: ComposeType, format: ComposeFormat, identity: Option<Identity>) -> ResolvedParams {
        let mut params = ResolvedParams::new(compose_type, format);
        params.compose_html = self.determine_compose_html(identity.as_ref(), format);
        params.identity = identity;
        params
    }

    /// Resolve a compose request. The identity defaults to the default identity before anything else.
    pub fn resolve(&self, request: ComposeRequest, window: &MessageWindow) -> Result<Resolution, ComposeError> {
        let compose_type = request.compose_type();
        let resolution = match request {
            ComposeRequest::New {
                format,
                identity,
                fields,
            } => {
                let mut params = self.params(compose_type, format, self.identity_or_default(identity));
                params.fields = fields;
                Resolution::Compose(params)
            }
            ComposeRequest::Reply {
                format,
                identity,
                original,
                ignore_quote,
                ..
            } => {
                let mut params = self.params(compose_type, format, self.identity_or_default(identity));
                if !ignore_quote {
                    match selection_html_to_quote(&self.quoting_policy(), window.selection.as_deref()) {
                        Ok(html) => params.html_to_quote = Some(html),
                        Err(skip) => tracing::debug!("not quoting selection: {:?}", skip),
                    }
                }
                params.original_uri = Some(original.uri);
                params.original_header = original.header;
                Resolution::Compose(params)
            }
            ComposeRequest::ForwardAsAttachment {
                format,
                identity,
                original,
            } => {
                let mut params = self.params(compose_type, format, self.identity_or_default(identity));
                params.original_uri = Some(original.uri);
                params.original_header = original.header;
                Resolution::Compose(params)
            }
            ComposeRequest::StoredMessage {
                kind,
                format,
                identity,
                original,
            } => Resolution::Convert(DraftRequest::stored_message(
                kind,
                format,
                self.identity_or_default(identity),
                original,
            )),
            ComposeRequest::NewsPost {
                format,
                identity,
                group_uri,
            } => {
                let mut params = self.params(compose_type, format, self.identity_or_default(identity));
                if let Some(uri) = group_uri.filter(|u| !u.is_empty()) {
                    let (server, group) = split_news_uri(&uri);
                    params.fields.newspost_url = server;
                    params.fields.newsgroups = group;
                }
                Resolution::Compose(params)
            }
            ComposeRequest::MailTo { url, identity } => {
                let mut params = self.params_for_mailto(&url)?;
                params.identity = self.identity_or_default(identity);
                Resolution::Compose(params)
            }
        };
        if let Resolution::Compose(ref params) = resolution {
            tracing::debug!(
                "resolved {:?}: html={} quote={}",
                params.compose_type,
                params.compose_html,
                params.html_to_quote.is_some()
            );
        }
        Ok(resolution)
    }

    /// Compose parameters for a `mailto:` URL. The body format is decided without an identity;
    /// an `html-body` parameter requests HTML. Untrusted HTML is sanitized, and a sanitizer failure
    /// falls back to plain text with the body left as given.
    pub fn params_for_mailto(&self, url: &str) -> Result<ResolvedParams, ComposeError> {
        let mailto = MailtoUrl::parse(url)?;
        let mut compose_html = self.determine_compose_html(None, mailto.requested_format);

        let mut sanitized = String::new();
        let raw = if mailto.html_body.is_empty() {
            if compose_html {
                sanitized = escape_html(&mailto.body);
                String::new()
            } else {
                mailto.body
            }
        } else {
            mailto.html_body
        };
        if !raw.is_empty() && compose_html {
            match self.sanitizer.sanitize(&raw) {
                Ok(clean) => sanitized = clean,
                Err(e) => {
                    tracing::warn!("HTML sanitizer failed, composing as plain text: {}", e);
                    compose_html = false;
                }
            }
        }

        let format = if compose_html {
            ComposeFormat::Html
        } else {
            ComposeFormat::PlainText
        };
        let mut params = ResolvedParams::new(ComposeType::MailToUrl, format);
        params.compose_html = compose_html;
        params.fields = ComposeFields {
            to: mailto.to,
            cc: mailto.cc,
            bcc: mailto.bcc,
            newsgroups: mailto.newsgroups,
            references: mailto.references,
            subject: mailto.subject,
            body: if compose_html { sanitized } else { raw },
            ..ComposeFields::default()
        };
        Ok(params)
    }

    /// Effective forward mode: `Default` reads `mail.forward_message_mode` (0 is attachment).
    pub fn forward_mode(&self, mode: ForwardMode) -> ForwardMode {
        match mode {
            ForwardMode::Default => match self.prefs.int_pref(PREF_FORWARD_MESSAGE_MODE).unwrap_or(0) {
                0 => ForwardMode::Attachment,
                _ => ForwardMode::Inline,
            },
            other => other,
        }
    }

    /// Identity a filter on `server` sends from: the account's default identity, else the global default.
    pub fn identity_for_server(&self, server: &ServerKey) -> Result<Identity, ComposeError> {
        let account = self
            .identities
            .account_for_server(server)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Account, e))?;
        let identity = match self.identities.default_identity_for_account(&account) {
            Ok(Some(identity)) => Some(identity),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("no identity for account {}: {}", account.0, e);
                None
            }
        };
        identity
            .or_else(|| self.default_identity())
            .ok_or(ComposeError::NoDefaultIdentity)
    }

    /// Identities of the account owning `server`, default identity first.
    pub fn identities_for_server(&self, server: &ServerKey) -> Result<Vec<Identity>, ComposeError> {
        let account = self
            .identities
            .account_for_server(server)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Account, e))?;
        self.identities
            .identities_for_account(&account)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Account, e))
    }
}
