/*
 * draft.rs
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

//! Draft conversion: run a stored message through the MIME converter to seed a compose session.
//!
//! Drafts, templates, redirects, edit-as-new and inline forwards all work this way. The
//! retrieval service streams the message into the converter, which then opens a compose
//! surface (or, when forwarding inline to an address, sends directly) and reports through the
//! result callback.
//!
//! Everything that can fail before streaming (service, converter, URL) fails synchronously;
//! after that, failures arrive through the converter's result callback.

use std::sync::{Arc, Mutex};

use crate::compose::error::{ComposeError, ResolutionTarget};
use crate::compose::request::{ComposeFormat, MessageWindow, OriginalMessage, StoredMessageKind};
use crate::identity::Identity;
use crate::store::{
    ConverterSettings, DraftResultCallback, MessageHeader, MessageServices, MessageUrl, MimeConverter,
    MimeConverterFactory, OutputKind, StoreError,
};
use crate::uri::{file_to_mailbox_uri, is_message_display_uri, with_query_flag, FETCH_COMPLETE_MESSAGE};

/// A stored message to convert, with the converter settings it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRequest {
    /// URI to stream: the message URI plus query terms (`fetchCompleteMessage=true`, ...).
    pub uri: String,
    pub output: OutputKind,
    pub identity: Option<Identity>,
    /// Message URI without the extra query terms.
    pub original_uri: String,
    pub original_header: Option<MessageHeader>,
    pub forward_inline: bool,
    /// Forward the converted message straight to this address (filter action), skipping the compose surface.
    pub forward_to: Option<String>,
    /// Use the opposite of the identity's default compose format.
    pub override_compose_format: bool,
}

impl DraftRequest {
    /// Request for opening a stored message as a draft, template, redirect, edit-as-new or inline forward.
    pub fn stored_message(
        kind: StoredMessageKind,
        format: ComposeFormat,
        identity: Option<Identity>,
        original: OriginalMessage,
    ) -> Self {
        let mut uri = with_query_flag(&original.uri, FETCH_COMPLETE_MESSAGE);
        match kind {
            StoredMessageKind::Redirect => uri.push_str("&redirect=true"),
            StoredMessageKind::EditAsNew => uri.push_str("&editasnew=true"),
            _ => {}
        }
        let output = match kind {
            StoredMessageKind::ForwardInline | StoredMessageKind::Draft => OutputKind::DraftOrTemplate,
            _ => OutputKind::EditorTemplate,
        };
        Self {
            uri,
            output,
            identity,
            original_uri: original.uri,
            original_header: original.header,
            forward_inline: kind == StoredMessageKind::ForwardInline,
            forward_to: None,
            override_compose_format: format == ComposeFormat::OppositeOfDefault,
        }
    }

    /// Inline forward of a message to `forward_to`, sent without opening a compose surface.
    /// The streamed URI doubles as the original URI.
    pub fn forward_inline(message_uri: &str, header: MessageHeader, identity: Identity, forward_to: &str) -> Self {
        let uri = with_query_flag(message_uri, FETCH_COMPLETE_MESSAGE);
        Self {
            original_uri: uri.clone(),
            uri,
            output: OutputKind::DraftOrTemplate,
            identity: Some(identity),
            original_header: Some(header),
            forward_inline: true,
            forward_to: Some(forward_to.to_string()),
            override_compose_format: false,
        }
    }
}

/// Drives stored messages through the MIME converter.
pub struct DraftConversionPipeline {
    services: Arc<dyn MessageServices>,
    converters: Arc<dyn MimeConverterFactory>,
}

impl DraftConversionPipeline {
    pub fn new(services: Arc<dyn MessageServices>, converters: Arc<dyn MimeConverterFactory>) -> Self {
        Self { services, converters }
    }

    /// Start converting `request`. `Ok` means streaming started and `on_result` will be called by
    /// the converter; `Err` means nothing was streamed and `on_result` is dropped uncalled.
    pub fn convert(
        &self,
        request: DraftRequest,
        window: &MessageWindow,
        on_result: DraftResultCallback,
    ) -> Result<(), ComposeError> {
        let service = self
            .services
            .service_for_uri(&request.uri)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Service, e))?;
        let mut converter = self
            .converters
            .create_converter()
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Converter, e))?;

        // Loaded .eml files are addressed as part 0 of a mailbox URI so inline images keep their tagging.
        let mailbox_uri = file_to_mailbox_uri(&request.uri);
        if let Some(ref rewritten) = mailbox_uri {
            tracing::debug!("rewrote {} to {}", request.uri, rewritten);
        }
        let forward_to = request.forward_to.filter(|addr| !addr.trim().is_empty());
        converter.configure(ConverterSettings {
            output: request.output,
            forward_inline: request.forward_inline,
            forward_inline_filter: forward_to.is_some(),
            forward_to,
            override_compose_format: request.override_compose_format,
            identity: request.identity,
            original_uri: mailbox_uri.clone().unwrap_or(request.original_uri),
            original_header: request.original_header,
        });

        let spec = mailbox_uri.clone().unwrap_or_else(|| request.uri.clone());
        let mut url = if mailbox_uri.is_some() || is_message_display_uri(&request.uri) {
            MessageUrl::new(spec.clone())
        } else {
            service
                .url_for_uri(&request.uri, window.surface)
                .map_err(|e| ComposeError::resolution(ResolutionTarget::Url, e))?
        };
        url.spec = spec;
        url.charset_override = window.charset_override.clone();

        converter
            .async_convert(&url, on_result)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Converter, e))?;

        let converter: Arc<Mutex<Box<dyn MimeConverter>>> = Arc::new(Mutex::new(converter));
        let receive_error: Arc<Mutex<Option<StoreError>>> = Arc::new(Mutex::new(None));

        let chunk_converter = Arc::clone(&converter);
        let chunk_error = Arc::clone(&receive_error);
        let on_chunk = Box::new(move |data: &[u8]| {
            let Ok(mut failed) = chunk_error.lock() else {
                return;
            };
            if failed.is_some() {
                return;
            }
            match chunk_converter.lock() {
                Ok(mut c) => {
                    if let Err(e) = c.receive(data) {
                        tracing::warn!("converter rejected data: {}", e);
                        *failed = Some(e);
                    }
                }
                Err(_) => *failed = Some(StoreError::new("converter lock poisoned")),
            }
        });

        let stream_uri = request.uri.clone();
        let on_complete = Box::new(move |status: Result<(), StoreError>| {
            let recorded = receive_error.lock().ok().and_then(|mut e| e.take());
            let status = match (status, recorded) {
                (Err(e), _) => Err(e),
                (Ok(()), Some(e)) => Err(e),
                (Ok(()), None) => Ok(()),
            };
            match &status {
                Ok(()) => tracing::debug!("finished streaming {}", stream_uri),
                Err(e) => tracing::warn!("streaming {} failed: {}", stream_uri, e),
            }
            match converter.lock() {
                Ok(mut c) => c.finish(status),
                Err(_) => tracing::warn!("converter lock poisoned; conversion result lost"),
            }
        });

        tracing::debug!("streaming {} into converter", request.uri);
        service
            .display_message(
                &request.uri,
                window.surface,
                window.charset_override.as_deref(),
                on_chunk,
                on_complete,
            )
            .map_err(ComposeError::Stream)
    }
}
