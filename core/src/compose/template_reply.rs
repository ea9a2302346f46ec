/*
 * template_reply.rs
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

//! Filter-driven auto-reply from a stored template message (RFC 3834).
//!
//! The template's raw RFC 822 bytes are streamed through a [`BoundaryExtractor`]; when the stream
//! completes, the body becomes the body of a reply which is sent immediately. Mail not addressed
//! to one of the account's identities (lists, bulk, Bcc) gets no reply.
//!
//! ```text
//! Idle -> Streaming -> BuildingReply -> Sending -> Done
//!            |                            |
//!            +--------> Failed <----------+
//! ```

use std::sync::{Arc, Mutex};

use encoding_rs::{Encoding, UTF_8};

use crate::compose::boundary::BoundaryExtractor;
use crate::compose::error::{ComposeError, ResolutionTarget};
use crate::compose::request::{ComposeFormat, ComposeType, MessageWindow, ResolvedParams};
use crate::compose::resolver::ComposeParamResolver;
use crate::compose::template_ref::TemplateRef;
use crate::identity::{Identity, ServerKey};
use crate::store::{
    poisoned, ComposeHost, DispositionState, MessageHeader, MessageServices, MessageStore, StoreError,
};

/// Subject prefix of automatic replies (RFC 3834 3.1.5).
const AUTO_SUBJECT_PREFIX: &str = "Auto: ";
const AUTO_SUBMITTED: &str = "Auto-Submitted";
const AUTO_REPLIED: &str = "auto-replied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// No reply is due (message not addressed to the account).
    Suppressed,
    /// The template stream or the send failed.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    Idle,
    Streaming,
    BuildingReply,
    Sending,
    Done,
    Failed(FailReason),
}

impl ReplyState {
    /// Idle becomes `Failed(Suppressed)`. A reply already under way is not affected.
    pub fn suppress(self) -> Self {
        match self {
            ReplyState::Idle => ReplyState::Failed(FailReason::Suppressed),
            other => other,
        }
    }
}

/// Outcome of a template reply that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Sent,
    Suppressed,
}

/// Called once with the outcome of a template reply that got past resolution.
pub type ReplyCallback = Box<dyn FnOnce(Result<ReplyStatus, ComposeError>) + Send>;

/// Everything resolved before the template is streamed.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateReplyPlan {
    /// Identity the original was addressed to; the reply is sent from it.
    pub identity: Identity,
    pub reply_to: String,
    pub original: MessageHeader,
    pub original_uri: String,
    pub template: MessageHeader,
    pub template_uri: String,
}

/// First identity whose address occurs (case-insensitively) in the recipients or cc list.
pub fn addressed_identity<'a>(identities: &'a [Identity], header: &MessageHeader) -> Option<&'a Identity> {
    let recipients = header.recipients.to_lowercase();
    let cc_list = header.cc_list.to_lowercase();
    identities.iter().find(|identity| {
        let email = identity.email.trim().to_lowercase();
        !email.is_empty() && (recipients.contains(&email) || cc_list.contains(&email))
    })
}

/// Decode template body bytes with the template's stored charset (UTF-8 when unknown).
pub fn decode_body(charset: Option<&str>, body: &[u8]) -> String {
    let encoding = match charset.map(str::trim).filter(|c| !c.is_empty()) {
        Some(label) => Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
            tracing::warn!("unknown template charset {}, decoding as UTF-8", label);
            UTF_8
        }),
        None => UTF_8,
    };
    let (text, _, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::warn!("template body is not valid {}", encoding.name());
    }
    text.into_owned()
}

/// Reply subject: `Auto: <template subject>`, plus ` (was: <original subject>)` when there was one.
pub fn auto_reply_subject(template_subject: &str, original_subject: &str) -> String {
    let mut subject = String::from(AUTO_SUBJECT_PREFIX);
    subject.push_str(template_subject);
    if !original_subject.is_empty() {
        subject.push_str(" (was: ");
        subject.push_str(original_subject);
        subject.push(')');
    }
    subject
}

/// Compose parameters of the reply, with `body` the raw template body bytes.
pub fn build_reply_params(plan: &TemplateReplyPlan, body: &[u8]) -> ResolvedParams {
    let mut params = ResolvedParams::new(ComposeType::ReplyWithTemplate, ComposeFormat::Default);
    params.compose_html = plan.identity.compose_html;
    params.identity = Some(plan.identity.clone());
    params.original_uri = Some(plan.original_uri.clone());
    params.original_header = Some(plan.original.clone());
    params.fields.to = plan.reply_to.clone();
    params.fields.subject = auto_reply_subject(&plan.template.subject, &plan.original.subject);
    params.fields.set_raw_header(AUTO_SUBMITTED, AUTO_REPLIED);
    params.fields.character_set = plan.template.charset.clone();
    params.fields.body = decode_body(plan.template.charset.as_deref(), body);
    params
}

/// State of one template reply. Driven by the stream and send callbacks, one at a time.
#[derive(Debug)]
pub struct TemplateReply {
    state: ReplyState,
    extractor: BoundaryExtractor,
    plan: TemplateReplyPlan,
}

impl TemplateReply {
    pub fn new(plan: TemplateReplyPlan) -> Self {
        Self {
            state: ReplyState::Idle,
            extractor: BoundaryExtractor::new(),
            plan,
        }
    }

    pub fn state(&self) -> ReplyState {
        self.state
    }

    pub fn plan(&self) -> &TemplateReplyPlan {
        &self.plan
    }

    pub fn start_streaming(&mut self) {
        if self.state == ReplyState::Idle {
            self.state = ReplyState::Streaming;
        }
    }

    pub fn on_chunk(&mut self, data: &[u8]) {
        if self.state == ReplyState::Streaming {
            self.extractor.feed(data);
        } else {
            tracing::debug!("ignoring {} bytes in state {:?}", data.len(), self.state);
        }
    }

    /// End of the template stream. On success returns the reply to send; a failed stream never
    /// produces a reply.
    pub fn on_stream_complete(&mut self, status: Result<(), StoreError>) -> Result<ResolvedParams, ComposeError> {
        if self.state != ReplyState::Streaming {
            return Err(ComposeError::InvalidArgument(format!(
                "stream completed in state {:?}",
                self.state
            )));
        }
        if let Err(e) = status {
            self.state = ReplyState::Failed(FailReason::Error);
            return Err(ComposeError::Stream(e));
        }
        self.state = ReplyState::BuildingReply;
        tracing::debug!("template {} streamed {} body bytes", self.plan.template_uri, self.extractor.body_len());
        let body = std::mem::take(&mut self.extractor).finish();
        if body.is_empty() {
            tracing::warn!("template {} has no body", self.plan.template_uri);
        }
        let params = build_reply_params(&self.plan, &body);
        self.state = ReplyState::Sending;
        Ok(params)
    }

    pub fn on_send_complete(&mut self, status: Result<(), StoreError>) -> Result<ReplyStatus, ComposeError> {
        if self.state != ReplyState::Sending {
            return Err(ComposeError::InvalidArgument(format!(
                "send completed in state {:?}",
                self.state
            )));
        }
        match status {
            Ok(()) => {
                self.state = ReplyState::Done;
                Ok(ReplyStatus::Sent)
            }
            Err(e) => {
                self.state = ReplyState::Failed(FailReason::Error);
                Err(ComposeError::Send(e))
            }
        }
    }
}

fn lock_failed<T>(e: std::sync::PoisonError<T>) -> ComposeError {
    ComposeError::Store(poisoned(e))
}

/// Runs template replies against the message store, retrieval services and compose host.
pub struct TemplateAutoReplyWorkflow {
    resolver: Arc<ComposeParamResolver>,
    store: Arc<dyn MessageStore>,
    services: Arc<dyn MessageServices>,
    host: Arc<dyn ComposeHost>,
}

impl TemplateAutoReplyWorkflow {
    pub fn new(
        resolver: Arc<ComposeParamResolver>,
        store: Arc<dyn MessageStore>,
        services: Arc<dyn MessageServices>,
        host: Arc<dyn ComposeHost>,
    ) -> Self {
        Self {
            resolver,
            store,
            services,
            host,
        }
    }

    /// Reply to `original` (received on `server`) with the template named by `template_ref`.
    ///
    /// Resolution failures return `Err` before anything is streamed and `on_done` is not called.
    /// Otherwise `on_done` gets `Suppressed` (immediately), `Sent`, or the stream/send error. On
    /// `Sent` the original has been marked replied.
    pub fn start(
        &self,
        original: &MessageHeader,
        template_ref: &str,
        server: &ServerKey,
        window: &MessageWindow,
        on_done: ReplyCallback,
    ) -> Result<(), ComposeError> {
        let identities = self.resolver.identities_for_server(server)?;
        let Some(identity) = addressed_identity(&identities, original).cloned() else {
            let state = ReplyState::Idle.suppress();
            tracing::info!(
                "not replying to {}: not addressed to any identity of {} ({:?})",
                original.message_id,
                server.0,
                state
            );
            on_done(Ok(ReplyStatus::Suppressed));
            return Ok(());
        };
        let reply_to = original
            .reply_address()
            .map(str::to_string)
            .ok_or(ComposeError::NoRecipient)?;

        let template_ref = TemplateRef::parse(template_ref)?;
        let folder = self
            .store
            .existing_folder(&template_ref.folder_uri)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Folder, e))?;
        let database = folder
            .message_database()
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Database, e))?;
        let template = database.header_for_message_id(&template_ref.message_id).ok_or_else(|| {
            ComposeError::resolution(
                ResolutionTarget::MessageId,
                format!("{} not in {}", template_ref.message_id, template_ref.folder_uri),
            )
        })?;
        let template_uri = folder.uri_for_message(&template);
        let service = self
            .services
            .service_for_uri(&template_uri)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Service, e))?;
        let original_folder = self
            .store
            .folder_for_header(original)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Folder, e))?;
        let original_uri = original_folder.uri_for_message(original);

        tracing::debug!("replying from {} with template {}", identity.email, template_uri);
        let mut reply = TemplateReply::new(TemplateReplyPlan {
            identity,
            reply_to,
            original: original.clone(),
            original_uri,
            template,
            template_uri: template_uri.clone(),
        });
        reply.start_streaming();
        let reply = Arc::new(Mutex::new(reply));

        let chunk_reply = Arc::clone(&reply);
        let on_chunk = Box::new(move |data: &[u8]| {
            if let Ok(mut r) = chunk_reply.lock() {
                r.on_chunk(data);
            }
        });

        let host = Arc::clone(&self.host);
        let surface = window.surface;
        let on_complete = Box::new(move |status: Result<(), StoreError>| {
            let built = reply.lock().map_err(lock_failed).and_then(|mut r| r.on_stream_complete(status));
            let params = match built {
                Ok(params) => params,
                Err(e) => {
                    tracing::warn!("template reply aborted: {}", e);
                    on_done(Err(e));
                    return;
                }
            };
            let original = params.original_header.clone().unwrap_or_default();
            host.send_now(
                params,
                surface,
                Box::new(move |sent| {
                    let outcome = reply.lock().map_err(lock_failed).and_then(|mut r| r.on_send_complete(sent));
                    if outcome.is_ok() {
                        // Conceptually a reply, so the original is marked replied.
                        if let Err(e) = original_folder.add_disposition_state(&original, DispositionState::Replied) {
                            tracing::warn!("could not mark {} replied: {}", original.message_id, e);
                        }
                        tracing::info!("sent template reply to {}", original.message_id);
                    }
                    on_done(outcome);
                }),
            );
        });

        service
            .stream_message(&template_uri, window.surface, false, on_chunk, on_complete)
            .map_err(ComposeError::Stream)
    }
}
