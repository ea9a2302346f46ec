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

//! Compose request pipeline.
//!
//! Requests (new, reply, forward, stored message, news post, mailto) are resolved by
//! [`ComposeParamResolver`] into either parameters for a compose surface or a draft conversion
//! run by [`DraftConversionPipeline`]. [`TemplateAutoReplyWorkflow`] sends canned replies from a
//! Templates folder. [`ComposeService`] ties these together with the [`SessionRegistry`].

pub mod boundary;
pub mod command_line;
pub mod draft;
mod error;
pub mod html;
pub mod html_domains;
pub mod mailto;
pub mod quoting;
pub mod registry;
mod request;
pub mod resolver;
pub mod service;
pub mod template_ref;
pub mod template_reply;

pub use boundary::BoundaryExtractor;
pub use command_line::ComposeCommand;
pub use draft::{DraftConversionPipeline, DraftRequest};
pub use error::{ComposeError, ResolutionTarget};
pub use html::HtmlSanitizer;
pub use quoting::{QuoteSkip, QuotingPolicy};
pub use registry::{SessionArena, SessionHandle, SessionRegistry, SurfaceId};
pub use request::{
    ComposeFields, ComposeFormat, ComposeRequest, ComposeType, MessageWindow, OriginalMessage, ReplyKind,
    ResolvedParams, SelectionSource, StoredMessageKind,
};
pub use resolver::{ComposeParamResolver, ForwardMode, Resolution};
pub use service::{cleanup_temp_files, ComposeContext, ComposeFuture, ComposeService, ComposeSession, ForwardCallback};
pub use template_ref::TemplateRef;
pub use template_reply::{ReplyCallback, ReplyStatus, TemplateAutoReplyWorkflow};
