/*
 * service.rs
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

//! Compose service: entry point for opening compose sessions, forwarding and template replies.
//!
//! Work that waits on collaborators is callback driven (`start_*`, `open_compose_window`); the
//! `open_compose`, `forward` and `reply_with_template` futures wrap those callbacks with a
//! oneshot channel.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::compose::command_line::{self, parse_compose_args, ComposeCommand};
use crate::compose::draft::{DraftConversionPipeline, DraftRequest};
use crate::compose::error::{ComposeError, ResolutionTarget};
use crate::compose::html::HtmlSanitizer;
use crate::compose::html_domains::migrate_html_domains;
use crate::compose::registry::{SessionArena, SessionHandle, SessionRegistry, SurfaceId};
use crate::compose::request::{
    ComposeFields, ComposeFormat, ComposeRequest, ComposeType, MessageWindow, ResolvedParams,
};
use crate::compose::resolver::{ComposeParamResolver, ForwardMode, Resolution};
use crate::compose::template_reply::{ReplyCallback, ReplyStatus, TemplateAutoReplyWorkflow};
use crate::config::{PreferenceStore, PREF_LOG_COMPOSE_PERFORMANCE};
use crate::identity::{Identity, IdentityStore, ServerKey};
use crate::store::{
    poisoned, ComposeHost, DispositionState, DraftOutcome, MessageHeader, MessageServices, MessageStore,
    MimeConverterFactory, OpenedCallback, StoreError,
};
use crate::uri::{with_query_flag, FETCH_COMPLETE_MESSAGE};

/// Leftover temp files from earlier runs: (prefix, extension).
const TEMP_FILE_PATTERNS: &[(&str, &str)] = &[("nsmail", "tmp"), ("nsemail", "html"), ("nscopy", "tmp")];

/// Future resolving to an outcome of the compose service.
pub type ComposeFuture<T> = Pin<Box<dyn Future<Output = Result<T, ComposeError>> + Send>>;

/// Called once with the outcome of a forward that got past resolution.
pub type ForwardCallback = Box<dyn FnOnce(Result<(), ComposeError>) + Send>;

/// Collaborators of the compose service.
#[derive(Clone)]
pub struct ComposeContext {
    pub identities: Arc<dyn IdentityStore>,
    pub prefs: Arc<dyn PreferenceStore>,
    pub services: Arc<dyn MessageServices>,
    pub converters: Arc<dyn MimeConverterFactory>,
    pub store: Arc<dyn MessageStore>,
    pub host: Arc<dyn ComposeHost>,
    pub sanitizer: Arc<dyn HtmlSanitizer>,
}

/// A live compose session: the fields being edited plus how the session was opened.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeSession {
    params: ResolvedParams,
    surface: Option<SurfaceId>,
}

impl ComposeSession {
    pub fn params(&self) -> &ResolvedParams {
        &self.params
    }

    pub fn fields(&self) -> &ComposeFields {
        &self.params.fields
    }

    pub fn fields_mut(&mut self) -> &mut ComposeFields {
        &mut self.params.fields
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }
}

#[derive(Default)]
struct Sessions {
    arena: SessionArena<ComposeSession>,
    registry: SessionRegistry,
}

struct PerfClock {
    start: Instant,
    previous: Instant,
}

pub struct ComposeService {
    resolver: Arc<ComposeParamResolver>,
    pipeline: DraftConversionPipeline,
    template_replies: TemplateAutoReplyWorkflow,
    prefs: Arc<dyn PreferenceStore>,
    store: Arc<dyn MessageStore>,
    host: Arc<dyn ComposeHost>,
    sessions: Mutex<Sessions>,
    log_performance: AtomicBool,
    clock: Mutex<PerfClock>,
}

impl ComposeService {
    pub fn new(ctx: ComposeContext) -> Self {
        let resolver = Arc::new(ComposeParamResolver::new(
            Arc::clone(&ctx.identities),
            Arc::clone(&ctx.prefs),
            Arc::clone(&ctx.sanitizer),
        ));
        let now = Instant::now();
        Self {
            pipeline: DraftConversionPipeline::new(Arc::clone(&ctx.services), Arc::clone(&ctx.converters)),
            template_replies: TemplateAutoReplyWorkflow::new(
                Arc::clone(&resolver),
                Arc::clone(&ctx.store),
                Arc::clone(&ctx.services),
                Arc::clone(&ctx.host),
            ),
            resolver,
            prefs: ctx.prefs,
            store: ctx.store,
            host: ctx.host,
            sessions: Mutex::new(Sessions::default()),
            log_performance: AtomicBool::new(false),
            clock: Mutex::new(PerfClock {
                start: now,
                previous: now,
            }),
        }
    }

    /// One-time startup: reset state, merge global HTML domains, remove stale temp files
    /// from the system temp directory.
    pub fn init(&self) -> Result<(), ComposeError> {
        self.init_in(&std::env::temp_dir())
    }

    /// As [`init`](Self::init), cleaning up temp files in `temp_dir`.
    pub fn init_in(&self, temp_dir: &Path) -> Result<(), ComposeError> {
        self.reset()?;
        if let Err(e) = migrate_html_domains(self.prefs.as_ref()) {
            tracing::warn!("HTML domain migration failed: {}", e);
        }
        match cleanup_temp_files(temp_dir) {
            Ok(0) => {}
            Ok(n) => tracing::debug!("removed {} stale compose temp files", n),
            Err(e) => tracing::warn!("could not clean up temp files in {}: {}", temp_dir.display(), e),
        }
        Ok(())
    }

    /// Forget all surface mappings and re-read the performance logging preference.
    pub fn reset(&self) -> Result<(), ComposeError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.registry = SessionRegistry::new();
        self.log_performance.store(
            self.prefs.bool_pref(PREF_LOG_COMPOSE_PERFORMANCE).unwrap_or(false),
            Ordering::Relaxed,
        );
        Ok(())
    }

    pub fn resolver(&self) -> &ComposeParamResolver {
        &self.resolver
    }

    pub fn default_identity(&self) -> Option<Identity> {
        self.resolver.default_identity()
    }

    pub fn determine_compose_html(&self, identity: Option<&Identity>, format: ComposeFormat) -> bool {
        self.resolver.determine_compose_html(identity, format)
    }

    pub fn log_compose_performance(&self) -> bool {
        self.log_performance.load(Ordering::Relaxed)
    }

    /// Log elapsed time since the last reset (total) and the previous stamp (delta), in seconds.
    /// No-op unless `mailnews.logComposePerformance` was on at the last reset.
    pub fn time_stamp(&self, label: &str, reset: bool) {
        if !self.log_compose_performance() {
            return;
        }
        let Ok(mut clock) = self.clock.lock() else {
            return;
        };
        let now = Instant::now();
        if reset {
            tracing::info!("[process]: [totalTime][deltaTime]");
            clock.start = now;
            clock.previous = now;
        }
        let total = now.duration_since(clock.start).as_secs_f64();
        let delta = now.duration_since(clock.previous).as_secs_f64();
        tracing::info!("[{:.2}][{:.2}] - {}", total, delta, label);
        clock.previous = now;
    }

    /// Open a compose surface for already resolved parameters. A missing identity is filled in
    /// with the default identity.
    pub fn open_compose_window_with_params(
        &self,
        chrome: Option<&str>,
        mut params: ResolvedParams,
        on_opened: OpenedCallback,
    ) {
        self.time_stamp("Start opening the window", true);
        if params.identity.is_none() {
            params.identity = self.default_identity();
        }
        self.host.open_compose_window(chrome, params, on_opened);
    }

    /// Resolve `request` and open a compose surface for it. Stored-message requests go through
    /// the draft converter first. Resolution failures are returned before any surface is opened.
    pub fn open_compose_window(
        &self,
        chrome: Option<&str>,
        request: ComposeRequest,
        window: &MessageWindow,
        on_opened: OpenedCallback,
    ) -> Result<(), ComposeError> {
        match self.resolver.resolve(request, window)? {
            Resolution::Compose(params) => {
                self.open_compose_window_with_params(chrome, params, on_opened);
                Ok(())
            }
            Resolution::Convert(draft) => self.pipeline.convert(
                draft,
                window,
                Box::new(move |outcome| {
                    on_opened(outcome.and_then(|o| match o {
                        DraftOutcome::Opened(handle) => Ok(handle),
                        DraftOutcome::Forwarded => Err(StoreError::new("converter sent the message without a compose surface")),
                    }))
                }),
            ),
        }
    }

    /// Open a compose surface for `request`, resolving to the new session's handle.
    pub fn open_compose(&self, request: ComposeRequest, window: &MessageWindow) -> ComposeFuture<SessionHandle> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let started = self.open_compose_window(
            None,
            request,
            window,
            Box::new(move |opened| {
                let _ = tx.send(opened);
            }),
        );
        if let Err(e) = started {
            return Box::pin(std::future::ready(Err(e)));
        }
        Box::pin(async move {
            match rx.await {
                Ok(Ok(handle)) => Ok(handle),
                Ok(Err(e)) => Err(ComposeError::Store(e)),
                Err(_) => Err(ComposeError::Store(StoreError::new("compose surface was never opened"))),
            }
        })
    }

    /// Open a compose surface for a `mailto:` URL.
    pub fn open_compose_with_uri(
        &self,
        chrome: Option<&str>,
        url: &str,
        identity: Option<Identity>,
        on_opened: OpenedCallback,
    ) -> Result<(), ComposeError> {
        let mut params = self.resolver.params_for_mailto(url)?;
        params.identity = identity;
        self.open_compose_window_with_params(chrome, params, on_opened);
        Ok(())
    }

    /// Create the session for a compose surface that has finished opening, and attach it to the surface.
    pub fn init_compose(&self, params: ResolvedParams, surface: Option<SurfaceId>) -> Result<SessionHandle, ComposeError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let handle = sessions.arena.insert(ComposeSession { params, surface });
        if let Some(surface) = surface {
            sessions.registry.register(surface, handle);
        }
        tracing::debug!("compose session {:?} created", handle);
        Ok(handle)
    }

    /// Destroy a session. Surface mappings that still name it stop resolving.
    pub fn close_session(&self, handle: SessionHandle) -> Result<Option<ComposeSession>, ComposeError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let closed = sessions.arena.remove(handle);
        if let Some(surface) = closed.as_ref().and_then(|s| s.surface) {
            if sessions.registry.lookup(surface, &sessions.arena).is_err() {
                sessions.registry.unregister(surface);
            }
        }
        Ok(closed)
    }

    /// Run `f` on a live session.
    pub fn with_session<R>(
        &self,
        handle: SessionHandle,
        f: impl FnOnce(&mut ComposeSession) -> R,
    ) -> Result<R, ComposeError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.arena.get_mut(handle).map(f).ok_or(ComposeError::NotFound)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.arena.len()).unwrap_or(0)
    }

    pub fn register_session(&self, surface: SurfaceId, session: SessionHandle) -> Result<(), ComposeError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.registry.register(surface, session);
        Ok(())
    }

    pub fn unregister_session(&self, surface: SurfaceId) -> Result<(), ComposeError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.registry.unregister(surface);
        Ok(())
    }

    /// Session attached to `surface`; `NotFound` when there is none or it has been closed.
    pub fn lookup_session(&self, surface: SurfaceId) -> Result<SessionHandle, ComposeError> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.registry.lookup(surface, &sessions.arena)
    }

    /// Forward `header` to `target` (filter action). Inline forwards go through the draft
    /// converter, which sends on its own; attachment forwards are sent now and the message is
    /// marked forwarded once delivery succeeds.
    pub fn start_forward(
        &self,
        header: &MessageHeader,
        target: &str,
        server: &ServerKey,
        mode: ForwardMode,
        window: &MessageWindow,
        on_done: ForwardCallback,
    ) -> Result<(), ComposeError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ComposeError::NoRecipient);
        }
        let mode = self.resolver.forward_mode(mode);
        let folder = self
            .store
            .folder_for_header(header)
            .map_err(|e| ComposeError::resolution(ResolutionTarget::Folder, e))?;
        let message_uri = folder.uri_for_message(header);
        let identity = self.resolver.identity_for_server(server)?;
        tracing::debug!("forwarding {} to {} as {:?}", message_uri, target, mode);

        if mode == ForwardMode::Inline {
            let request = DraftRequest::forward_inline(&message_uri, header.clone(), identity, target);
            return self.pipeline.convert(
                request,
                window,
                Box::new(move |outcome| on_done(outcome.map(|_| ()).map_err(ComposeError::Send))),
            );
        }

        let mut params = ResolvedParams::new(ComposeType::ForwardAsAttachment, ComposeFormat::Default);
        params.compose_html = self.resolver.determine_compose_html(Some(&identity), ComposeFormat::Default);
        params.identity = Some(identity);
        params.original_uri = Some(with_query_flag(&message_uri, FETCH_COMPLETE_MESSAGE));
        params.original_header = Some(header.clone());
        params.fields.to = target.to_string();

        let header = header.clone();
        self.host.send_now(
            params,
            window.surface,
            Box::new(move |sent| match sent {
                Ok(()) => {
                    if let Err(e) = folder.add_disposition_state(&header, DispositionState::Forwarded) {
                        tracing::warn!("could not mark {} forwarded: {}", header.message_id, e);
                    }
                    on_done(Ok(()))
                }
                Err(e) => on_done(Err(ComposeError::Send(e))),
            }),
        );
        Ok(())
    }

    pub fn forward(
        &self,
        header: &MessageHeader,
        target: &str,
        server: &ServerKey,
        mode: ForwardMode,
        window: &MessageWindow,
    ) -> ComposeFuture<()> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let on_done: ForwardCallback = Box::new(move |r| {
            let _ = tx.send(r);
        });
        if let Err(e) = self.start_forward(header, target, server, mode, window, on_done) {
            return Box::pin(std::future::ready(Err(e)));
        }
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(ComposeError::Store(StoreError::new("forward was abandoned"))))
        })
    }

    /// Reply to `header` with a stored template; see [`TemplateAutoReplyWorkflow::start`].
    pub fn start_reply_with_template(
        &self,
        header: &MessageHeader,
        template_ref: &str,
        server: &ServerKey,
        window: &MessageWindow,
        on_done: ReplyCallback,
    ) -> Result<(), ComposeError> {
        self.template_replies.start(header, template_ref, server, window, on_done)
    }

    pub fn reply_with_template(
        &self,
        header: &MessageHeader,
        template_ref: &str,
        server: &ServerKey,
        window: &MessageWindow,
    ) -> ComposeFuture<ReplyStatus> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let on_done: ReplyCallback = Box::new(move |r| {
            let _ = tx.send(r);
        });
        if let Err(e) = self.start_reply_with_template(header, template_ref, server, window, on_done) {
            return Box::pin(std::future::ready(Err(e)));
        }
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(ComposeError::Store(StoreError::new("template reply was abandoned"))))
        })
    }

    /// Handle `-compose` / `-url mailto:` in `args`. Returns the consumed command so the caller can
    /// remove its arguments; None when the arguments are not for us.
    pub fn handle_command_line(&self, args: &[String]) -> Result<Option<ComposeCommand>, ComposeError> {
        let Some(command) = parse_compose_args(args) else {
            return Ok(None);
        };
        tracing::debug!("opening compose window from command line");
        self.host.open_compose_window_with_argument(&command.argument)?;
        Ok(Some(command))
    }

    pub fn help_info(&self) -> &'static str {
        command_line::help_info()
    }
}

fn is_stale_temp_file(name: &str) -> bool {
    TEMP_FILE_PATTERNS.iter().any(|(prefix, ext)| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(ext))
            .is_some_and(|middle| middle.ends_with('.'))
    })
}

/// Remove compose temp files (`nsmail*.tmp`, `nsemail*.html`, `nscopy*.tmp`) left in `dir` by an
/// earlier run. Returns how many were removed.
pub fn cleanup_temp_files(dir: &Path) -> Result<usize, StoreError> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_stale_temp_file(name) || !entry.file_type()?.is_file() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => tracing::debug!("could not remove {}: {}", name, e),
        }
    }
    Ok(removed)
}
