/*
 * host.rs
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

//! Compose host: opens compose surfaces and runs compose-and-deliver without a surface.
//! Completion is reported asynchronously; the host never blocks the caller.

use crate::compose::{ResolvedParams, SessionHandle, SurfaceId};
use crate::store::error::StoreError;

/// Called once the compose surface exists and its session has been created.
pub type OpenedCallback = Box<dyn FnOnce(Result<SessionHandle, StoreError>) + Send>;

/// Called once delivery finished (success or error).
pub type SentCallback = Box<dyn FnOnce(Result<(), StoreError>) + Send>;

/// Window system and delivery, as seen by the compose pipeline.
pub trait ComposeHost: Send + Sync {
    /// Open a compose surface for `params`. `chrome` selects a non-default window layout.
    fn open_compose_window(&self, chrome: Option<&str>, params: ResolvedParams, on_opened: OpenedCallback);

    /// Open a compose surface seeded with a raw command-line compose argument.
    fn open_compose_window_with_argument(&self, argument: &str) -> Result<(), StoreError>;

    /// Build the message from `params` and deliver it now (no surface).
    /// `parent` is the surface the action was triggered from, if any.
    fn send_now(&self, params: ResolvedParams, parent: Option<SurfaceId>, on_sent: SentCallback);
}
