/*
 * registry.rs
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

//! Compose session arena and the surface → session registry.
//!
//! Sessions live in a generational arena. A `SessionHandle` names a slot and the generation it
//! was issued for; removing a session bumps the slot generation, so any handle still held by the
//! registry (or anyone else) stops resolving. The registry owns neither surfaces nor sessions.

use std::collections::HashMap;

use crate::compose::error::ComposeError;

/// Opaque identifier of a hosting surface (window) supplied by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Stable identifier of a compose session in a [`SessionArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    index: u32,
    generation: u32,
}

impl SessionHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational arena of live sessions. Freed slots are reused with a new generation.
#[derive(Debug)]
pub struct SessionArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for SessionArena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> SessionArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> SessionHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return SessionHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SessionHandle { index, generation: 0 }
    }

    /// Remove the session named by `handle`. Stale handles return None and change nothing.
    pub fn remove(&mut self, handle: SessionHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Some(value)
    }

    pub fn get(&self, handle: SessionHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: SessionHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn is_live(&self, handle: SessionHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

/// Maps hosting surfaces to the compose session attached to them.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    map: HashMap<SurfaceId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `session` to `surface`, replacing any previous mapping. Returns the previous handle.
    pub fn register(&mut self, surface: SurfaceId, session: SessionHandle) -> Option<SessionHandle> {
        self.map.insert(surface, session)
    }

    /// Detach whatever session is attached to `surface`. No-op when nothing is.
    pub fn unregister(&mut self, surface: SurfaceId) {
        self.map.remove(&surface);
    }

    /// Session attached to `surface`, checked for liveness against `arena`.
    /// An unknown surface and a session that has since been destroyed are both `NotFound`.
    pub fn lookup<T>(&self, surface: SurfaceId, arena: &SessionArena<T>) -> Result<SessionHandle, ComposeError> {
        match self.map.get(&surface) {
            Some(handle) if arena.is_live(*handle) => Ok(*handle),
            Some(_) => {
                tracing::debug!(surface = surface.0, "session for surface has expired");
                Err(ComposeError::NotFound)
            }
            None => Err(ComposeError::NotFound),
        }
    }

    /// Drop mappings whose session no longer exists. Returns how many were dropped.
    pub fn prune<T>(&mut self, arena: &SessionArena<T>) -> usize {
        let before = self.map.len();
        self.map.retain(|_, handle| arena.is_live(*handle));
        before - self.map.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
