//! Table of pending cross-origin calls.
//!
//! # Design
//! Each pending call occupies a slot in an arena and is addressed by a
//! `CallbackToken` (slot index plus generation). A slot's generation is bumped
//! when it is vacated, so a token held by a stale timer or a late script can
//! never reach the call that reuses the slot.
//!
//! Entry-point names must be unique among pending calls: a remote script
//! only knows the name it was told to call, so two pending calls sharing a
//! name could not be told apart.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{ConfigError, DeliveryError};
use crate::shape::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackToken {
    index: u32,
    generation: u32,
}

impl fmt::Display for CallbackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Receives the payload for one pending call.
pub type PayloadHandler = Box<dyn FnOnce(Payload)>;

struct Entry {
    name: String,
    handler: PayloadHandler,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

#[derive(Default)]
struct Table {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Table {
    fn find(&self, name: &str) -> Option<CallbackToken> {
        self.slots.iter().enumerate().find_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .filter(|entry| entry.name == name)
                .map(|_| CallbackToken {
                    index: index as u32,
                    generation: slot.generation,
                })
        })
    }

    fn take(&mut self, token: CallbackToken) -> Option<Entry> {
        let slot = self.slots.get_mut(token.index as usize)?;
        if slot.generation != token.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(token.index);
        Some(entry)
    }
}

/// Shared handle to the pending-call table. Clones refer to the same table.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    table: Rc<RefCell<Table>>,
}

impl CallbackRegistry {
    /// Register `handler` under `name`. Fails if `name` is already pending.
    pub fn register(
        &self,
        name: &str,
        handler: PayloadHandler,
    ) -> Result<CallbackToken, ConfigError> {
        let mut table = self.table.borrow_mut();
        if table.find(name).is_some() {
            return Err(ConfigError::CallbackInUse(name.to_string()));
        }

        let index = match table.free.pop() {
            Some(index) => index,
            None => {
                table.slots.push(Slot::default());
                (table.slots.len() - 1) as u32
            }
        };
        let slot = &mut table.slots[index as usize];
        slot.entry = Some(Entry {
            name: name.to_string(),
            handler,
        });
        let token = CallbackToken {
            index,
            generation: slot.generation,
        };
        debug!(%token, name, "registered callback entry point");
        Ok(token)
    }

    /// Deliver `payload` to the call pending on entry point `name`.
    pub fn invoke(&self, name: &str, payload: Payload) -> Result<(), DeliveryError> {
        let token = self.table.borrow().find(name);
        let Some(token) = token else {
            warn!(name, "callback invoked with no pending request");
            return Err(DeliveryError::NoPendingCall(name.to_string()));
        };
        self.resolve(token, payload)
    }

    /// Deliver `payload` to the call identified by `token`.
    pub fn resolve(&self, token: CallbackToken, payload: Payload) -> Result<(), DeliveryError> {
        // The handler runs with the table unborrowed so it can unregister
        // itself or start another call.
        let entry = self.table.borrow_mut().take(token);
        match entry {
            Some(entry) => {
                debug!(%token, name = %entry.name, "delivering payload");
                (entry.handler)(payload);
                Ok(())
            }
            None => {
                warn!(%token, "payload for unknown or expired token");
                Err(DeliveryError::UnknownToken(token))
            }
        }
    }

    /// Drop the pending call behind `token` without running it. Returns
    /// whether anything was removed.
    pub fn remove(&self, token: CallbackToken) -> bool {
        let entry = self.table.borrow_mut().take(token);
        entry.is_some()
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.table.borrow().find(name).is_some()
    }

    pub fn len(&self) -> usize {
        let table = self.table.borrow();
        table.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
