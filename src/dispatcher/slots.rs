//! One optional slot per backend variant

use tracing::{debug, warn};

use crate::backend::{Backend, BackendKind};
use crate::handler::{run_external, CommandOutcome, Host};
use crate::midi::MidiEvent;

struct Slot {
    backend: Box<dyn Backend>,
    // Last validity seen by the dispatcher, so degradation is logged once
    was_valid: bool,
}

impl Slot {
    fn new(backend: Box<dyn Backend>) -> Self {
        let was_valid = backend.is_valid();
        if !was_valid {
            warn!("{} backend is not valid, it will be ignored", backend.kind());
        }
        Self { backend, was_valid }
    }
}

/// Backends owned by the dispatcher, at most one per [`BackendKind`]
///
/// Also the [`Host`] handed to handlers: sends fan out to every valid slot.
#[derive(Default)]
pub struct BackendSlots {
    jack: Option<Slot>,
    alsa: Option<Slot>,
}

impl BackendSlots {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: BackendKind) -> &Option<Slot> {
        match kind {
            BackendKind::Jack => &self.jack,
            BackendKind::Alsa => &self.alsa,
        }
    }

    fn slot_mut(&mut self, kind: BackendKind) -> &mut Option<Slot> {
        match kind {
            BackendKind::Jack => &mut self.jack,
            BackendKind::Alsa => &mut self.alsa,
        }
    }

    fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.jack.iter_mut().chain(self.alsa.iter_mut())
    }

    /// Put a backend in its slot, returning the one it replaced
    pub fn insert(&mut self, backend: Box<dyn Backend>) -> Option<Box<dyn Backend>> {
        let kind = backend.kind();
        self.slot_mut(kind)
            .replace(Slot::new(backend))
            .map(|slot| slot.backend)
    }

    pub fn get(&self, kind: BackendKind) -> Option<&dyn Backend> {
        self.slot(kind).as_ref().map(|slot| slot.backend.as_ref())
    }

    pub fn len(&self) -> usize {
        self.jack.iter().count() + self.alsa.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of backends that are currently valid
    pub fn valid_count(&self) -> usize {
        self.jack
            .iter()
            .chain(self.alsa.iter())
            .filter(|slot| slot.backend.is_valid())
            .count()
    }

    /// Log backends that lost validity since the last check
    pub fn check_validity(&mut self) {
        for slot in self.slots_mut() {
            let valid = slot.backend.is_valid();
            if slot.was_valid && !valid {
                warn!(
                    "{} backend shut down by the transport, ignoring it from now on",
                    slot.backend.kind()
                );
            }
            slot.was_valid = valid;
        }
    }

    /// Take the next event from a valid backend of the given kind
    pub fn receive_from(&mut self, kind: BackendKind) -> Option<MidiEvent> {
        let slot = self.slot_mut(kind).as_mut()?;
        if !slot.backend.is_valid() || !slot.backend.has_pending_input() {
            return None;
        }
        slot.backend.receive()
    }

    pub fn has_pending(&self, kind: BackendKind) -> bool {
        self.slot(kind)
            .as_ref()
            .is_some_and(|slot| slot.backend.is_valid() && slot.backend.has_pending_input())
    }

    /// Drop every backend, closing its transport; returns how many were open
    pub fn close_all(&mut self) -> usize {
        let closed = self.len();
        self.jack = None;
        self.alsa = None;
        closed
    }
}

impl Host for BackendSlots {
    fn send(&mut self, event: MidiEvent) {
        for slot in self.slots_mut() {
            if slot.backend.is_valid() {
                debug!("{} TX {}", slot.backend.kind(), event);
                slot.backend.send(event);
            }
        }
    }

    fn run_external(&mut self, command: &str) -> CommandOutcome {
        run_external(command)
    }
}
