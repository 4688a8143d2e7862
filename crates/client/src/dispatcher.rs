//! Event-Dispatcher – Ordnet Eventnamen registrierte Handler zu
//!
//! Eventnamen werden beim Registrieren in Kleinschreibung normalisiert.
//! Handler fuer dasselbe Event werden in Registrierungsreihenfolge
//! aufgerufen. Die internen Zustands-Handler der Session laufen immer vor
//! allen hier registrierten Handlern.

use std::collections::HashMap;
use std::sync::Arc;

use teamtalk_protocol::Params;

use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Ein externer Event-Handler
pub type Handler = Arc<dyn Fn(&Session, &Params) + Send + Sync>;

/// Kennung einer Registrierung (fuer `unsubscribe`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Abonnement-Tabelle: Event → Handler in Registrierungsreihenfolge
#[derive(Default)]
pub struct EventDispatcher {
    abos: HashMap<String, Vec<(HandlerId, Handler)>>,
    naechste_id: u64,
}

impl EventDispatcher {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert einen Handler fuer ein Event
    pub fn subscribe<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Session, &Params) + Send + Sync + 'static,
    {
        self.naechste_id += 1;
        let id = HandlerId(self.naechste_id);
        self.abos
            .entry(event.to_lowercase())
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::trace!(event, handler = id.0, "Handler registriert");
        id
    }

    /// Entfernt einen Handler
    ///
    /// Gibt `NichtGefunden` zurueck wenn der Handler fuer dieses Event nie
    /// registriert war.
    pub fn unsubscribe(&mut self, event: &str, id: HandlerId) -> ClientResult<()> {
        let event = event.to_lowercase();
        let handler = self
            .abos
            .get_mut(&event)
            .ok_or_else(|| ClientError::NichtGefunden(format!("keine Handler fuer '{event}'")))?;
        let position = handler
            .iter()
            .position(|(h, _)| *h == id)
            .ok_or_else(|| {
                ClientError::NichtGefunden(format!(
                    "Handler {} nicht fuer '{event}' registriert",
                    id.0
                ))
            })?;
        handler.remove(position);
        if handler.is_empty() {
            self.abos.remove(&event);
        }
        Ok(())
    }

    /// Handler fuer ein bereits normalisiertes Event
    pub(crate) fn handler_fuer(&self, event: &str) -> &[(HandlerId, Handler)] {
        self.abos.get(event).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn anzahl(&self, event: &str) -> usize {
        self.handler_fuer(&event.to_lowercase()).len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<_> = self.abos.iter().map(|(e, h)| (e.as_str(), h.len())).collect();
        events.sort_unstable();
        f.debug_struct("EventDispatcher").field("abos", &events).finish()
    }
}
