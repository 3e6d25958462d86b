use std::sync::Arc;

use super::controller::{FieldKey, FormController, FormResult, read_lock, write_lock};
use super::surface::FormSurface;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationEvent {
    Validate { field: FieldKey },
    Invalid {
        field: FieldKey,
        errors: Vec<String>,
    },
    Valid {
        field: FieldKey,
        previous: Vec<String>,
    },
    Validated { field: FieldKey },
}

impl ValidationEvent {
    pub fn field(&self) -> &FieldKey {
        match self {
            ValidationEvent::Validate { field }
            | ValidationEvent::Invalid { field, .. }
            | ValidationEvent::Valid { field, .. }
            | ValidationEvent::Validated { field } => field,
        }
    }

    pub const fn is_cancelable(&self) -> bool {
        matches!(self, ValidationEvent::Validate { .. })
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EventControl {
    #[default]
    Continue,
    Cancel,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ListenerId(pub u64);

pub(super) type Listener = Arc<dyn Fn(&ValidationEvent) -> EventControl + Send + Sync>;

#[derive(Default)]
pub(super) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub(super) fn insert(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(super) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<S> FormController<S>
where
    S: FormSurface,
{
    pub fn on<F>(&self, listener: F) -> FormResult<ListenerId>
    where
        F: Fn(&ValidationEvent) -> EventControl + Send + Sync + 'static,
    {
        drop(self.attached_state("registering listener")?);
        let mut listeners = write_lock(&self.listeners, "registering listener")?;
        Ok(listeners.insert(Arc::new(listener)))
    }

    pub fn off(&self, id: ListenerId) -> FormResult<bool> {
        drop(self.attached_state("removing listener")?);
        let mut listeners = write_lock(&self.listeners, "removing listener")?;
        Ok(listeners.remove(id))
    }

    pub(super) fn emit(&self, event: ValidationEvent) -> FormResult<EventControl> {
        let listeners = read_lock(&self.listeners, "emitting validation event")?
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect::<Vec<_>>();

        let mut control = EventControl::Continue;
        for listener in listeners {
            if listener(&event) == EventControl::Cancel && event.is_cancelable() {
                control = EventControl::Cancel;
            }
        }
        Ok(control)
    }
}
