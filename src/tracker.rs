use crate::detect::AvailabilityState;

/// What a notifier is asked to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Success,
    Error(Option<String>),
}

/// Remembers the last observed availability and turns changes into
/// notifications.
///
/// Only the kind of state matters: two consecutive `Unavailable` states
/// with different reasons do not notify twice.
#[derive(Debug, Default)]
pub struct StateTracker {
    last_status: AvailabilityState,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> &AvailabilityState {
        &self.last_status
    }

    /// Records `new_state` and returns the event to announce, if its kind
    /// differs from the previous one.
    ///
    /// `Unknown` is only the starting point: observing it changes nothing.
    pub fn observe(&mut self, new_state: AvailabilityState) -> Option<NotificationEvent> {
        if new_state == AvailabilityState::Unknown {
            return None;
        }
        if new_state.same_kind(&self.last_status) {
            self.last_status = new_state;
            return None;
        }

        let event = match &new_state {
            AvailabilityState::Unavailable(reason) => NotificationEvent::Error(Some(reason.clone())),
            AvailabilityState::Available | AvailabilityState::Unknown => NotificationEvent::Success,
        };
        self.last_status = new_state;
        Some(event)
    }
}
