use deck_core::{Coordinates, KeyPayload, TitleAlignment};
use deck_plugin::{
    Action, ActionCatalog, ActionDescriptor, ActionMetadata, ActionState, CommandSender,
};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub const INCREMENT_UUID: &str = "counter.increment";
pub const DECREMENT_UUID: &str = "counter.decrement";

/// Plugin-wide count shared by every key and the delegate.
pub type SharedCount = Arc<AtomicI64>;

/// One counter key. Increment and decrement differ only in `step`.
pub struct CounterKey {
    context: String,
    coordinates: Option<Coordinates>,
    step: i64,
    count: SharedCount,
}

impl CounterKey {
    pub fn new(
        context: String,
        coordinates: Option<Coordinates>,
        step: i64,
        count: SharedCount,
    ) -> Self {
        Self {
            context,
            coordinates,
            step,
            count,
        }
    }
}

impl Action for CounterKey {
    fn key_down(&mut self, _sender: &CommandSender, device: &str, payload: &KeyPayload) {
        let value = self.count.fetch_add(self.step, Ordering::SeqCst) + self.step;
        let coordinates = self.coordinates.or(payload.coordinates);
        debug!(
            event = "counter_key_down",
            context = %self.context,
            device = %device,
            coordinates = ?coordinates,
            step = self.step,
            value
        );
    }
}

fn metadata(name: &str, tooltip: &str) -> ActionMetadata {
    ActionMetadata::new(name, "Icons/actionIcon")
        .with_state(ActionState::new("Icons/actionDefaultImage").aligned(TitleAlignment::Middle))
        .with_tooltip(tooltip)
}

fn descriptor(uuid: &str, name: &str, step: i64, count: &SharedCount) -> ActionDescriptor {
    let tooltip = if step < 0 {
        "Subtract one from the shared count"
    } else {
        "Add one to the shared count"
    };
    let count = count.clone();
    let build = move |context: String, coordinates: Option<Coordinates>| -> Box<dyn Action> {
        Box::new(CounterKey::new(context, coordinates, step, count.clone()))
    };
    ActionDescriptor::new(uuid, metadata(name, tooltip), build)
}

pub fn is_counter_action(uuid: &str) -> bool {
    uuid == INCREMENT_UUID || uuid == DECREMENT_UUID
}

pub fn catalog(count: &SharedCount) -> ActionCatalog {
    ActionCatalog::new()
        .with_descriptor(descriptor(INCREMENT_UUID, "Increment", 1, count))
        .with_descriptor(descriptor(DECREMENT_UUID, "Decrement", -1, count))
}
