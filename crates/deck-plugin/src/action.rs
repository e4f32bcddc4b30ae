use crate::sender::CommandSender;
use deck_core::{
    AppearPayload, Coordinates, KeyPayload, SettingsPayload, TitleAlignment, TitlePayload,
};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Per-instance handler for one key. Every callback defaults to a no-op so a
/// concrete action only overrides what it reacts to.
pub trait Action: Send {
    fn will_appear(&mut self, _sender: &CommandSender, _device: &str, _payload: &AppearPayload) {}

    fn will_disappear(
        &mut self,
        _sender: &CommandSender,
        _device: &str,
        _payload: &AppearPayload,
    ) {
    }

    fn key_down(&mut self, _sender: &CommandSender, _device: &str, _payload: &KeyPayload) {}

    fn key_up(&mut self, _sender: &CommandSender, _device: &str, _payload: &KeyPayload) {}

    fn did_receive_settings(
        &mut self,
        _sender: &CommandSender,
        _device: &str,
        _payload: &SettingsPayload,
    ) {
    }

    fn title_parameters_did_change(
        &mut self,
        _sender: &CommandSender,
        _device: &str,
        _payload: &TitlePayload,
    ) {
    }

    fn property_inspector_did_appear(&mut self, _sender: &CommandSender, _device: Option<&str>) {}

    fn property_inspector_did_disappear(&mut self, _sender: &CommandSender, _device: Option<&str>) {
    }

    fn sent_to_plugin(&mut self, _sender: &CommandSender, _payload: &Map<String, Value>) {}
}

/// A concrete action type the runtime can instantiate on `willAppear`.
pub trait ActionType: Action + Sized + 'static {
    /// Stable identifier matching the `action` field the controller sends.
    const UUID: &'static str;

    fn metadata() -> ActionMetadata;

    fn new(context: String, coordinates: Option<Coordinates>) -> Self;
}

/// Static display data for an action type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionMetadata {
    pub name: String,
    pub icon: String,
    pub states: Vec<ActionState>,
    pub tooltip: Option<String>,
    pub property_inspector_path: Option<String>,
    pub supported_in_multi_actions: Option<bool>,
    pub visible_in_actions_list: Option<bool>,
}

impl ActionMetadata {
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: icon.into(),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: ActionState) -> Self {
        self.states.push(state);
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    pub image: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub title_alignment: Option<TitleAlignment>,
}

impl ActionState {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: None,
            title: None,
            title_alignment: None,
        }
    }

    pub fn aligned(mut self, alignment: TitleAlignment) -> Self {
        self.title_alignment = Some(alignment);
        self
    }
}

type Factory = Arc<dyn Fn(String, Option<Coordinates>) -> Box<dyn Action> + Send + Sync>;

/// Type-erased constructor plus metadata for one action type.
#[derive(Clone)]
pub struct ActionDescriptor {
    uuid: String,
    metadata: ActionMetadata,
    factory: Factory,
}

impl ActionDescriptor {
    pub fn new<F>(uuid: impl Into<String>, metadata: ActionMetadata, factory: F) -> Self
    where
        F: Fn(String, Option<Coordinates>) -> Box<dyn Action> + Send + Sync + 'static,
    {
        Self {
            uuid: uuid.into(),
            metadata,
            factory: Arc::new(factory),
        }
    }

    pub fn of<T: ActionType>() -> Self {
        Self::new(T::UUID, T::metadata(), construct::<T>)
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn metadata(&self) -> &ActionMetadata {
        &self.metadata
    }

    pub fn construct(&self, context: String, coordinates: Option<Coordinates>) -> Box<dyn Action> {
        (self.factory)(context, coordinates)
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("uuid", &self.uuid)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

fn construct<T: ActionType>(context: String, coordinates: Option<Coordinates>) -> Box<dyn Action> {
    Box::new(T::new(context, coordinates))
}

/// The action types a plugin offers, handed to the runtime at startup.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    descriptors: Vec<ActionDescriptor>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: ActionType>(self) -> Self {
        self.with_descriptor(ActionDescriptor::of::<T>())
    }

    /// Adds `descriptor`, replacing any earlier one with the same uuid.
    pub fn with_descriptor(mut self, descriptor: ActionDescriptor) -> Self {
        self.descriptors
            .retain(|existing| existing.uuid != descriptor.uuid);
        self.descriptors.push(descriptor);
        self
    }

    pub fn find(&self, uuid: &str) -> Option<&ActionDescriptor> {
        self.descriptors.iter().find(|descriptor| descriptor.uuid == uuid)
    }

    pub fn uuids(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|descriptor| descriptor.uuid.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent {
        context: String,
    }

    impl Action for Silent {}

    impl ActionType for Silent {
        const UUID: &'static str = "com.example.silent";

        fn metadata() -> ActionMetadata {
            let state = ActionState::new("Icons/silent-default").aligned(TitleAlignment::Middle);
            ActionMetadata::new("Silent", "Icons/silent").with_state(state)
        }

        fn new(context: String, _coordinates: Option<Coordinates>) -> Self {
            Self { context }
        }
    }

    #[test]
    fn catalog_finds_static_types_by_uuid() {
        let catalog = ActionCatalog::new().with::<Silent>();
        let descriptor = catalog.find("com.example.silent").expect("registered");
        assert_eq!(descriptor.metadata().name, "Silent");
        assert_eq!(
            descriptor.metadata().states[0].title_alignment,
            Some(TitleAlignment::Middle)
        );
        assert!(catalog.find("com.example.SILENT").is_none());
        let _instance = descriptor.construct("ctx".to_string(), None);
        assert_eq!(Silent::new("ctx".to_string(), None).context, "ctx");
    }

    #[test]
    fn later_descriptor_replaces_same_uuid() {
        let catalog = ActionCatalog::new().with::<Silent>().with_descriptor(ActionDescriptor::new(
            Silent::UUID,
            ActionMetadata::new("Loud", "Icons/loud"),
            |context, coordinates| Box::new(Silent::new(context, coordinates)),
        ));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find(Silent::UUID).expect("present").metadata().name, "Loud");
        assert_eq!(catalog.uuids().collect::<Vec<_>>(), vec![Silent::UUID]);
    }
}
