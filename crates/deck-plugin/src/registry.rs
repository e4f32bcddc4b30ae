use crate::action::{Action, ActionCatalog};
use deck_core::{Coordinates, DeckError};
use std::collections::HashMap;
use tracing::{info, warn};

/// One live key, created on `willAppear` and dropped after `willDisappear`.
pub struct Instance {
    context: String,
    action: String,
    device: String,
    coordinates: Option<Coordinates>,
    handler: Box<dyn Action>,
}

impl Instance {
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn handler_mut(&mut self) -> &mut dyn Action {
        self.handler.as_mut()
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("context", &self.context)
            .field("action", &self.action)
            .field("device", &self.device)
            .field("coordinates", &self.coordinates)
            .finish_non_exhaustive()
    }
}

/// Context-keyed map of live instances.
#[derive(Debug)]
pub struct InstanceRegistry {
    catalog: ActionCatalog,
    instances: HashMap<String, Instance>,
}

impl InstanceRegistry {
    pub fn new(catalog: ActionCatalog) -> Self {
        Self {
            catalog,
            instances: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    /// Creates a handler for `context` unless one is already live. A duplicate
    /// leaves the existing instance, and whatever state it holds, untouched.
    pub fn register(
        &mut self,
        context: &str,
        action: &str,
        device: &str,
        coordinates: Option<Coordinates>,
    ) -> Result<(), DeckError> {
        if self.instances.contains_key(context) {
            warn!(
                event = "deck_duplicate_registration",
                context = %context,
                action = %action
            );
            return Err(DeckError::DuplicateRegistration {
                context: context.to_string(),
            });
        }
        let Some(descriptor) = self.catalog.find(action) else {
            warn!(event = "deck_unknown_action", context = %context, action = %action);
            return Err(DeckError::UnknownAction {
                uuid: action.to_string(),
            });
        };
        let handler = descriptor.construct(context.to_string(), coordinates);
        self.instances.insert(
            context.to_string(),
            Instance {
                context: context.to_string(),
                action: action.to_string(),
                device: device.to_string(),
                coordinates,
                handler,
            },
        );
        info!(
            event = "deck_instance_registered",
            context = %context,
            action = %action,
            device = %device,
            live = self.instances.len()
        );
        Ok(())
    }

    /// Removing an unknown context is a no-op.
    pub fn remove(&mut self, context: &str) -> Option<Instance> {
        let removed = self.instances.remove(context);
        if let Some(instance) = &removed {
            info!(
                event = "deck_instance_removed",
                context = %context,
                action = %instance.action,
                live = self.instances.len()
            );
        }
        removed
    }

    pub fn get(&self, context: &str) -> Option<&Instance> {
        self.instances.get(context)
    }

    pub fn get_mut(&mut self, context: &str) -> Option<&mut Instance> {
        self.instances.get_mut(context)
    }

    pub fn contains(&self, context: &str) -> bool {
        self.instances.contains_key(context)
    }

    pub fn by_action(&self, uuid: &str) -> Vec<&Instance> {
        self.instances
            .values()
            .filter(|instance| instance.action == uuid)
            .collect()
    }

    pub fn at(&self, coordinates: Coordinates) -> Vec<&Instance> {
        self.instances
            .values()
            .filter(|instance| instance.coordinates == Some(coordinates))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
