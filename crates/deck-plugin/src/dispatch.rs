use crate::action::{Action, ActionCatalog};
use crate::delegate::PluginDelegate;
use crate::registry::InstanceRegistry;
use crate::sender::CommandSender;
use deck_core::{DeckError, EventKind, InboundEvent};
use tracing::{debug, warn};

/// What happened on the instance side of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceDispatch {
    Delivered,
    /// The envelope named a context with no live instance.
    Skipped(DeckError),
    /// Plugin-wide event; no instance is addressed.
    NotAddressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub kind: EventKind,
    pub instance: InstanceDispatch,
}

/// Routes decoded events to the registry and the delegate. Owned by the
/// receive loop, so nothing here is shared across tasks.
pub struct Dispatcher<D> {
    registry: InstanceRegistry,
    delegate: D,
    sender: CommandSender,
}

impl<D: PluginDelegate> Dispatcher<D> {
    pub fn new(delegate: D, catalog: ActionCatalog, sender: CommandSender) -> Self {
        Self {
            registry: InstanceRegistry::new(catalog),
            delegate,
            sender,
        }
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn sender(&self) -> &CommandSender {
        &self.sender
    }

    pub fn into_delegate(self) -> D {
        self.delegate
    }

    /// Decodes and dispatches one text frame. A frame that does not decode
    /// is logged and discarded without touching any handler.
    pub fn dispatch_text(&mut self, text: &str) -> Result<DispatchReport, DeckError> {
        match InboundEvent::decode(text) {
            Ok(event) => Ok(self.dispatch(&event)),
            Err(err) => {
                warn!(event = "deck_malformed_envelope", error = %err, bytes = text.len());
                Err(err)
            }
        }
    }

    /// Registers on appear, then the instance callback, then the delegate,
    /// then removal on disappear.
    pub fn dispatch(&mut self, event: &InboundEvent) -> DispatchReport {
        let kind = event.kind();
        debug!(event = "deck_event_received", kind = %kind, context = ?event.context());

        if let InboundEvent::WillAppear(appear) = event {
            // failures are logged by the registry; delivery below reports the miss
            let _ = self.registry.register(
                &appear.context,
                &appear.action,
                &appear.device,
                appear.payload.coordinates,
            );
        }

        let instance = self.deliver_to_instance(event);
        self.notify_delegate(event);

        if let InboundEvent::WillDisappear(disappear) = event {
            self.registry.remove(&disappear.context);
        }

        DispatchReport { kind, instance }
    }

    fn deliver_to_instance(&mut self, event: &InboundEvent) -> InstanceDispatch {
        let Some(context) = event.context() else {
            return InstanceDispatch::NotAddressed;
        };
        let Some(instance) = self.registry.get_mut(context) else {
            let err = DeckError::UnknownTargetInstance {
                context: context.to_string(),
            };
            warn!(event = "deck_unknown_target", kind = %event.kind(), error = %err);
            return InstanceDispatch::Skipped(err);
        };
        let handler: &mut dyn Action = instance.handler_mut();
        let sender = &self.sender;
        match event {
            InboundEvent::WillAppear(e) => handler.will_appear(sender, &e.device, &e.payload),
            InboundEvent::WillDisappear(e) => handler.will_disappear(sender, &e.device, &e.payload),
            InboundEvent::KeyDown(e) => handler.key_down(sender, &e.device, &e.payload),
            InboundEvent::KeyUp(e) => handler.key_up(sender, &e.device, &e.payload),
            InboundEvent::DidReceiveSettings(e) => {
                handler.did_receive_settings(sender, &e.device, &e.payload)
            }
            InboundEvent::TitleParametersDidChange(e) => {
                handler.title_parameters_did_change(sender, &e.device, &e.payload)
            }
            InboundEvent::PropertyInspectorDidAppear(e) => {
                handler.property_inspector_did_appear(sender, e.device.as_deref())
            }
            InboundEvent::PropertyInspectorDidDisappear(e) => {
                handler.property_inspector_did_disappear(sender, e.device.as_deref())
            }
            InboundEvent::SendToPlugin(e) => handler.sent_to_plugin(sender, &e.payload),
            InboundEvent::DidReceiveGlobalSettings(_)
            | InboundEvent::DeviceDidConnect(_)
            | InboundEvent::DeviceDidDisconnect(_)
            | InboundEvent::ApplicationDidLaunch(_)
            | InboundEvent::ApplicationDidTerminate(_)
            | InboundEvent::SystemDidWakeUp => return InstanceDispatch::NotAddressed,
        }
        InstanceDispatch::Delivered
    }

    fn notify_delegate(&mut self, event: &InboundEvent) {
        let delegate = &mut self.delegate;
        let sender = &self.sender;
        match event {
            InboundEvent::DidReceiveSettings(e) => delegate.did_receive_settings(sender, e),
            InboundEvent::DidReceiveGlobalSettings(e) => {
                delegate.did_receive_global_settings(sender, e)
            }
            InboundEvent::KeyDown(e) => delegate.key_down(sender, e),
            InboundEvent::KeyUp(e) => delegate.key_up(sender, e),
            InboundEvent::WillAppear(e) => delegate.will_appear(sender, e),
            InboundEvent::WillDisappear(e) => delegate.will_disappear(sender, e),
            InboundEvent::TitleParametersDidChange(e) => {
                delegate.title_parameters_did_change(sender, e)
            }
            InboundEvent::DeviceDidConnect(e) => delegate.device_did_connect(sender, e),
            InboundEvent::DeviceDidDisconnect(e) => delegate.device_did_disconnect(sender, e),
            InboundEvent::ApplicationDidLaunch(e) => {
                delegate.application_did_launch(sender, &e.payload.application)
            }
            InboundEvent::ApplicationDidTerminate(e) => {
                delegate.application_did_terminate(sender, &e.payload.application)
            }
            InboundEvent::SystemDidWakeUp => delegate.system_did_wake_up(sender),
            InboundEvent::PropertyInspectorDidAppear(e) => {
                delegate.property_inspector_did_appear(sender, e)
            }
            InboundEvent::PropertyInspectorDidDisappear(e) => {
                delegate.property_inspector_did_disappear(sender, e)
            }
            InboundEvent::SendToPlugin(e) => delegate.sent_to_plugin(sender, e),
        }
    }
}
