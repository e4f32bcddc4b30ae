use crate::actions::{is_counter_action, SharedCount};
use deck_core::{
    ActionEvent, AppearPayload, DeviceConnectEvent, DeviceDisconnectEvent, GlobalSettingsEvent,
    KeyPayload, PropertyInspectorEvent, SendToPluginEvent, Settings, SettingsPayload, Target,
    TitlePayload,
};
use deck_plugin::{CommandSender, PluginDelegate};
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

const COUNT_KEY: &str = "count";

/// Keeps every visible counter key showing the shared count and persists the
/// count in the plugin's global settings.
pub struct CounterPlugin {
    count: SharedCount,
    visible: BTreeSet<String>,
    requested_settings: bool,
}

impl CounterPlugin {
    pub fn new(count: SharedCount) -> Self {
        Self {
            count,
            visible: BTreeSet::new(),
            requested_settings: false,
        }
    }

    pub fn count(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(String::as_str)
    }

    fn retitle_all(&self, sender: &CommandSender) {
        let title = self.count().to_string();
        for context in &self.visible {
            sender.set_title(context, Some(title.as_str()), Target::Both, None);
        }
    }

    fn persist(&self, sender: &CommandSender) {
        let mut settings = Settings::new();
        settings.insert(COUNT_KEY.to_string(), self.count().to_string());
        sender.set_global_settings(&settings);
    }
}

impl PluginDelegate for CounterPlugin {
    fn did_receive_settings(
        &mut self,
        _sender: &CommandSender,
        event: &ActionEvent<SettingsPayload>,
    ) {
        debug!(
            event = "counter_settings",
            context = %event.context,
            keys = event.payload.settings.len()
        );
    }

    fn did_receive_global_settings(&mut self, sender: &CommandSender, event: &GlobalSettingsEvent) {
        let Some(raw) = event.payload.settings.get(COUNT_KEY) else {
            debug!(event = "counter_global_settings_empty");
            return;
        };
        match raw.parse::<i64>() {
            Ok(value) => {
                self.count.store(value, Ordering::SeqCst);
                info!(event = "counter_restored", value);
                self.retitle_all(sender);
            }
            Err(err) => warn!(event = "counter_global_settings_invalid", raw = %raw, error = %err),
        }
    }

    fn key_down(&mut self, sender: &CommandSender, event: &ActionEvent<KeyPayload>) {
        if !is_counter_action(&event.action) {
            return;
        }
        self.retitle_all(sender);
        self.persist(sender);
    }

    fn key_up(&mut self, _sender: &CommandSender, _event: &ActionEvent<KeyPayload>) {}

    fn will_appear(&mut self, sender: &CommandSender, event: &ActionEvent<AppearPayload>) {
        if !is_counter_action(&event.action) {
            return;
        }
        self.visible.insert(event.context.clone());
        if !self.requested_settings {
            self.requested_settings = true;
            sender.get_global_settings();
        }
        let title = self.count().to_string();
        sender.set_title(&event.context, Some(title.as_str()), Target::Both, None);
    }

    fn will_disappear(&mut self, _sender: &CommandSender, event: &ActionEvent<AppearPayload>) {
        self.visible.remove(&event.context);
        debug!(
            event = "counter_key_hidden",
            context = %event.context,
            remaining = self.visible().count()
        );
    }

    fn title_parameters_did_change(
        &mut self,
        _sender: &CommandSender,
        event: &ActionEvent<TitlePayload>,
    ) {
        debug!(
            event = "counter_title_parameters",
            context = %event.context,
            title = %event.payload.title
        );
    }

    fn device_did_connect(&mut self, _sender: &CommandSender, event: &DeviceConnectEvent) {
        info!(
            event = "counter_device_connected",
            device = %event.device,
            name = %event.device_info.name,
            kind = ?event.device_info.device_type()
        );
    }

    fn device_did_disconnect(&mut self, _sender: &CommandSender, event: &DeviceDisconnectEvent) {
        info!(event = "counter_device_disconnected", device = %event.device);
    }

    fn application_did_launch(&mut self, _sender: &CommandSender, application: &str) {
        debug!(event = "counter_application_launched", application = %application);
    }

    fn application_did_terminate(&mut self, _sender: &CommandSender, application: &str) {
        debug!(event = "counter_application_terminated", application = %application);
    }

    fn system_did_wake_up(&mut self, sender: &CommandSender) {
        sender.get_global_settings();
    }

    fn property_inspector_did_appear(
        &mut self,
        _sender: &CommandSender,
        _event: &PropertyInspectorEvent,
    ) {
    }

    fn property_inspector_did_disappear(
        &mut self,
        _sender: &CommandSender,
        _event: &PropertyInspectorEvent,
    ) {
    }

    fn sent_to_plugin(&mut self, _sender: &CommandSender, event: &SendToPluginEvent) {
        debug!(
            event = "counter_sent_to_plugin",
            context = %event.context,
            keys = event.payload.len()
        );
    }
}
