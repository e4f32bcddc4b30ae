use crate::sender::CommandSender;
use deck_core::{
    ActionEvent, AppearPayload, DeviceConnectEvent, DeviceDisconnectEvent, GlobalSettingsEvent,
    KeyPayload, PropertyInspectorEvent, SendToPluginEvent, SettingsPayload, TitlePayload,
};

/// Plugin-wide observer. Sees every decoded event after the addressed
/// instance (if any) has handled it, including events for contexts the
/// registry does not know.
pub trait PluginDelegate: Send {
    fn did_receive_settings(
        &mut self,
        sender: &CommandSender,
        event: &ActionEvent<SettingsPayload>,
    );

    fn did_receive_global_settings(&mut self, sender: &CommandSender, event: &GlobalSettingsEvent);

    fn key_down(&mut self, sender: &CommandSender, event: &ActionEvent<KeyPayload>);

    fn key_up(&mut self, sender: &CommandSender, event: &ActionEvent<KeyPayload>);

    fn will_appear(&mut self, sender: &CommandSender, event: &ActionEvent<AppearPayload>);

    fn will_disappear(&mut self, sender: &CommandSender, event: &ActionEvent<AppearPayload>);

    fn title_parameters_did_change(
        &mut self,
        sender: &CommandSender,
        event: &ActionEvent<TitlePayload>,
    );

    fn device_did_connect(&mut self, sender: &CommandSender, event: &DeviceConnectEvent);

    fn device_did_disconnect(&mut self, sender: &CommandSender, event: &DeviceDisconnectEvent);

    fn application_did_launch(&mut self, sender: &CommandSender, application: &str);

    fn application_did_terminate(&mut self, sender: &CommandSender, application: &str);

    fn system_did_wake_up(&mut self, sender: &CommandSender);

    fn property_inspector_did_appear(
        &mut self,
        sender: &CommandSender,
        event: &PropertyInspectorEvent,
    );

    fn property_inspector_did_disappear(
        &mut self,
        sender: &CommandSender,
        event: &PropertyInspectorEvent,
    );

    fn sent_to_plugin(&mut self, sender: &CommandSender, event: &SendToPluginEvent);
}
