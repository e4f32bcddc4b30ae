//! Wire types for the Stream Deck plugin protocol: inbound events, outbound
//! commands, the controller info blob and the shared error taxonomy.

pub mod command;
pub mod error;
pub mod events;
pub mod info;

pub use command::{Command, CommandKind, Registration, Target};
pub use error::DeckError;
pub use events::{
    ActionEvent, AppearPayload, ApplicationEvent, Coordinates, DeviceConnectEvent,
    DeviceDisconnectEvent, EventKind, GlobalSettingsEvent, InboundEvent, KeyPayload,
    PropertyInspectorEvent, SendToPluginEvent, Settings, SettingsPayload, TitleAlignment,
    TitleParameters, TitlePayload,
};
pub use info::{ControllerInfo, DeviceInfo, DeviceSize, DeviceType, RegisteredDevice};
