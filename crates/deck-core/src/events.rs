use crate::error::DeckError;
use crate::info::DeviceInfo;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Persistent per-instance (or plugin-wide) settings, opaque to the runtime.
pub type Settings = HashMap<String, String>;

/// Position of a key on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub column: u32,
    pub row: u32,
}

impl Coordinates {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    DidReceiveSettings,
    DidReceiveGlobalSettings,
    KeyDown,
    KeyUp,
    WillAppear,
    WillDisappear,
    TitleParametersDidChange,
    DeviceDidConnect,
    DeviceDidDisconnect,
    ApplicationDidLaunch,
    ApplicationDidTerminate,
    SystemDidWakeUp,
    PropertyInspectorDidAppear,
    PropertyInspectorDidDisappear,
    SendToPlugin,
}

impl EventKind {
    pub const ALL: [EventKind; 15] = [
        EventKind::DidReceiveSettings,
        EventKind::DidReceiveGlobalSettings,
        EventKind::KeyDown,
        EventKind::KeyUp,
        EventKind::WillAppear,
        EventKind::WillDisappear,
        EventKind::TitleParametersDidChange,
        EventKind::DeviceDidConnect,
        EventKind::DeviceDidDisconnect,
        EventKind::ApplicationDidLaunch,
        EventKind::ApplicationDidTerminate,
        EventKind::SystemDidWakeUp,
        EventKind::PropertyInspectorDidAppear,
        EventKind::PropertyInspectorDidDisappear,
        EventKind::SendToPlugin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DidReceiveSettings => "didReceiveSettings",
            EventKind::DidReceiveGlobalSettings => "didReceiveGlobalSettings",
            EventKind::KeyDown => "keyDown",
            EventKind::KeyUp => "keyUp",
            EventKind::WillAppear => "willAppear",
            EventKind::WillDisappear => "willDisappear",
            EventKind::TitleParametersDidChange => "titleParametersDidChange",
            EventKind::DeviceDidConnect => "deviceDidConnect",
            EventKind::DeviceDidDisconnect => "deviceDidDisconnect",
            EventKind::ApplicationDidLaunch => "applicationDidLaunch",
            EventKind::ApplicationDidTerminate => "applicationDidTerminate",
            EventKind::SystemDidWakeUp => "systemDidWakeUp",
            EventKind::PropertyInspectorDidAppear => "propertyInspectorDidAppear",
            EventKind::PropertyInspectorDidDisappear => "propertyInspectorDidDisappear",
            EventKind::SendToPlugin => "sendToPlugin",
        }
    }

    /// Whether envelopes of this kind are addressed to an action instance.
    pub fn carries_context(&self) -> bool {
        matches!(
            self,
            EventKind::DidReceiveSettings
                | EventKind::KeyDown
                | EventKind::KeyUp
                | EventKind::WillAppear
                | EventKind::WillDisappear
                | EventKind::TitleParametersDidChange
                | EventKind::PropertyInspectorDidAppear
                | EventKind::PropertyInspectorDidDisappear
                | EventKind::SendToPlugin
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = DeckError;

    // Exact, case-sensitive: the wire vocabulary is fixed.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == input)
            .ok_or_else(|| DeckError::MalformedEnvelope(format!("unknown event kind '{input}'")))
    }
}

/// Envelope addressed to one action instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent<P> {
    pub action: String,
    pub context: String,
    pub device: String,
    pub payload: P,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearPayload {
    #[serde(default)]
    pub settings: Settings,
    /// Absent when the action lives inside a multi-action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u32>,
    #[serde(default)]
    pub is_in_multi_action: bool,
}

/// `didReceiveSettings` shares the appear-event payload shape.
pub type SettingsPayload = AppearPayload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPayload {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u32>,
    /// Set when a multi-action triggers the key with an explicit state.
    #[serde(
        default,
        deserialize_with = "deserialize_desired_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_desired_state: Option<u8>,
    #[serde(default)]
    pub is_in_multi_action: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleAlignment {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleParameters {
    #[serde(default)]
    pub font_family: String,
    #[serde(default)]
    pub font_size: u32,
    #[serde(default)]
    pub font_style: String,
    #[serde(default)]
    pub font_underline: bool,
    #[serde(default)]
    pub show_title: bool,
    pub title_alignment: TitleAlignment,
    #[serde(default)]
    pub title_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitlePayload {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<u32>,
    #[serde(default)]
    pub title: String,
    pub title_parameters: TitleParameters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettingsEvent {
    pub payload: GlobalSettingsPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettingsPayload {
    #[serde(default)]
    pub settings: Settings,
}

/// `deviceInfo` is required here: a connect event without it is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnectEvent {
    pub device: String,
    pub device_info: DeviceInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDisconnectEvent {
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationEvent {
    pub payload: ApplicationPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationPayload {
    pub application: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInspectorEvent {
    pub action: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendToPluginEvent {
    pub action: String,
    pub context: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct EventHeader {
    event: EventKind,
}

/// A decoded inbound envelope, one variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    DidReceiveSettings(ActionEvent<SettingsPayload>),
    DidReceiveGlobalSettings(GlobalSettingsEvent),
    KeyDown(ActionEvent<KeyPayload>),
    KeyUp(ActionEvent<KeyPayload>),
    WillAppear(ActionEvent<AppearPayload>),
    WillDisappear(ActionEvent<AppearPayload>),
    TitleParametersDidChange(ActionEvent<TitlePayload>),
    DeviceDidConnect(DeviceConnectEvent),
    DeviceDidDisconnect(DeviceDisconnectEvent),
    ApplicationDidLaunch(ApplicationEvent),
    ApplicationDidTerminate(ApplicationEvent),
    SystemDidWakeUp,
    PropertyInspectorDidAppear(PropertyInspectorEvent),
    PropertyInspectorDidDisappear(PropertyInspectorEvent),
    SendToPlugin(SendToPluginEvent),
}

impl InboundEvent {
    /// Decodes the kind tag alone, then the envelope shape that kind implies.
    pub fn decode(text: &str) -> Result<Self, DeckError> {
        let kind = decode_kind(text)?;
        Self::decode_as(kind, text)
    }

    pub fn decode_as(kind: EventKind, text: &str) -> Result<Self, DeckError> {
        let parse_err =
            |err: serde_json::Error| DeckError::MalformedEnvelope(format!("{kind}: {err}"));
        let event = match kind {
            EventKind::DidReceiveSettings => {
                InboundEvent::DidReceiveSettings(parse(text).map_err(parse_err)?)
            }
            EventKind::DidReceiveGlobalSettings => {
                InboundEvent::DidReceiveGlobalSettings(parse(text).map_err(parse_err)?)
            }
            EventKind::KeyDown => InboundEvent::KeyDown(parse(text).map_err(parse_err)?),
            EventKind::KeyUp => InboundEvent::KeyUp(parse(text).map_err(parse_err)?),
            EventKind::WillAppear => InboundEvent::WillAppear(parse(text).map_err(parse_err)?),
            EventKind::WillDisappear => {
                InboundEvent::WillDisappear(parse(text).map_err(parse_err)?)
            }
            EventKind::TitleParametersDidChange => {
                InboundEvent::TitleParametersDidChange(parse(text).map_err(parse_err)?)
            }
            EventKind::DeviceDidConnect => {
                InboundEvent::DeviceDidConnect(parse(text).map_err(parse_err)?)
            }
            EventKind::DeviceDidDisconnect => {
                InboundEvent::DeviceDidDisconnect(parse(text).map_err(parse_err)?)
            }
            EventKind::ApplicationDidLaunch => {
                InboundEvent::ApplicationDidLaunch(parse(text).map_err(parse_err)?)
            }
            EventKind::ApplicationDidTerminate => {
                InboundEvent::ApplicationDidTerminate(parse(text).map_err(parse_err)?)
            }
            EventKind::SystemDidWakeUp => InboundEvent::SystemDidWakeUp,
            EventKind::PropertyInspectorDidAppear => {
                InboundEvent::PropertyInspectorDidAppear(parse(text).map_err(parse_err)?)
            }
            EventKind::PropertyInspectorDidDisappear => {
                InboundEvent::PropertyInspectorDidDisappear(parse(text).map_err(parse_err)?)
            }
            EventKind::SendToPlugin => InboundEvent::SendToPlugin(parse(text).map_err(parse_err)?),
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            InboundEvent::DidReceiveSettings(_) => EventKind::DidReceiveSettings,
            InboundEvent::DidReceiveGlobalSettings(_) => EventKind::DidReceiveGlobalSettings,
            InboundEvent::KeyDown(_) => EventKind::KeyDown,
            InboundEvent::KeyUp(_) => EventKind::KeyUp,
            InboundEvent::WillAppear(_) => EventKind::WillAppear,
            InboundEvent::WillDisappear(_) => EventKind::WillDisappear,
            InboundEvent::TitleParametersDidChange(_) => EventKind::TitleParametersDidChange,
            InboundEvent::DeviceDidConnect(_) => EventKind::DeviceDidConnect,
            InboundEvent::DeviceDidDisconnect(_) => EventKind::DeviceDidDisconnect,
            InboundEvent::ApplicationDidLaunch(_) => EventKind::ApplicationDidLaunch,
            InboundEvent::ApplicationDidTerminate(_) => EventKind::ApplicationDidTerminate,
            InboundEvent::SystemDidWakeUp => EventKind::SystemDidWakeUp,
            InboundEvent::PropertyInspectorDidAppear(_) => EventKind::PropertyInspectorDidAppear,
            InboundEvent::PropertyInspectorDidDisappear(_) => {
                EventKind::PropertyInspectorDidDisappear
            }
            InboundEvent::SendToPlugin(_) => EventKind::SendToPlugin,
        }
    }

    /// The addressed instance, for kinds that carry one.
    pub fn context(&self) -> Option<&str> {
        match self {
            InboundEvent::DidReceiveSettings(ev) => Some(&ev.context),
            InboundEvent::KeyDown(ev) | InboundEvent::KeyUp(ev) => Some(&ev.context),
            InboundEvent::WillAppear(ev) | InboundEvent::WillDisappear(ev) => Some(&ev.context),
            InboundEvent::TitleParametersDidChange(ev) => Some(&ev.context),
            InboundEvent::PropertyInspectorDidAppear(ev)
            | InboundEvent::PropertyInspectorDidDisappear(ev) => Some(&ev.context),
            InboundEvent::SendToPlugin(ev) => Some(&ev.context),
            InboundEvent::DidReceiveGlobalSettings(_)
            | InboundEvent::DeviceDidConnect(_)
            | InboundEvent::DeviceDidDisconnect(_)
            | InboundEvent::ApplicationDidLaunch(_)
            | InboundEvent::ApplicationDidTerminate(_)
            | InboundEvent::SystemDidWakeUp => None,
        }
    }
}

/// Reads only the `event` tag of a raw envelope.
pub fn decode_kind(text: &str) -> Result<EventKind, DeckError> {
    let header: EventHeader = serde_json::from_str(text).map_err(DeckError::malformed)?;
    Ok(header.event)
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(text)
}

fn deserialize_desired_state<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<u8> = Option::deserialize(deserializer)?;
    match value {
        None | Some(0) | Some(1) => Ok(value),
        Some(other) => Err(serde::de::Error::custom(format!(
            "userDesiredState must be 0 or 1, got {other}"
        ))),
    }
}
