use crate::error::DeckError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The `-info` blob the controller hands the plugin at launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInfo {
    pub application: ApplicationInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginInfo>,
    #[serde(default = "default_pixel_ratio")]
    pub device_pixel_ratio: f64,
    /// Theme colours keyed by their controller names (`highlightColor`, ...).
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default)]
    pub devices: Vec<RegisteredDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    pub language: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub uuid: String,
    pub version: String,
}

/// A device known to the controller at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredDevice {
    pub id: String,
    #[serde(flatten)]
    pub info: DeviceInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_code: u32,
    pub size: DeviceSize,
}

impl DeviceInfo {
    pub fn device_type(&self) -> DeviceType {
        DeviceType::from_code(self.type_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceSize {
    pub columns: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    StreamDeck,
    StreamDeckMini,
    StreamDeckXl,
    StreamDeckMobile,
    CorsairGKeys,
    StreamDeckPedal,
    CorsairVoyager,
    StreamDeckPlus,
    Other(u32),
}

impl DeviceType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => DeviceType::StreamDeck,
            1 => DeviceType::StreamDeckMini,
            2 => DeviceType::StreamDeckXl,
            3 => DeviceType::StreamDeckMobile,
            4 => DeviceType::CorsairGKeys,
            5 => DeviceType::StreamDeckPedal,
            6 => DeviceType::CorsairVoyager,
            7 => DeviceType::StreamDeckPlus,
            other => DeviceType::Other(other),
        }
    }
}

impl ControllerInfo {
    pub fn parse(raw: &str) -> Result<Self, DeckError> {
        serde_json::from_str(raw).map_err(|err| DeckError::InvalidInfo(err.to_string()))
    }

    pub fn device(&self, id: &str) -> Option<&RegisteredDevice> {
        self.devices.iter().find(|device| device.id == id)
    }
}

impl fmt::Display for ControllerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {}), {} device(s)",
            self.application.platform,
            self.application.version,
            self.application.language,
            self.plugin
                .as_ref()
                .map(|plugin| format!("{} {}", plugin.uuid, plugin.version))
                .unwrap_or_else(|| "unknown plugin".to_string()),
            self.devices.len()
        )
    }
}

fn default_pixel_ratio() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRATION_INFO: &str = r##"{
        "application": {
            "font": ".AppleSystemUIFont",
            "language": "en",
            "platform": "mac",
            "platformVersion": "11.4.0",
            "version": "5.0.0.14247"
        },
        "plugin": {"uuid": "com.elgato.counter", "version": "1.4"},
        "devicePixelRatio": 2,
        "colors": {
            "buttonPressedBackgroundColor": "#303030FF",
            "highlightColor": "#F7821BFF"
        },
        "devices": [
            {
                "id": "55F16B35884A859CCE4FFA1FC8D3DE5B",
                "name": "Device Name",
                "size": {"columns": 5, "rows": 3},
                "type": 0
            },
            {
                "id": "B8F04425B95855CF417199BCB97CD2BB",
                "name": "Another Device",
                "size": {"columns": 3, "rows": 2},
                "type": 1
            }
        ]
    }"##;

    #[test]
    fn parses_registration_info() {
        let info = ControllerInfo::parse(REGISTRATION_INFO).expect("parse");
        assert_eq!(info.application.platform, "mac");
        assert_eq!(info.device_pixel_ratio, 2.0);
        assert_eq!(info.colors.get("highlightColor").map(String::as_str), Some("#F7821BFF"));
        assert_eq!(info.devices.len(), 2);

        let mini = info.device("B8F04425B95855CF417199BCB97CD2BB").expect("device");
        assert_eq!(mini.info.device_type(), DeviceType::StreamDeckMini);
        assert_eq!(mini.info.size, DeviceSize { columns: 3, rows: 2 });
        assert!(info.to_string().contains("com.elgato.counter 1.4"));
    }

    #[test]
    fn unknown_device_codes_are_kept() {
        assert_eq!(DeviceType::from_code(42), DeviceType::Other(42));
    }

    #[test]
    fn invalid_info_is_reported() {
        let err = ControllerInfo::parse("{\"devices\": []}").expect_err("application missing");
        assert!(matches!(err, DeckError::InvalidInfo(_)));
    }
}
