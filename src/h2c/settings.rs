//! Tunable HTTP/2 settings offered during the upgrade
//!
//! Four parameters are exposed to the operator. They always travel together
//! as a fixed 24-byte SETTINGS payload, both in the `HTTP2-Settings` header
//! of the upgrade request and in later live updates.

use super::{Error, Result};
use crate::http::h2::settings::{SettingsParameter, SETTING_ENTRY_SIZE};
use crate::http::h2::{DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::str::FromStr;

/// Size of the serialized payload
pub const SETTINGS_PAYLOAD_LEN: usize = 4 * SETTING_ENTRY_SIZE;

/// Default SETTINGS_MAX_CONCURRENT_STREAMS offered to the server
pub const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 250;

/// Operator-facing setting names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingName {
    Push,
    MaxStream,
    WindowSize,
    FrameSize,
}

impl SettingName {
    /// All names, in wire order
    pub const ALL: [SettingName; 4] = [
        SettingName::Push,
        SettingName::MaxStream,
        SettingName::WindowSize,
        SettingName::FrameSize,
    ];

    /// Name as typed at the prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingName::Push => "push",
            SettingName::MaxStream => "maxStream",
            SettingName::WindowSize => "windowSize",
            SettingName::FrameSize => "frameSize",
        }
    }

    /// Registered HTTP/2 parameter
    pub fn parameter(&self) -> SettingsParameter {
        match self {
            SettingName::Push => SettingsParameter::EnablePush,
            SettingName::MaxStream => SettingsParameter::MaxConcurrentStreams,
            SettingName::WindowSize => SettingsParameter::InitialWindowSize,
            SettingName::FrameSize => SettingsParameter::MaxFrameSize,
        }
    }
}

impl FromStr for SettingName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SettingName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownSetting(s.to_string()))
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (identifier, value) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub id: SettingsParameter,
    pub value: u32,
}

impl Setting {
    fn new(id: SettingsParameter, value: u32) -> Self {
        Setting { id, value }
    }
}

/// The four tunable settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningSettings {
    entries: [Setting; 4],
}

impl TuningSettings {
    /// Defaults: push disabled, 250 streams, 65535 window, 16384 frame size
    pub fn new() -> Self {
        TuningSettings {
            entries: [
                Setting::new(SettingsParameter::EnablePush, 0),
                Setting::new(
                    SettingsParameter::MaxConcurrentStreams,
                    DEFAULT_MAX_CONCURRENT_STREAMS,
                ),
                Setting::new(
                    SettingsParameter::InitialWindowSize,
                    DEFAULT_INITIAL_WINDOW_SIZE,
                ),
                Setting::new(SettingsParameter::MaxFrameSize, DEFAULT_MAX_FRAME_SIZE),
            ],
        }
    }

    fn index(name: SettingName) -> usize {
        match name {
            SettingName::Push => 0,
            SettingName::MaxStream => 1,
            SettingName::WindowSize => 2,
            SettingName::FrameSize => 3,
        }
    }

    /// Current value of a setting
    pub fn get(&self, name: SettingName) -> u32 {
        self.entries[Self::index(name)].value
    }

    /// All entries in wire order
    pub fn entries(&self) -> &[Setting; 4] {
        &self.entries
    }

    /// Whether the push value is non-zero
    pub fn push_enabled(&self) -> bool {
        self.get(SettingName::Push) > 0
    }

    /// Apply an operator update
    ///
    /// The value is parsed before the name is looked up. Zero and negative
    /// values leave the stored value alone and return `false`; values above
    /// `u32::MAX` are rejected.
    pub fn apply(&mut self, name: &str, raw_value: &str) -> Result<bool> {
        let invalid = || Error::InvalidSettingValue(raw_value.to_string());
        let value: i64 = raw_value.parse().map_err(|_| invalid())?;
        let name: SettingName = name.parse()?;

        if value <= 0 {
            log::debug!("ignoring non-positive value {} for {}", value, name);
            return Ok(false);
        }

        self.entries[Self::index(name)].value = u32::try_from(value).map_err(|_| invalid())?;
        Ok(true)
    }

    /// The 24-byte SETTINGS payload
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(SETTINGS_PAYLOAD_LEN);
        for setting in &self.entries {
            buf.put_u16(setting.id.as_u16());
            buf.put_u32(setting.value);
        }
        buf.freeze()
    }

    /// `HTTP2-Settings` header value: unpadded base64url of the payload
    pub fn encoded(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.serialize())
    }

    /// One-line summary shown after every `settings` command
    pub fn describe(&self) -> String {
        format!(
            "Enable Push: {} | Max Concurrent Streams: {} | Init Window Size: {} | Max Frame Size: {}",
            self.push_enabled(),
            self.get(SettingName::MaxStream),
            self.get(SettingName::WindowSize),
            self.get(SettingName::FrameSize)
        )
    }
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TuningSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payload_layout() {
        let payload = TuningSettings::new().serialize();
        assert_eq!(payload.len(), SETTINGS_PAYLOAD_LEN);
        assert_eq!(
            &payload[..],
            &[
                0x00, 0x02, 0x00, 0x00, 0x00, 0x00, // push
                0x00, 0x03, 0x00, 0x00, 0x00, 0xfa, // maxStream
                0x00, 0x04, 0x00, 0x00, 0xff, 0xff, // windowSize
                0x00, 0x05, 0x00, 0x00, 0x40, 0x00, // frameSize
            ]
        );
    }

    #[test]
    fn test_zero_is_a_noop() {
        let mut settings = TuningSettings::new();
        for name in SettingName::ALL {
            let before = settings.get(name);
            assert!(!settings.apply(name.as_str(), "0").unwrap());
            assert_eq!(settings.get(name), before);
        }
    }

    #[test]
    fn test_negative_is_a_noop() {
        let mut settings = TuningSettings::new();
        for name in SettingName::ALL {
            assert!(!settings.apply(name.as_str(), "-1").unwrap());
        }
        assert_eq!(settings, TuningSettings::new());
        assert!(matches!(
            settings.apply("bogus", "-1"),
            Err(Error::UnknownSetting(_))
        ));
    }

    #[test]
    fn test_positive_value_overwrites() {
        let mut settings = TuningSettings::new();
        for (i, name) in SettingName::ALL.into_iter().enumerate() {
            let value = 20000 + i as u32;
            assert!(settings.apply(name.as_str(), &value.to_string()).unwrap());
            assert_eq!(settings.get(name), value);
        }
    }

    #[test]
    fn test_push_is_serialized_raw() {
        let mut settings = TuningSettings::new();
        settings.apply("push", "123").unwrap();
        assert!(settings.push_enabled());
        assert_eq!(&settings.serialize()[..6], &[0, 2, 0, 0, 0, 123]);
    }

    #[test]
    fn test_invalid_values() {
        let mut settings = TuningSettings::new();
        assert!(matches!(
            settings.apply("maxStream", ""),
            Err(Error::InvalidSettingValue(_))
        ));
        assert!(matches!(
            settings.apply("maxStream", "abc"),
            Err(Error::InvalidSettingValue(_))
        ));
        assert!(matches!(
            settings.apply("maxStream", "4294967296"),
            Err(Error::InvalidSettingValue(_))
        ));
        assert!(matches!(
            settings.apply("bogus", "5"),
            Err(Error::UnknownSetting(name)) if name == "bogus"
        ));
        // Value is checked first
        assert!(matches!(
            settings.apply("bogus", "x"),
            Err(Error::InvalidSettingValue(_))
        ));
        assert_eq!(settings, TuningSettings::new());
    }

    #[test]
    fn test_describe() {
        let mut settings = TuningSettings::new();
        assert_eq!(
            settings.describe(),
            "Enable Push: false | Max Concurrent Streams: 250 | Init Window Size: 65535 | Max Frame Size: 16384"
        );

        settings.apply("push", "123").unwrap();
        settings.apply("maxStream", "2345").unwrap();
        assert_eq!(
            settings.to_string(),
            "Enable Push: true | Max Concurrent Streams: 2345 | Init Window Size: 65535 | Max Frame Size: 16384"
        );
    }

    #[test]
    fn test_encoded_header_value() {
        let settings = TuningSettings::new();
        let encoded = settings.encoded();
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(URL_SAFE_NO_PAD.decode(&encoded).unwrap(), settings.serialize());
    }

    #[test]
    fn test_setting_name_parse() {
        assert_eq!("windowSize".parse::<SettingName>().unwrap(), SettingName::WindowSize);
        assert!("WindowSize".parse::<SettingName>().is_err());
        assert_eq!(SettingName::FrameSize.parameter(), SettingsParameter::MaxFrameSize);
    }
}
