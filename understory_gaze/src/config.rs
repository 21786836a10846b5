// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatcher configuration.

use crate::types::Channel;

/// Runtime switches read by the dispatcher on every sample.
///
/// With the `serde` feature this type is (de)serializable, and missing fields
/// fall back to [`Default`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DispatchConfig {
    /// Move the OS pointer to every gaze sample.
    pub gaze_drives_cursor: bool,
    /// The user has taken the mouse back; overrides `gaze_drives_cursor`.
    pub mouse_free: bool,
}

impl DispatchConfig {
    /// Whether a sample on `channel` should also move the OS pointer.
    ///
    /// Mouse samples never do: they already are the pointer.
    pub fn moves_cursor_for(&self, channel: Channel) -> bool {
        self.gaze_drives_cursor && !self.mouse_free && channel == Channel::Gaze
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_side_channel_truth_table() {
        let off = DispatchConfig::default();
        assert!(!off.moves_cursor_for(Channel::Gaze));

        let on = DispatchConfig {
            gaze_drives_cursor: true,
            mouse_free: false,
        };
        assert!(on.moves_cursor_for(Channel::Gaze));
        assert!(!on.moves_cursor_for(Channel::Mouse));

        let freed = DispatchConfig {
            mouse_free: true,
            ..on
        };
        assert!(!freed.moves_cursor_for(Channel::Gaze));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_fall_back_to_default() {
        let partial: DispatchConfig =
            serde_json::from_str(r#"{ "gaze_drives_cursor": true }"#).unwrap();
        assert_eq!(
            partial,
            DispatchConfig {
                gaze_drives_cursor: true,
                mouse_free: false,
            }
        );

        let empty: DispatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, DispatchConfig::default());

        let text = serde_json::to_string(&partial).unwrap();
        assert_eq!(
            serde_json::from_str::<DispatchConfig>(&text).unwrap(),
            partial,
            "serialized config reads back unchanged"
        );
    }
}
