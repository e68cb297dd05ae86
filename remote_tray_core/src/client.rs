//! Mock client state: the session and capability snapshot that tray menus are built from.

use serde::Deserialize;

/// Direction in which clipboard contents are synchronised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClipboardDirection {
    Disabled,
    #[default]
    Both,
    ToServer,
    ToClient,
}

impl ClipboardDirection {
    pub const ALL: [ClipboardDirection; 4] = [
        ClipboardDirection::Disabled,
        ClipboardDirection::Both,
        ClipboardDirection::ToServer,
        ClipboardDirection::ToClient,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ClipboardDirection::Disabled => "Disabled",
            ClipboardDirection::Both => "Both directions",
            ClipboardDirection::ToServer => "Client to server only",
            ClipboardDirection::ToClient => "Server to client only",
        }
    }
}

/// Snapshot of a connected client and the server it negotiated with.
///
/// Plain data. Every field has a default so the harness can run without any state file, and a
/// state file only needs to name the fields it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientState {
    pub session_name: String,

    // Local session toggles
    pub mmap_enabled: bool,
    pub windows_enabled: bool,
    pub readonly: bool,
    pub modal_windows: bool,
    pub opengl_enabled: bool,
    pub notifications_enabled: bool,
    pub clipboard_enabled: bool,
    pub client_clipboard_direction: ClipboardDirection,
    pub cursors_enabled: bool,
    pub bell_enabled: bool,
    pub speaker_enabled: bool,
    pub speaker_allowed: bool,
    pub microphone_enabled: bool,
    pub microphone_allowed: bool,
    pub av_sync: bool,
    pub webcam_forwarding: bool,
    pub webcam_device: Option<String>,
    pub client_lock: bool,
    pub remote_file_transfer: bool,
    pub remote_file_transfer_ask: bool,
    pub download_server_log: bool,

    // What this client build supports
    pub client_supports_opengl: bool,
    pub client_supports_notifications: bool,
    pub client_supports_system_tray: bool,
    pub client_supports_clipboard: bool,
    pub client_supports_cursors: bool,
    pub client_supports_bell: bool,
    pub client_supports_sharing: bool,

    // Negotiated picture settings
    /// Default encoding; always the first entry of `encodings`.
    pub encoding: String,
    /// Encodings in preference order.
    pub encodings: Vec<String>,
    pub quality: u8,
    pub speed: u8,
    pub can_scale: bool,
    pub xscale: f64,
    pub yscale: f64,

    // Server capability mirror, never mutated after construction
    pub server_bell: bool,
    pub server_cursors: bool,
    pub server_readonly: bool,
    pub server_client_shutdown: bool,
    pub server_sharing: bool,
    pub server_sharing_toggle: bool,
    pub server_lock: bool,
    pub server_lock_toggle: bool,
    pub server_av_sync: bool,
    pub server_virtual_video_devices: u32,
    pub server_webcam: bool,
    pub server_sound_send: bool,
    pub server_sound_receive: bool,
    pub server_clipboard: bool,
    pub server_bandwidth_limit_change: u32,
    pub server_encodings: Vec<String>,
    pub server_encodings_problematic: Vec<String>,
    pub server_encodings_with_quality: Vec<String>,
    pub server_encodings_with_speed: Vec<String>,
    pub server_start_new_commands: bool,
    pub server_xdg_menu: bool,
    pub server_commands_info: Option<String>,
}

/// Preference order used when no state file overrides `encodings`.
pub const PREFERRED_ENCODINGS: &[&str] = &["png", "rgb", "webp", "jpeg", "h264", "vp8", "vp9"];

impl Default for ClientState {
    fn default() -> Self {
        ClientState {
            session_name: "Test System Tray".to_string(),

            mmap_enabled: false,
            windows_enabled: true,
            readonly: false,
            modal_windows: false,
            opengl_enabled: false,
            notifications_enabled: false,
            clipboard_enabled: true,
            client_clipboard_direction: ClipboardDirection::Both,
            cursors_enabled: true,
            bell_enabled: false,
            speaker_enabled: true,
            speaker_allowed: true,
            microphone_enabled: true,
            microphone_allowed: true,
            av_sync: true,
            webcam_forwarding: true,
            webcam_device: None,
            client_lock: false,
            remote_file_transfer: true,
            remote_file_transfer_ask: true,
            download_server_log: false,

            client_supports_opengl: true,
            client_supports_notifications: true,
            client_supports_system_tray: true,
            client_supports_clipboard: true,
            client_supports_cursors: true,
            client_supports_bell: true,
            client_supports_sharing: true,

            encoding: PREFERRED_ENCODINGS[0].to_string(),
            encodings: PREFERRED_ENCODINGS.iter().map(|e| e.to_string()).collect(),
            quality: 80,
            speed: 50,
            can_scale: true,
            xscale: 1.0,
            yscale: 1.0,

            server_bell: false,
            server_cursors: false,
            server_readonly: false,
            server_client_shutdown: true,
            server_sharing: true,
            server_sharing_toggle: true,
            server_lock: true,
            server_lock_toggle: true,
            server_av_sync: true,
            server_virtual_video_devices: 4,
            server_webcam: true,
            server_sound_send: true,
            server_sound_receive: true,
            server_clipboard: false,
            server_bandwidth_limit_change: 0,
            server_encodings: vec!["png".to_string(), "rgb".to_string()],
            server_encodings_problematic: Vec::new(),
            server_encodings_with_quality: Vec::new(),
            server_encodings_with_speed: Vec::new(),
            server_start_new_commands: true,
            server_xdg_menu: false,
            server_commands_info: None,
        }
    }
}

/// Why a [`ClientState`] was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("the encoding list is empty")]
    NoEncodings,
    #[error("default encoding {encoding:?} is not the first preferred encoding {first:?}")]
    DefaultNotFirst { encoding: String, first: String },
    #[error("{field} must be within 0..=100, got {value}")]
    OutOfRange { field: &'static str, value: u8 },
    #[error("{field} must be a positive scale factor, got {value}")]
    BadScale { field: &'static str, value: f64 },
}

/// Permission/usage pairs: `(name, enabled, allowed)`.
type FlagPair = (&'static str, fn(&ClientState) -> (bool, bool));

const FLAG_PAIRS: &[FlagPair] = &[
    ("speaker", |s| (s.speaker_enabled, s.speaker_allowed)),
    ("microphone", |s| (s.microphone_enabled, s.microphone_allowed)),
    ("clipboard", |s| (s.clipboard_enabled, s.client_supports_clipboard)),
    ("cursors", |s| (s.cursors_enabled, s.client_supports_cursors)),
    ("bell", |s| (s.bell_enabled, s.client_supports_bell)),
    ("notifications", |s| {
        (s.notifications_enabled, s.client_supports_notifications)
    }),
    ("opengl", |s| (s.opengl_enabled, s.client_supports_opengl)),
    ("av-sync", |s| (s.av_sync, s.server_av_sync)),
    ("webcam", |s| (s.webcam_forwarding, s.server_webcam)),
    ("lock", |s| (s.client_lock, s.server_lock)),
    ("file-transfer-ask", |s| {
        (s.remote_file_transfer_ask, s.remote_file_transfer)
    }),
];

impl ClientState {
    /// Check the invariants a menu builder relies on.
    pub fn validate(&self) -> Result<(), StateError> {
        let first = self.encodings.first().ok_or(StateError::NoEncodings)?;
        if *first != self.encoding {
            return Err(StateError::DefaultNotFirst {
                encoding: self.encoding.clone(),
                first: first.clone(),
            });
        }
        for (field, value) in [("quality", self.quality), ("speed", self.speed)] {
            if value > 100 {
                return Err(StateError::OutOfRange { field, value });
            }
        }
        for (field, value) in [("xscale", self.xscale), ("yscale", self.yscale)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(StateError::BadScale { field, value });
            }
        }
        Ok(())
    }

    /// Names of the pairs whose feature is enabled without being allowed.
    ///
    /// Such pairs are not rejected; [`ClientCapabilities::feature`] reports them as inactive.
    pub fn inconsistent_pairs(&self) -> Vec<&'static str> {
        FLAG_PAIRS
            .iter()
            .filter(|(_, pair)| matches!(pair(self), (true, false)))
            .map(|(name, _)| *name)
            .collect()
    }
}

/// Features a tray menu may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Bell,
    Cursors,
    Notifications,
    ReadOnly,
    ModalWindows,
    Sharing,
    Lock,
    Clipboard,
    Speaker,
    Microphone,
    AvSync,
    Webcam,
    OpenGl,
    Scaling,
    BandwidthLimit,
    StartNewCommand,
    ServerCommands,
    FileUpload,
    DownloadServerLog,
    XdgMenu,
}

/// Whether a feature can be toggled and whether it is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureState {
    pub available: bool,
    pub active: bool,
}

impl FeatureState {
    fn new(available: bool, active: bool) -> Self {
        Self { available, active }
    }
}

/// The read-only view of a client that menu helpers and tray backends are allowed to use.
pub trait ClientCapabilities {
    fn session_name(&self) -> &str;

    fn feature(&self, feature: Feature) -> FeatureState;

    fn clipboard_direction(&self) -> ClipboardDirection;

    /// Current encoding.
    fn encoding(&self) -> &str;

    /// Client encodings, in preference order. Never empty.
    fn encodings(&self) -> &[String];

    fn server_supports_encoding(&self, encoding: &str) -> bool;

    fn encoding_is_problematic(&self, encoding: &str) -> bool;

    /// Whether the server lets the client tune quality for `encoding`.
    fn encoding_has_quality(&self, encoding: &str) -> bool;

    /// Whether the server lets the client tune speed for `encoding`.
    fn encoding_has_speed(&self, encoding: &str) -> bool;

    fn quality(&self) -> u8;

    fn speed(&self) -> u8;

    fn scaling(&self) -> (f64, f64);
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|e| e == value)
}

impl ClientCapabilities for ClientState {
    fn session_name(&self) -> &str {
        &self.session_name
    }

    fn feature(&self, feature: Feature) -> FeatureState {
        match feature {
            Feature::Bell => FeatureState::new(
                self.server_bell && self.client_supports_bell,
                self.bell_enabled && self.client_supports_bell,
            ),
            Feature::Cursors => FeatureState::new(
                self.server_cursors && self.client_supports_cursors,
                self.cursors_enabled && self.client_supports_cursors,
            ),
            Feature::Notifications => FeatureState::new(
                self.client_supports_notifications,
                self.notifications_enabled && self.client_supports_notifications,
            ),
            Feature::ReadOnly => FeatureState::new(!self.server_readonly, self.readonly),
            Feature::ModalWindows => FeatureState::new(self.windows_enabled, self.modal_windows),
            Feature::Sharing => FeatureState::new(
                self.server_sharing_toggle && self.client_supports_sharing,
                self.server_sharing,
            ),
            Feature::Lock => FeatureState::new(
                self.server_lock_toggle,
                self.client_lock && self.server_lock,
            ),
            Feature::Clipboard => FeatureState::new(
                self.server_clipboard && self.client_supports_clipboard,
                self.clipboard_enabled && self.client_supports_clipboard,
            ),
            Feature::Speaker => FeatureState::new(
                self.speaker_allowed && self.server_sound_send,
                self.speaker_enabled && self.speaker_allowed,
            ),
            Feature::Microphone => FeatureState::new(
                self.microphone_allowed && self.server_sound_receive,
                self.microphone_enabled && self.microphone_allowed,
            ),
            Feature::AvSync => {
                FeatureState::new(self.server_av_sync, self.av_sync && self.server_av_sync)
            }
            Feature::Webcam => FeatureState::new(
                self.server_webcam && self.server_virtual_video_devices > 0,
                self.webcam_forwarding && self.server_webcam,
            ),
            Feature::OpenGl => FeatureState::new(
                self.client_supports_opengl,
                self.opengl_enabled && self.client_supports_opengl,
            ),
            Feature::Scaling => FeatureState::new(
                self.can_scale,
                self.xscale != 1.0 || self.yscale != 1.0,
            ),
            Feature::BandwidthLimit => {
                FeatureState::new(self.server_bandwidth_limit_change > 0, false)
            }
            Feature::StartNewCommand => FeatureState::new(self.server_start_new_commands, false),
            Feature::ServerCommands => {
                FeatureState::new(self.server_commands_info.is_some(), false)
            }
            Feature::FileUpload => FeatureState::new(
                self.remote_file_transfer,
                self.remote_file_transfer_ask && self.remote_file_transfer,
            ),
            Feature::DownloadServerLog => FeatureState::new(self.download_server_log, false),
            Feature::XdgMenu => FeatureState::new(self.server_xdg_menu, false),
        }
    }

    fn clipboard_direction(&self) -> ClipboardDirection {
        self.client_clipboard_direction
    }

    fn encoding(&self) -> &str {
        &self.encoding
    }

    fn encodings(&self) -> &[String] {
        &self.encodings
    }

    fn server_supports_encoding(&self, encoding: &str) -> bool {
        contains(&self.server_encodings, encoding)
    }

    fn encoding_is_problematic(&self, encoding: &str) -> bool {
        contains(&self.server_encodings_problematic, encoding)
    }

    fn encoding_has_quality(&self, encoding: &str) -> bool {
        contains(&self.server_encodings_with_quality, encoding)
    }

    fn encoding_has_speed(&self, encoding: &str) -> bool {
        contains(&self.server_encodings_with_speed, encoding)
    }

    fn quality(&self) -> u8 {
        self.quality
    }

    fn speed(&self) -> u8 {
        self.speed
    }

    fn scaling(&self) -> (f64, f64) {
        (self.xscale, self.yscale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_encoding_leads_preference_order() {
        let state = ClientState::default();
        assert!(!state.encodings.is_empty());
        assert_eq!(state.encodings[0], state.encoding);
        assert_eq!(state.validate(), Ok(()));
    }

    #[test]
    fn default_state_has_consistent_pairs() {
        assert!(ClientState::default().inconsistent_pairs().is_empty());
    }

    #[test]
    fn enabled_without_allowed_is_reported_and_inactive() {
        let state = ClientState {
            speaker_allowed: false,
            ..ClientState::default()
        };
        assert_eq!(state.inconsistent_pairs(), vec!["speaker"]);
        let speaker = state.feature(Feature::Speaker);
        assert!(!speaker.active);
        assert!(!speaker.available);
    }

    #[test]
    fn allowed_without_enabled_is_fine() {
        let state = ClientState {
            microphone_enabled: false,
            ..ClientState::default()
        };
        assert!(state.inconsistent_pairs().is_empty());
        assert!(state.feature(Feature::Microphone).available);
        assert!(!state.feature(Feature::Microphone).active);
    }

    #[test]
    fn validate_rejects_bad_states() {
        let empty = ClientState {
            encodings: Vec::new(),
            ..ClientState::default()
        };
        assert_eq!(empty.validate(), Err(StateError::NoEncodings));

        let reordered = ClientState {
            encoding: "rgb".to_string(),
            ..ClientState::default()
        };
        assert!(matches!(
            reordered.validate(),
            Err(StateError::DefaultNotFirst { .. })
        ));

        let quality = ClientState {
            quality: 101,
            ..ClientState::default()
        };
        assert_eq!(
            quality.validate(),
            Err(StateError::OutOfRange {
                field: "quality",
                value: 101
            })
        );

        let scale = ClientState {
            yscale: 0.0,
            ..ClientState::default()
        };
        assert!(matches!(
            scale.validate(),
            Err(StateError::BadScale { field: "yscale", .. })
        ));
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let state: ClientState = serde_json::from_str(
            r#"{
                "session_name": "Lab",
                "server_bell": true,
                "client_clipboard_direction": "to-server"
            }"#,
        )
        .unwrap();
        assert_eq!(state.session_name, "Lab");
        assert!(state.feature(Feature::Bell).available);
        assert_eq!(state.clipboard_direction(), ClipboardDirection::ToServer);
        assert_eq!(state.quality, 80);
        assert_eq!(state.encodings, ClientState::default().encodings);
    }

    #[test]
    fn server_encoding_queries() {
        let state = ClientState {
            server_encodings_problematic: vec!["rgb".to_string()],
            ..ClientState::default()
        };
        assert!(state.server_supports_encoding("png"));
        assert!(!state.server_supports_encoding("webp"));
        assert!(state.encoding_is_problematic("rgb"));
        assert!(!state.encoding_has_quality("png"));
    }
}
