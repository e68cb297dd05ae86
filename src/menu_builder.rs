//! Turns a client's capabilities into the tray menu tree.

use remote_tray_core::{
    ClientCapabilities, ClipboardDirection, Feature, MenuAction, MenuEntry, MenuItem, Submenu,
    TrayMenu,
};

const QUALITY_OPTIONS: &[(u8, &str)] = &[
    (0, "Auto"),
    (1, "Lowest"),
    (10, "Low"),
    (50, "Medium"),
    (90, "High"),
    (100, "Lossless"),
];

const SPEED_OPTIONS: &[(u8, &str)] = &[
    (0, "Auto"),
    (1, "Lowest"),
    (50, "Low"),
    (90, "Medium"),
    (100, "Highest"),
];

const SCALING_OPTIONS: &[u16] = &[50, 67, 100, 125, 150, 200];

const BANDWIDTH_OPTIONS: &[u32] = &[0, 1, 2, 5, 10, 20, 50, 100];

fn toggle(
    client: &dyn ClientCapabilities,
    feature: Feature,
    action: MenuAction,
    label: &str,
) -> MenuEntry<MenuAction> {
    let state = client.feature(feature);
    MenuEntry::Item(
        MenuItem::new(action, label)
            .checked(state.active)
            .enabled(state.available),
    )
}

fn command(
    client: &dyn ClientCapabilities,
    feature: Feature,
    action: MenuAction,
    label: &str,
) -> MenuEntry<MenuAction> {
    MenuEntry::Item(MenuItem::new(action, label).enabled(client.feature(feature).available))
}

/// Preset entries plus a `Custom` entry when `current` matches no preset.
fn presets(
    options: &[(u8, &str)],
    current: u8,
    action: fn(u8) -> MenuAction,
) -> Vec<MenuEntry<MenuAction>> {
    let mut items: Vec<_> = options
        .iter()
        .map(|&(value, label)| {
            let label = if value == 0 || value == 100 {
                label.to_string()
            } else {
                format!("{label} ({value}%)")
            };
            MenuEntry::Item(MenuItem::new(action(value), label).checked(value == current))
        })
        .collect();
    if !options.iter().any(|&(value, _)| value == current) {
        items.push(MenuEntry::Item(
            MenuItem::new(action(current), format!("Custom ({current}%)")).checked(true),
        ));
    }
    items
}

fn features_menu(client: &dyn ClientCapabilities) -> MenuEntry<MenuAction> {
    MenuEntry::Submenu(Submenu::new(
        "Features",
        vec![
            toggle(client, Feature::Bell, MenuAction::ToggleBell, "Bell"),
            toggle(client, Feature::Cursors, MenuAction::ToggleCursors, "Cursors"),
            toggle(
                client,
                Feature::Notifications,
                MenuAction::ToggleNotifications,
                "Notifications",
            ),
            toggle(client, Feature::ReadOnly, MenuAction::ToggleReadOnly, "Read-only"),
            toggle(client, Feature::ModalWindows, MenuAction::ToggleModalWindows, "Modal Windows"),
            MenuEntry::Separator,
            toggle(client, Feature::Sharing, MenuAction::ToggleSharing, "Sharing"),
            toggle(client, Feature::Lock, MenuAction::ToggleLock, "Lock"),
        ],
    ))
}

fn clipboard_menu(client: &dyn ClientCapabilities) -> MenuEntry<MenuAction> {
    let state = client.feature(Feature::Clipboard);
    let current = if state.active {
        client.clipboard_direction()
    } else {
        ClipboardDirection::Disabled
    };
    let items = ClipboardDirection::ALL
        .iter()
        .map(|&direction| {
            MenuEntry::Item(
                MenuItem::new(MenuAction::SetClipboardDirection(direction), direction.label())
                    .checked(direction == current),
            )
        })
        .collect();
    MenuEntry::Submenu(Submenu::new("Clipboard", items).enabled(state.available))
}

fn encodings_menu(client: &dyn ClientCapabilities) -> MenuEntry<MenuAction> {
    let items = client
        .encodings()
        .iter()
        .map(|encoding| {
            let label = if client.encoding_is_problematic(encoding) {
                format!("{encoding} (problematic)")
            } else {
                encoding.clone()
            };
            MenuEntry::Item(
                MenuItem::new(MenuAction::SetEncoding(encoding.clone()), label)
                    .checked(encoding == client.encoding())
                    .enabled(client.server_supports_encoding(encoding)),
            )
        })
        .collect();
    MenuEntry::Submenu(Submenu::new("Encoding", items))
}

fn scaling_menu(client: &dyn ClientCapabilities) -> MenuEntry<MenuAction> {
    let (xscale, yscale) = client.scaling();
    let current = (xscale == yscale).then(|| (xscale * 100.0).round() as u16);
    let items = SCALING_OPTIONS
        .iter()
        .map(|&percent| {
            MenuEntry::Item(
                MenuItem::new(MenuAction::SetScaling(percent), format!("{percent}%"))
                    .checked(current == Some(percent)),
            )
        })
        .collect();
    MenuEntry::Submenu(
        Submenu::new("Scaling", items).enabled(client.feature(Feature::Scaling).available),
    )
}

fn bandwidth_menu(client: &dyn ClientCapabilities) -> MenuEntry<MenuAction> {
    let items = BANDWIDTH_OPTIONS
        .iter()
        .map(|&mbps| {
            let label = if mbps == 0 {
                "None".to_string()
            } else {
                format!("{mbps}Mbps")
            };
            MenuEntry::Item(
                MenuItem::new(MenuAction::SetBandwidthLimit(mbps), label).checked(mbps == 0),
            )
        })
        .collect();
    MenuEntry::Submenu(
        Submenu::new("Bandwidth Limit", items)
            .enabled(client.feature(Feature::BandwidthLimit).available),
    )
}

fn audio_menu(client: &dyn ClientCapabilities) -> MenuEntry<MenuAction> {
    MenuEntry::Submenu(Submenu::new(
        "Audio",
        vec![
            toggle(client, Feature::Speaker, MenuAction::ToggleSpeaker, "Speaker"),
            toggle(client, Feature::Microphone, MenuAction::ToggleMicrophone, "Microphone"),
            toggle(
                client,
                Feature::AvSync,
                MenuAction::ToggleAvSync,
                "Synchronize Audio and Video",
            ),
        ],
    ))
}

/// Build the tray menu for `client`.
///
/// Every entry is always present so the layout is stable across sessions; what the session
/// cannot do is shown insensitive.
pub fn build_tray_menu(client: &dyn ClientCapabilities) -> TrayMenu {
    let encoding = client.encoding();
    let quality = MenuEntry::Submenu(
        Submenu::new("Quality", presets(QUALITY_OPTIONS, client.quality(), MenuAction::SetQuality))
            .enabled(client.encoding_has_quality(encoding)),
    );
    let speed = MenuEntry::Submenu(
        Submenu::new("Speed", presets(SPEED_OPTIONS, client.speed(), MenuAction::SetSpeed))
            .enabled(client.encoding_has_speed(encoding)),
    );

    let entries = vec![
        MenuEntry::Item(
            MenuItem::new(MenuAction::SessionInfo, client.session_name()).icon_name("information"),
        ),
        MenuEntry::Separator,
        features_menu(client),
        clipboard_menu(client),
        encodings_menu(client),
        quality,
        speed,
        scaling_menu(client),
        bandwidth_menu(client),
        audio_menu(client),
        toggle(client, Feature::Webcam, MenuAction::ToggleWebcam, "Webcam"),
        toggle(client, Feature::OpenGl, MenuAction::ToggleOpenGl, "OpenGL Acceleration"),
        MenuEntry::Separator,
        command(client, Feature::StartNewCommand, MenuAction::StartNewCommand, "Start New Command"),
        command(client, Feature::ServerCommands, MenuAction::ShowServerCommands, "Server Commands"),
        command(client, Feature::XdgMenu, MenuAction::ShowXdgMenu, "Server Applications"),
        command(client, Feature::FileUpload, MenuAction::UploadFile, "Upload File"),
        command(
            client,
            Feature::DownloadServerLog,
            MenuAction::DownloadServerLog,
            "Download Server Log",
        ),
        MenuEntry::Separator,
        MenuEntry::Item(MenuItem::new(MenuAction::Disconnect, "Disconnect").icon_name("quit")),
    ];
    TrayMenu::new(client.session_name(), entries)
}

#[cfg(test)]
mod tests {
    use remote_tray_core::ClientState;

    use super::*;

    fn item<'a>(menu: &'a TrayMenu, action: MenuAction) -> &'a MenuItem<MenuAction> {
        menu.item(&action)
            .unwrap_or_else(|| panic!("{action:?} missing from menu"))
    }

    #[test]
    fn default_state_menu() {
        let menu = build_tray_menu(&ClientState::default());
        assert_eq!(menu.title(), "Test System Tray");

        // The default server has no bell or cursor support.
        let bell = item(&menu, MenuAction::ToggleBell);
        assert!(!bell.enabled);
        assert_eq!(bell.checked, Some(false));
        assert!(!item(&menu, MenuAction::ToggleCursors).enabled);

        let speaker = item(&menu, MenuAction::ToggleSpeaker);
        assert!(speaker.enabled);
        assert_eq!(speaker.checked, Some(true));

        assert!(item(&menu, MenuAction::ToggleSharing).enabled);
        assert!(item(&menu, MenuAction::ToggleWebcam).enabled);
        assert!(item(&menu, MenuAction::StartNewCommand).enabled);
        assert!(!item(&menu, MenuAction::ShowServerCommands).enabled);
        assert!(!item(&menu, MenuAction::DownloadServerLog).enabled);
        assert!(item(&menu, MenuAction::Disconnect).enabled);

        assert!(!menu.submenu("Clipboard").unwrap().enabled);
        assert!(!menu.submenu("Quality").unwrap().enabled);
        assert!(!menu.submenu("Bandwidth Limit").unwrap().enabled);
        assert!(menu.submenu("Scaling").unwrap().enabled);
    }

    #[test]
    fn encodings_follow_server_support() {
        let menu = build_tray_menu(&ClientState::default());
        let png = item(&menu, MenuAction::SetEncoding("png".to_string()));
        assert_eq!(png.checked, Some(true));
        assert!(png.enabled);
        assert!(!item(&menu, MenuAction::SetEncoding("webp".to_string())).enabled);

        let problematic = ClientState {
            server_encodings_problematic: vec!["rgb".to_string()],
            ..ClientState::default()
        };
        let menu = build_tray_menu(&problematic);
        assert_eq!(
            item(&menu, MenuAction::SetEncoding("rgb".to_string())).label,
            "rgb (problematic)"
        );
    }

    #[test]
    fn quality_and_speed_presets() {
        let state = ClientState {
            server_encodings_with_quality: vec!["png".to_string()],
            ..ClientState::default()
        };
        let menu = build_tray_menu(&state);
        let quality = menu.submenu("Quality").unwrap();
        assert!(quality.enabled);

        // 80 is not a preset, so a custom entry carries the check.
        let custom = item(&menu, MenuAction::SetQuality(80));
        assert_eq!(custom.label, "Custom (80%)");
        assert_eq!(custom.checked, Some(true));
        assert_eq!(item(&menu, MenuAction::SetQuality(90)).checked, Some(false));

        // 50 is a speed preset.
        let speed = item(&menu, MenuAction::SetSpeed(50));
        assert_eq!(speed.label, "Low (50%)");
        assert_eq!(speed.checked, Some(true));
    }

    #[test]
    fn clipboard_direction_is_checked_when_active() {
        let state = ClientState {
            server_clipboard: true,
            client_clipboard_direction: ClipboardDirection::ToClient,
            ..ClientState::default()
        };
        let menu = build_tray_menu(&state);
        assert!(menu.submenu("Clipboard").unwrap().enabled);
        let to_client = item(
            &menu,
            MenuAction::SetClipboardDirection(ClipboardDirection::ToClient),
        );
        assert_eq!(to_client.checked, Some(true));
        let disabled = item(
            &menu,
            MenuAction::SetClipboardDirection(ClipboardDirection::Disabled),
        );
        assert_eq!(disabled.checked, Some(false));
    }

    #[test]
    fn scaling_checks_uniform_scale_only() {
        let menu = build_tray_menu(&ClientState::default());
        assert_eq!(item(&menu, MenuAction::SetScaling(100)).checked, Some(true));

        let stretched = ClientState {
            xscale: 1.5,
            yscale: 1.0,
            ..ClientState::default()
        };
        let menu = build_tray_menu(&stretched);
        assert_eq!(item(&menu, MenuAction::SetScaling(100)).checked, Some(false));
        assert_eq!(item(&menu, MenuAction::SetScaling(150)).checked, Some(false));
    }
}
