//! Menu types for tray context menus.

use crate::client::ClipboardDirection;

/// A clickable menu item with a generic ID type.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem<T> {
    /// Unique identifier for this menu item.
    pub id: T,
    /// Text label displayed for this item.
    pub label: String,
    /// Whether this item is enabled (clickable).
    pub enabled: bool,
    /// Check state: `None` = not checkable, `Some(bool)` = checkable with state.
    pub checked: Option<bool>,
    /// Icon resource name displayed next to the label.
    pub icon_name: Option<String>,
}

impl<T> MenuItem<T> {
    /// Create a new menu item with the given ID and label.
    pub fn new(id: T, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            enabled: true,
            checked: None,
            icon_name: None,
        }
    }

    /// Set whether this item is enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Make this item checkable with the given initial state.
    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn icon_name(mut self, icon_name: impl Into<String>) -> Self {
        self.icon_name = Some(icon_name.into());
        self
    }
}

/// A submenu containing nested menu entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Submenu<T> {
    pub label: String,
    pub enabled: bool,
    pub items: Vec<MenuEntry<T>>,
}

impl<T> Submenu<T> {
    pub fn new(label: impl Into<String>, items: Vec<MenuEntry<T>>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            items,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// An entry in a menu, which can be an item, submenu, or separator.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuEntry<T> {
    Item(MenuItem<T>),
    Submenu(Submenu<T>),
    Separator,
}

/// Commands a tray menu item can trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    SessionInfo,
    ToggleBell,
    ToggleCursors,
    ToggleNotifications,
    ToggleReadOnly,
    ToggleModalWindows,
    ToggleSharing,
    ToggleLock,
    SetClipboardDirection(ClipboardDirection),
    SetEncoding(String),
    SetQuality(u8),
    SetSpeed(u8),
    /// Scale factor in percent.
    SetScaling(u16),
    /// Limit in Mbps, `0` for unlimited.
    SetBandwidthLimit(u32),
    ToggleSpeaker,
    ToggleMicrophone,
    ToggleAvSync,
    ToggleWebcam,
    ToggleOpenGl,
    StartNewCommand,
    ShowServerCommands,
    ShowXdgMenu,
    UploadFile,
    DownloadServerLog,
    Disconnect,
}

/// A built tray menu. Shared read-only between the coordinator and the attached backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TrayMenu {
    title: String,
    entries: Vec<MenuEntry<MenuAction>>,
}

impl TrayMenu {
    pub fn new(title: impl Into<String>, entries: Vec<MenuEntry<MenuAction>>) -> Self {
        Self {
            title: title.into(),
            entries,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> &[MenuEntry<MenuAction>] {
        &self.entries
    }

    /// Find the item bound to `action`, searching submenus depth-first.
    pub fn item(&self, action: &MenuAction) -> Option<&MenuItem<MenuAction>> {
        fn search<'a>(
            entries: &'a [MenuEntry<MenuAction>],
            action: &MenuAction,
        ) -> Option<&'a MenuItem<MenuAction>> {
            entries.iter().find_map(|entry| match entry {
                MenuEntry::Item(item) if item.id == *action => Some(item),
                MenuEntry::Submenu(submenu) => search(&submenu.items, action),
                _ => None,
            })
        }
        search(&self.entries, action)
    }

    pub fn submenu(&self, label: &str) -> Option<&Submenu<MenuAction>> {
        self.entries.iter().find_map(|entry| match entry {
            MenuEntry::Submenu(submenu) if submenu.label == label => Some(submenu),
            _ => None,
        })
    }

    /// One line per entry, indented by depth. `[x]`/`[ ]` mark checkable items and a trailing
    /// `(disabled)` marks insensitive ones.
    pub fn render(&self) -> Vec<String> {
        fn walk(entries: &[MenuEntry<MenuAction>], depth: usize, out: &mut Vec<String>) {
            let indent = "  ".repeat(depth);
            for entry in entries {
                match entry {
                    MenuEntry::Item(item) => {
                        let check = match item.checked {
                            Some(true) => "[x] ",
                            Some(false) => "[ ] ",
                            None => "",
                        };
                        let state = if item.enabled { "" } else { " (disabled)" };
                        out.push(format!("{indent}{check}{}{state}", item.label));
                    }
                    MenuEntry::Submenu(submenu) => {
                        let state = if submenu.enabled { "" } else { " (disabled)" };
                        out.push(format!("{indent}{} >{state}", submenu.label));
                        walk(&submenu.items, depth + 1, out);
                    }
                    MenuEntry::Separator => out.push(format!("{indent}----")),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.entries, 0, &mut out);
        out
    }
}
