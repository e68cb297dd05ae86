use std::rc::Rc;

use remote_tray_core::{ClientCapabilities, MouseButton, TrayMenu};
use tracing::{debug, info};

use crate::menu_builder::build_tray_menu;

/// Builds the tray menu and shows it in response to tray clicks.
pub trait MenuHelper: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Build the menu handle. Called once, before any tray backend is constructed.
    fn build(&mut self) -> anyhow::Result<Rc<TrayMenu>>;

    /// Primary-button action on the tray icon.
    fn activate(&self, button: MouseButton, time: u32);

    /// Show the context menu.
    fn popup(&self, button: MouseButton, time: u32);
}

type HelperConstructor<'a> =
    Box<dyn Fn(&dyn ClientCapabilities) -> anyhow::Result<Box<dyn MenuHelper>> + 'a>;

/// A menu helper candidate.
pub struct MenuHelperFactory<'a> {
    pub name: &'static str,
    /// Evaluated before construction is attempted.
    pub available: fn() -> bool,
    construct: HelperConstructor<'a>,
}

impl std::fmt::Debug for MenuHelperFactory<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuHelperFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<'a> MenuHelperFactory<'a> {
    pub fn new(
        name: &'static str,
        available: fn() -> bool,
        construct: impl Fn(&dyn ClientCapabilities) -> anyhow::Result<Box<dyn MenuHelper>> + 'a,
    ) -> Self {
        Self {
            name,
            available,
            construct: Box::new(construct),
        }
    }

    pub fn construct(
        &self,
        client: &dyn ClientCapabilities,
    ) -> anyhow::Result<Box<dyn MenuHelper>> {
        (self.construct)(client)
    }
}

/// Menu helpers in priority order.
///
/// None of the supported platforms has a native menu helper, so only the toolkit one is listed.
pub fn default_menu_helpers<'a>() -> Vec<MenuHelperFactory<'a>> {
    vec![ToolkitMenuHelper::factory()]
}

/// Portable menu helper: the menu is rendered from the client state and shown in the log.
#[derive(Debug)]
pub struct ToolkitMenuHelper {
    menu: Rc<TrayMenu>,
}

impl ToolkitMenuHelper {
    pub const NAME: &'static str = "toolkit";

    pub fn new(client: &dyn ClientCapabilities) -> Self {
        Self {
            menu: Rc::new(build_tray_menu(client)),
        }
    }

    pub fn factory<'a>() -> MenuHelperFactory<'a> {
        MenuHelperFactory::new(Self::NAME, || true, |client| {
            Ok(Box::new(ToolkitMenuHelper::new(client)) as Box<dyn MenuHelper>)
        })
    }

    fn show(&self, reason: &str, button: MouseButton, time: u32) {
        info!(?button, time, title = self.menu.title(), "{reason}");
        for line in self.menu.render() {
            debug!("  {line}");
        }
    }
}

impl MenuHelper for ToolkitMenuHelper {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn build(&mut self) -> anyhow::Result<Rc<TrayMenu>> {
        Ok(self.menu.clone())
    }

    fn activate(&self, button: MouseButton, time: u32) {
        self.show("tray menu activated", button, time);
    }

    fn popup(&self, button: MouseButton, time: u32) {
        self.show("tray menu popup", button, time);
    }
}

#[cfg(test)]
mod tests {
    use remote_tray_core::{ClientState, MenuAction};

    use super::*;

    #[test]
    fn toolkit_helper_builds_shared_menu() {
        let factory = ToolkitMenuHelper::factory();
        assert!((factory.available)());

        let mut helper = factory.construct(&ClientState::default()).unwrap();
        assert_eq!(helper.name(), ToolkitMenuHelper::NAME);

        let first = helper.build().unwrap();
        let second = helper.build().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(first.item(&MenuAction::Disconnect).is_some());
    }
}
