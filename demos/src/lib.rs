//! Shared pieces of the demo programs.

use std::num::NonZeroU32;
use std::rc::Rc;

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::Window;

pub type SharedWindow = Rc<Box<dyn Window>>;

/// Install the fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Softbuffer surface filled one pixel at a time.
pub struct SurfaceRenderer {
    _context: softbuffer::Context<SharedWindow>,
    surface: softbuffer::Surface<SharedWindow, SharedWindow>,
}

impl SurfaceRenderer {
    pub fn new(window: SharedWindow) -> anyhow::Result<Self> {
        let size = window.surface_size();
        let context = softbuffer::Context::new(window.clone())
            .map_err(|e| anyhow!("failed to create softbuffer context: {e}"))?;
        let mut surface = softbuffer::Surface::new(&context, window)
            .map_err(|e| anyhow!("failed to create softbuffer surface: {e}"))?;
        surface
            .resize(
                NonZeroU32::new(size.width).unwrap_or(NonZeroU32::MIN),
                NonZeroU32::new(size.height).unwrap_or(NonZeroU32::MIN),
            )
            .map_err(|e| anyhow!("failed to size surface: {e}"))?;

        Ok(Self {
            _context: context,
            surface,
        })
    }

    /// Ignored while either dimension is zero.
    pub fn resize(&mut self, width: u32, height: u32) -> anyhow::Result<()> {
        let (Some(width), Some(height)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            return Ok(());
        };
        self.surface
            .resize(width, height)
            .map_err(|e| anyhow!("failed to resize surface: {e}"))
    }

    /// Fill the surface with `paint(x, y, width, height)`, a 0RGB colour.
    pub fn render(
        &mut self,
        width: u32,
        height: u32,
        paint: impl Fn(usize, usize, usize, usize) -> u32,
    ) -> anyhow::Result<()> {
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 {
            return Ok(());
        }

        let mut buffer = self
            .surface
            .buffer_mut()
            .map_err(|e| anyhow!("failed to map surface buffer: {e}"))?;
        for y in 0..height {
            for x in 0..width {
                buffer[y * width + x] = paint(x, y, width, height);
            }
        }
        buffer
            .present()
            .map_err(|e| anyhow!("failed to present surface: {e}"))
    }
}

/// Contents of the text-entry demo's single entry field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    text: String,
}

impl TextEntry {
    pub const TITLE: &'static str = "Text Entry";

    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            text: initial.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Append typed text. Control characters are dropped.
    pub fn insert(&mut self, typed: &str) -> bool {
        let before = self.text.len();
        self.text.extend(typed.chars().filter(|c| !c.is_control()));
        self.text.len() != before
    }

    pub fn backspace(&mut self) -> bool {
        self.text.pop().is_some()
    }

    pub fn window_title(&self) -> String {
        format!("{}: {}", Self::TITLE, self.text)
    }
}

impl Default for TextEntry {
    fn default() -> Self {
        Self::new("hello")
    }
}

/// Ctrl+W, Ctrl+F4 and Escape close the window.
pub fn is_close_accelerator(key: &Key, modifiers: ModifiersState) -> bool {
    match key {
        Key::Named(NamedKey::Escape) => true,
        Key::Named(NamedKey::F4) => modifiers.control_key(),
        Key::Character(c) => modifiers.control_key() && c.eq_ignore_ascii_case("w"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_edits_and_mirrors_title() {
        let mut entry = TextEntry::default();
        assert_eq!(entry.text(), "hello");
        assert_eq!(entry.window_title(), "Text Entry: hello");

        assert!(entry.insert(" world"));
        assert!(!entry.insert("\r"));
        assert_eq!(entry.text(), "hello world");

        assert!(entry.backspace());
        assert_eq!(entry.window_title(), "Text Entry: hello worl");

        let mut empty = TextEntry::new("");
        assert!(!empty.backspace());
    }

    #[test]
    fn close_accelerators() {
        let none = ModifiersState::empty();
        let ctrl = ModifiersState::CONTROL;

        assert!(is_close_accelerator(&Key::Named(NamedKey::Escape), none));
        assert!(is_close_accelerator(&Key::Named(NamedKey::F4), ctrl));
        assert!(!is_close_accelerator(&Key::Named(NamedKey::F4), none));
        assert!(is_close_accelerator(&Key::Character("w".into()), ctrl));
        assert!(is_close_accelerator(&Key::Character("W".into()), ctrl));
        assert!(!is_close_accelerator(&Key::Character("w".into()), none));
        assert!(!is_close_accelerator(&Key::Character("q".into()), ctrl));
    }
}
