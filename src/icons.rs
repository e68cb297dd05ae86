//! Icon resource lookup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};
use winit::icon::{Icon, RgbaIcon};

/// Directories searched after the configured ones, relative to the working directory.
pub const BUILTIN_ICON_DIRS: &[&str] = &["icons", "assets/icons"];

/// Decode an image file into a window/tray icon.
pub fn load_icon(path: &Path) -> anyhow::Result<Icon> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode icon {}", path.display()))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    let rgba = image.into_raw();
    let icon = RgbaIcon::new(rgba, width, height)
        .map_err(|e| anyhow::anyhow!("invalid icon {}: {e}", path.display()))?;
    Ok(Icon::from(icon))
}

#[derive(Debug, Clone)]
pub struct IconLoader {
    dirs: Vec<PathBuf>,
}

impl IconLoader {
    /// Search `extra` first, then [`BUILTIN_ICON_DIRS`].
    pub fn new(extra: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut dirs: Vec<PathBuf> = extra.into_iter().collect();
        dirs.extend(BUILTIN_ICON_DIRS.iter().map(PathBuf::from));
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First existing file named `name`, or `name.png`, in the search directories.
    pub fn lookup(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let with_ext = format!("{name}.png");
        self.dirs
            .iter()
            .flat_map(|dir| [dir.join(name), dir.join(&with_ext)])
            .find(|path| path.is_file())
    }

    /// Find and decode `name`. A missing or broken icon is logged and yields `None`.
    pub fn load(&self, name: &str) -> Option<Icon> {
        let Some(path) = self.lookup(name) else {
            warn!(name, dirs = ?self.dirs, "icon not found");
            return None;
        };
        match load_icon(&path) {
            Ok(icon) => {
                debug!(path = %path.display(), "loaded icon");
                Some(icon)
            }
            Err(err) => {
                warn!("{err:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn write_png(path: &Path) {
        let image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        image.save(path).unwrap();
    }

    #[test]
    fn configured_dirs_come_first() {
        let loader = IconLoader::new([PathBuf::from("/opt/icons")]);
        assert_eq!(
            loader.dirs(),
            &[
                PathBuf::from("/opt/icons"),
                PathBuf::from("icons"),
                PathBuf::from("assets/icons")
            ]
        );
    }

    #[test]
    fn lookup_tries_png_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("xpra.png"));
        let loader = IconLoader::new([dir.path().to_path_buf()]);

        assert_eq!(loader.lookup("xpra"), Some(dir.path().join("xpra.png")));
        assert_eq!(loader.lookup("xpra.png"), Some(dir.path().join("xpra.png")));
        assert_eq!(loader.lookup("font"), None);
        assert_eq!(loader.lookup(""), None);
    }

    #[test]
    fn earlier_dir_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_png(&first.path().join("font.png"));
        write_png(&second.path().join("font.png"));
        let loader = IconLoader::new([first.path().to_path_buf(), second.path().to_path_buf()]);

        assert_eq!(loader.lookup("font.png"), Some(first.path().join("font.png")));
    }

    #[test]
    fn load_decodes_and_tolerates_garbage() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("ok.png"));
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();
        let loader = IconLoader::new([dir.path().to_path_buf()]);

        assert!(loader.load("ok").is_some());
        assert!(loader.load("broken").is_none());
        assert!(loader.load("absent").is_none());
        assert!(load_icon(&dir.path().join("broken.png")).is_err());
    }
}
