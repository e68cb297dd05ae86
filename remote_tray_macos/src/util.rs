use objc2::AllocAnyThread;
use objc2::rc::Retained;
use objc2_app_kit::NSImage;
use objc2_core_foundation::CGRect;
use objc2_foundation::{NSData, NSSize};
use remote_tray_core::TrayGeometry;
use winit_core::icon::{Icon, RgbaIcon};

/// Menu bar icon height, in points.
const ICON_HEIGHT: f64 = 18.0;

/// Converts a winit Icon to an NSImage scaled for the menu bar.
pub(crate) fn icon_to_nsimage(icon: &Icon) -> Option<Retained<NSImage>> {
    let rgba = icon.0.cast_ref::<RgbaIcon>()?;
    let (width, height) = (rgba.width(), rgba.height());

    let png_data = rgba_to_png(rgba.buffer(), width, height)?;
    let nsdata = NSData::from_vec(png_data);
    let nsimage = NSImage::initWithData(NSImage::alloc(), &nsdata)?;

    let icon_width = width as f64 * ICON_HEIGHT / height.max(1) as f64;
    nsimage.setSize(NSSize::new(icon_width, ICON_HEIGHT));
    Some(nsimage)
}

fn rgba_to_png(rgba: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    use std::io::Cursor;

    let mut png = Vec::new();
    {
        let mut encoder = png::Encoder::new(Cursor::new(&mut png), width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().ok()?;
        writer.write_image_data(rgba).ok()?;
    }
    Some(png)
}

/// AppKit measures from the bottom-left of the main screen in points; trays report physical
/// pixels from the top-left.
pub(crate) fn to_top_left_y(y: f64, height: f64, screen_height: f64) -> f64 {
    screen_height - (y + height)
}

pub(crate) fn frame_to_geometry(frame: CGRect, scale: f64, screen_height: f64) -> TrayGeometry {
    let top = to_top_left_y(frame.origin.y, frame.size.height, screen_height);
    TrayGeometry::new(
        (frame.origin.x * scale).round() as i32,
        (top * scale).round() as i32,
        (frame.size.width * scale).round().max(0.0) as u32,
        (frame.size.height * scale).round().max(0.0) as u32,
    )
}
