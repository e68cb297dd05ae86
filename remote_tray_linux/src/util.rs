use winit_core::icon::{Icon, RgbaIcon};
use zbus::zvariant::{OwnedValue, Type, Value};

/// SNI Icon structure matching the D-Bus specification.
/// Icon pixmap format: a(iiay) - Array of (width: i32, height: i32, data: Vec<u8>)
/// Data is in ARGB32 format.
#[derive(Debug, Clone, Type, Value, OwnedValue)]
pub struct SniIcon {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

/// Pixmaps advertised for `icon`. Empty when there is no icon or it is not RGBA backed, in which
/// case hosts fall back to the theme icon name.
pub(crate) fn icon_pixmaps(icon: Option<&Icon>) -> Vec<SniIcon> {
    icon.and_then(icon_to_sni_icon).into_iter().collect()
}

/// Converts RGBA pixels to ARGB32 in network byte order, as the SNI specification requires.
fn icon_to_sni_icon(icon: &Icon) -> Option<SniIcon> {
    let rgba = icon.0.cast_ref::<RgbaIcon>()?;
    let width = rgba.width();
    let height = rgba.height();

    let data = rgba
        .buffer()
        .chunks_exact(4)
        .flat_map(|px| {
            let [r, g, b, a] = [px[0], px[1], px[2], px[3]];
            [a, r, g, b]
        })
        .collect();

    Some(SniIcon {
        width: width as i32,
        height: height as i32,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_pixels_become_argb32() {
        let rgba_data = vec![
            255, 0, 0, 255, // opaque red
            0, 0, 255, 128, // translucent blue
        ];

        let icon = Icon::from(RgbaIcon::new(rgba_data, 2, 1).unwrap());
        let pixmaps = icon_pixmaps(Some(&icon));

        assert_eq!(pixmaps.len(), 1);
        let sni_icon = &pixmaps[0];
        assert_eq!((sni_icon.width, sni_icon.height), (2, 1));
        assert_eq!(sni_icon.data, vec![255, 255, 0, 0, 128, 0, 0, 255]);
    }

    #[test]
    fn no_icon_no_pixmap() {
        assert!(icon_pixmaps(None).is_empty());
    }
}
