use crate::assets::AssetSource;
use crate::error::SetupError;
use crate::paint::color::premultiply_rgba8;

use super::backend::{FilterMode, GraphicsBackend, TextureHandle, TextureImage};

/// Decoded, premultiplied RGBA8 pixels with a top-left origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// Decodes an encoded raster image (PNG, JPEG, BMP).
pub fn decode(name: &str, bytes: &[u8]) -> Result<DecodedImage, SetupError> {
    let img = image::load_from_memory(bytes).map_err(|source| SetupError::Decode {
        name: name.to_owned(),
        source,
    })?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = rgba.into_raw();
    premultiply_rgba8(&mut pixels);

    debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);

    Ok(DecodedImage {
        width,
        height,
        pixels,
    })
}

/// Loads `textures/<name>` and uploads it as a 2-D texture.
///
/// Minification is nearest-neighbor with a single mip level; magnification
/// keeps the linear default. The decoded pixels are released as soon as the
/// upload returns, whether it succeeded or not.
pub fn load<B: GraphicsBackend>(
    backend: &mut B,
    assets: &dyn AssetSource,
    name: &str,
) -> Result<TextureHandle, SetupError> {
    let bytes = assets.load(&format!("textures/{name}"))?;

    let handle = {
        let decoded = decode(name, &bytes)?;
        backend.create_texture(&TextureImage {
            width: decoded.width,
            height: decoded.height,
            pixels: &decoded.pixels,
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Linear,
        })
    }?;

    log::info!("loaded texture `{name}`");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::assets::MemoryAssets;
    use crate::render::testing::{png, Call, RecordingBackend};

    #[test]
    fn decode_yields_tightly_packed_rgba() {
        let img = decode("t.png", &png(3, 2, [10, 20, 30, 255])).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.pixels.len(), 3 * 2 * 4);
        assert_eq!(&img.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn decode_premultiplies_alpha() {
        let img = decode("t.png", &png(1, 1, [255, 255, 255, 51])).unwrap();
        assert_eq!(img.pixels, vec![51, 51, 51, 51]);
    }

    #[test]
    fn decode_keeps_top_left_origin() {
        let mut src = image::RgbaImage::from_pixel(1, 2, image::Rgba([0, 0, 0, 255]));
        src.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Cursor::new(Vec::new());
        src.write_to(&mut bytes, image::ImageFormat::Png).unwrap();

        let img = decode("t.png", bytes.get_ref()).unwrap();
        assert_eq!(&img.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode("broken.png", b"definitely not a png").unwrap_err();
        assert!(matches!(err, SetupError::Decode { ref name, .. } if name == "broken.png"));
    }

    #[test]
    fn load_uploads_with_nearest_minification() {
        let assets = MemoryAssets::new().with("textures/floor.png", png(4, 4, [1, 2, 3, 255]));
        let mut backend = RecordingBackend::default();

        let handle = load(&mut backend, &assets, "floor.png").unwrap();

        assert_eq!(
            backend.calls(),
            &[Call::CreateTexture {
                handle,
                width: 4,
                height: 4,
                min_filter: FilterMode::Nearest,
            }]
        );
    }

    #[test]
    fn missing_asset_touches_nothing() {
        let mut backend = RecordingBackend::default();
        let err = load(&mut backend, &MemoryAssets::new(), "fish.png").unwrap_err();
        assert!(matches!(err, SetupError::AssetNotFound { .. }));
        assert!(backend.calls().is_empty());
    }
}
