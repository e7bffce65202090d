//! Inline graphics handed to the screen by the sixel and iTerm2 paths.

/// Unique identifier for every graphic added to a grid.
#[derive(Eq, PartialEq, Clone, Copy, Debug, PartialOrd, Ord, Hash)]
pub struct GraphicId(pub u64);

/// Specifies the format of the pixel data.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum ColorType {
    /// 3 bytes per pixel (red, green, blue).
    Rgb,
    /// 4 bytes per pixel (red, green, blue, alpha).
    Rgba,
}

/// Raster data for an inline graphic.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphicData {
    /// Graphics identifier.
    pub id: GraphicId,

    /// Width, in pixels, of the graphic.
    pub width: usize,

    /// Height, in pixels, of the graphic.
    pub height: usize,

    /// Format of the pixel data.
    pub color_type: ColorType,

    /// Pixels data.
    pub pixels: Vec<u8>,

    /// Indicate if there are no transparent pixels.
    pub is_opaque: bool,
}

impl GraphicData {
    /// Create a graphic from a decoded image, preserving an RGB buffer
    /// when the source has no alpha channel.
    pub fn from_dynamic_image(id: GraphicId, image: image::DynamicImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;

        match image {
            image::DynamicImage::ImageRgb8(image) => Self {
                id,
                width,
                height,
                color_type: ColorType::Rgb,
                pixels: image.into_raw(),
                is_opaque: true,
            },
            image => Self {
                id,
                width,
                height,
                color_type: ColorType::Rgba,
                pixels: image.into_rgba8().into_raw(),
                is_opaque: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_image_stays_packed() {
        let buffer = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let graphic = GraphicData::from_dynamic_image(
            GraphicId(7),
            image::DynamicImage::ImageRgb8(buffer),
        );

        assert_eq!(graphic.width, 3);
        assert_eq!(graphic.height, 2);
        assert_eq!(graphic.color_type, ColorType::Rgb);
        assert_eq!(graphic.pixels.len(), 3 * 2 * 3);
        assert!(graphic.is_opaque);
    }
}
