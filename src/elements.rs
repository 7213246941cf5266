//! Custom genpdf elements used by the PDF renderer.

use std::path::Path;

use image::GenericImageView;

use genpdf::elements::{Image, Paragraph};
use genpdf::error::{Context as _, Error};
use genpdf::style::Style;
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const DEFAULT_CAPTION_SPACING_MM: f64 = 2.0;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / dpi;
    let height_mm = MM_PER_INCH * (px_height as f64) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

/// Loads an image from the given path with descriptive errors.
///
/// The alpha channel is dropped because genpdf cannot embed transparent images.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    let decoded = reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))?;
    Ok(image::DynamicImage::ImageRgb8(decoded.to_rgb8()))
}

/// A chart caption line stacked above its image.
///
/// The image is rescaled to the requested width while keeping the aspect ratio.
pub struct ChartFigure {
    caption: Paragraph,
    image: Image,
    natural_size: Size,
    requested_width: Option<Mm>,
    spacing: Mm,
}

impl ChartFigure {
    /// Creates a figure from the image file located at `path`.
    pub fn from_path(path: impl AsRef<Path>, caption: Paragraph) -> Result<Self, Error> {
        let dynamic = decode_image_from_path(path)?;
        let natural_size = estimated_image_size(&dynamic, DEFAULT_IMAGE_DPI);
        let image = Image::from_dynamic_image(dynamic)?;
        let mut figure = Self {
            caption,
            image,
            natural_size,
            requested_width: None,
            spacing: mm_from_f64(DEFAULT_CAPTION_SPACING_MM),
        };
        figure.image.set_alignment(Alignment::Center);
        Ok(figure)
    }

    /// Constrains the rendered width and returns the updated element.
    pub fn with_width(mut self, width: impl Into<Option<Mm>>) -> Self {
        self.requested_width = width.into();
        self.apply_width();
        self
    }

    fn apply_width(&mut self) {
        let scale = match self.requested_width {
            Some(width) => {
                let natural = mm_to_f64(self.natural_size.width);
                if natural > f64::EPSILON {
                    mm_to_f64(width) / natural
                } else {
                    1.0
                }
            }
            None => 1.0,
        };
        self.image.set_scale(Scale::new(scale, scale));
    }
}

impl Element for ChartFigure {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let mut result = RenderResult::default();

        let caption_result = self.caption.render(context, area.clone(), style)?;
        result.size = result.size.stack_vertical(caption_result.size);
        result.has_more |= caption_result.has_more;

        area.add_offset(Position::new(0, caption_result.size.height + self.spacing));
        result.size = result.size.stack_vertical(Size::new(0, self.spacing));

        let image_result = self.image.render(context, area, style)?;
        result.size = result.size.stack_vertical(image_result.size);
        result.has_more |= image_result.has_more;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_size_follows_dpi() {
        let image = image::DynamicImage::new_rgb8(300, 150);
        let size = estimated_image_size(&image, DEFAULT_IMAGE_DPI);
        assert!((mm_to_f64(size.width) - 25.4).abs() < 1e-9);
        assert!((mm_to_f64(size.height) - 12.7).abs() < 1e-9);
    }

    #[test]
    fn missing_image_reports_path() {
        let err = decode_image_from_path("/__lca_report_missing__/chart.png").unwrap_err();
        assert!(err.to_string().contains("chart.png"));
    }
}
