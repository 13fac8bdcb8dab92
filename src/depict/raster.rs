//! SVG to PNG.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use resvg::tiny_skia::{self, Pixmap};
use resvg::usvg::{self, fontdb};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to parse SVG: {0}")]
    Svg(String),
    #[error("cannot allocate a {width}x{height} image")]
    Allocation { width: u32, height: u32 },
    #[error("invalid DPI {0}")]
    InvalidDpi(u32),
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// system fonts are only scanned once per process
fn fonts() -> Arc<fontdb::Database> {
    static FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
    FONTS
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            Arc::new(db)
        })
        .clone()
}

pub fn rasterize(svg: &str) -> Result<Pixmap, RasterError> {
    let opt = usvg::Options {
        fontdb: fonts(),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| RasterError::Svg(e.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height()).ok_or(
        RasterError::Allocation {
            width: size.width(),
            height: size.height(),
        },
    )?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());
    Ok(pixmap)
}

/// write `pixmap` to `path`, recording `dpi` in a pHYs chunk when given
pub fn save_png(
    pixmap: &Pixmap,
    path: impl AsRef<Path>,
    dpi: Option<u32>,
) -> Result<(), RasterError> {
    let Some(dpi) = dpi else {
        return pixmap
            .save_png(path)
            .map_err(|e| RasterError::Encode(e.to_string()));
    };
    if dpi == 0 {
        return Err(RasterError::InvalidDpi(dpi));
    }
    let pixels_per_meter = (dpi as f64 / 0.0254).round() as u32;

    let file = File::create(path)?;
    let mut encoder =
        png::Encoder::new(BufWriter::new(file), pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: pixels_per_meter,
        yppu: pixels_per_meter,
        unit: png::Unit::Meter,
    }));

    // tiny-skia keeps premultiplied alpha, PNG wants it straight
    let data: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    let encode = |e: png::EncodingError| RasterError::Encode(e.to_string());
    let mut writer = encoder.write_header().map_err(encode)?;
    writer.write_image_data(&data).map_err(encode)?;
    writer.finish().map_err(encode)?;
    Ok(())
}
