use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use xcap::Monitor;
use xcap::image::{ImageEncoder, RgbaImage, codecs::png::PngEncoder, imageops};

/// Screen rectangle in virtual-desktop coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Capture the entire primary monitor as PNG bytes.
pub fn capture_primary_screen() -> Result<Vec<u8>> {
    let monitors = Monitor::all().context("Failed to enumerate monitors")?;
    let monitor = monitors.first().context("No monitor found")?;
    let image = monitor.capture_image().context("Failed to capture screen")?;
    encode_png(&image)
}

/// Capture one region as PNG bytes: grab the monitor containing it and crop.
/// A region hanging off the edge is clamped to what the monitor shows.
pub fn capture_screen_region(region: CaptureRegion) -> Result<Vec<u8>> {
    let monitors = Monitor::all().context("Failed to enumerate monitors")?;
    let monitor = monitors
        .iter()
        .find(|m| contains(m, region))
        .or(monitors.first())
        .context("No monitor found")?;

    let image = monitor.capture_image().context("Failed to capture screen")?;

    let left = (region.x - monitor.x()).max(0) as u32;
    let top = (region.y - monitor.y()).max(0) as u32;
    let width = region.width.min(image.width().saturating_sub(left));
    let height = region.height.min(image.height().saturating_sub(top));
    if width == 0 || height == 0 {
        anyhow::bail!("capture region lies outside the screen");
    }

    let cropped = imageops::crop_imm(&image, left, top, width, height).to_image();
    encode_png(&cropped)
}

fn contains(monitor: &Monitor, region: CaptureRegion) -> bool {
    region.x >= monitor.x()
        && region.y >= monitor.y()
        && region.x + region.width as i32 <= monitor.x() + monitor.width() as i32
        && region.y + region.height as i32 <= monitor.y() + monitor.height() as i32
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            xcap::image::ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;
    Ok(buffer)
}
