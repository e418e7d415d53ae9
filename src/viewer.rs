use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::error::{GalleryError, Result};

pub const ZOOM_STEP: f32 = 1.1;
pub const MIN_SCALE: f32 = 0.05;
pub const MAX_SCALE: f32 = 20.0;

/// Decode the full-resolution image for a viewer window.
pub fn open_original(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|source| GalleryError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}

pub fn scaled_size(dimensions: (u32, u32), scale: f32) -> (u32, u32) {
    let w = (dimensions.0 as f32 * scale).round().max(1.0) as u32;
    let h = (dimensions.1 as f32 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Rectangle in scaled-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    fn right(&self) -> u32 {
        self.x + self.width
    }

    fn bottom(&self) -> u32 {
        self.y + self.height
    }

    fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A rendered piece of the scaled image, placed at (`x`, `y`) in scaled
/// coordinates.
#[derive(Debug, Clone)]
pub struct Tile {
    pub scale: f32,
    pub x: u32,
    pub y: u32,
    pub image: Arc<RgbaImage>,
}

impl Tile {
    pub fn rect(&self) -> Rect {
        let (width, height) = self.image.dimensions();
        Rect {
            x: self.x,
            y: self.y,
            width,
            height,
        }
    }
}

/// One pending render: the part of the scaled image to produce and the
/// original to produce it from.
#[derive(Debug, Clone)]
pub struct RenderJob {
    original: Arc<RgbaImage>,
    scale: f32,
    area: Rect,
}

impl RenderJob {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Crop the original to the source pixels under `area` and resize only
    /// that crop. The tile is snapped outward to whole source pixels, so it
    /// may overhang `area` by up to one source pixel on each side.
    pub fn run(&self) -> Tile {
        let (ow, oh) = self.original.dimensions();
        let s = self.scale;
        let sx0 = ((self.area.x as f32 / s).floor() as u32).min(ow - 1);
        let sy0 = ((self.area.y as f32 / s).floor() as u32).min(oh - 1);
        let sx1 = ((self.area.right() as f32 / s).ceil() as u32).min(ow).max(sx0 + 1);
        let sy1 = ((self.area.bottom() as f32 / s).ceil() as u32).min(oh).max(sy0 + 1);

        let source =
            imageops::crop_imm(self.original.as_ref(), sx0, sy0, sx1 - sx0, sy1 - sy0).to_image();
        let x = (sx0 as f32 * s).round() as u32;
        let y = (sy0 as f32 * s).round() as u32;
        let width = ((sx1 as f32 * s).round() as u32).saturating_sub(x).max(1);
        let height = ((sy1 as f32 * s).round() as u32).saturating_sub(y).max(1);

        let image = if source.dimensions() == (width, height) {
            source
        } else {
            imageops::resize(&source, width, height, FilterType::Lanczos3)
        };
        Tile {
            scale: s,
            x,
            y,
            image: Arc::new(image),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last: (f32, f32) },
}

/// Part of the current tile that falls inside the window. Window area with
/// no tile under it on the left or top shows up as padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub pad_left: f32,
    pub pad_top: f32,
}

/// Zoom and pan state of one viewer window.
///
/// The scaled image is never materialised in full. Only a tile covering the
/// window plus one window-sized margin on every side is rendered, and at most
/// one render per viewer runs at a time.
pub struct ViewerState {
    original: Arc<RgbaImage>,
    scale: f32,
    tile: Tile,
    rendering: bool,
    /// Viewport origin in scaled-image coordinates.
    offset: (f32, f32),
    viewport: (f32, f32),
    cursor: Option<(f32, f32)>,
    drag: DragState,
}

impl ViewerState {
    pub fn new(original: Arc<RgbaImage>, viewport: (f32, f32)) -> Self {
        Self {
            tile: Tile {
                scale: 1.0,
                x: 0,
                y: 0,
                image: original.clone(),
            },
            original,
            scale: 1.0,
            rendering: false,
            offset: (0.0, 0.0),
            viewport,
            cursor: None,
            drag: DragState::Idle,
        }
    }

    pub fn original_size(&self) -> (u32, u32) {
        self.original.dimensions()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> (f32, f32) {
        self.offset
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// Size of the whole image at the current scale.
    pub fn target_size(&self) -> (u32, u32) {
        scaled_size(self.original.dimensions(), self.scale)
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.tile.image.dimensions()
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Apply one wheel step. Positive delta zooms in. Returns `true` when the
    /// scale changed.
    pub fn zoom(&mut self, delta: f32) -> bool {
        let next = if delta > 0.0 {
            self.scale * ZOOM_STEP
        } else if delta < 0.0 {
            self.scale / ZOOM_STEP
        } else {
            return false;
        };
        let next = next.clamp(MIN_SCALE, MAX_SCALE);
        if next == self.scale {
            return false;
        }
        self.scale = next;
        true
    }

    /// Part of the scaled image inside the window, if any.
    fn visible_area(&self) -> Option<Rect> {
        let (sw, sh) = self.target_size();
        let (ox, oy) = self.offset;
        let x0 = ox.max(0.0).floor();
        let y0 = oy.max(0.0).floor();
        let x1 = (ox + self.viewport.0).min(sw as f32).ceil();
        let y1 = (oy + self.viewport.1).min(sh as f32).ceil();
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// The current tile is for another scale or no longer covers the window.
    pub fn needs_render(&self) -> bool {
        match self.visible_area() {
            Some(area) => self.tile.scale != self.scale || !self.tile.rect().contains(&area),
            None => false,
        }
    }

    /// Hand out the next render, unless one is already running or the current
    /// tile still covers the window. Call again after every
    /// [`finish_render`](Self::finish_render) to catch up with the latest
    /// scale and offset.
    pub fn start_render(&mut self) -> Option<RenderJob> {
        let (ow, oh) = self.original.dimensions();
        if self.rendering || ow == 0 || oh == 0 || !self.needs_render() {
            return None;
        }
        let visible = self.visible_area()?;
        let (sw, sh) = self.target_size();
        let margin_x = self.viewport.0.max(0.0).ceil() as u32;
        let margin_y = self.viewport.1.max(0.0).ceil() as u32;
        let x0 = visible.x.saturating_sub(margin_x);
        let y0 = visible.y.saturating_sub(margin_y);
        let x1 = visible.right().saturating_add(margin_x).min(sw);
        let y1 = visible.bottom().saturating_add(margin_y).min(sh);
        self.rendering = true;
        Some(RenderJob {
            original: self.original.clone(),
            scale: self.scale,
            area: Rect {
                x: x0,
                y: y0,
                width: x1 - x0,
                height: y1 - y0,
            },
        })
    }

    /// Install a finished tile. Tiles for a scale that has since changed are
    /// dropped. Either way the viewer is free to start the next render.
    pub fn finish_render(&mut self, tile: Tile) -> bool {
        self.rendering = false;
        if tile.scale != self.scale {
            return false;
        }
        self.tile = tile;
        true
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    pub fn press(&mut self) {
        if let Some(anchor) = self.cursor {
            self.drag = DragState::Dragging { last: anchor };
        }
    }

    pub fn release(&mut self) {
        self.drag = DragState::Idle;
    }

    /// Track the cursor. While dragging, the image follows the cursor 1:1.
    /// Returns `true` when the viewport moved.
    pub fn cursor_moved(&mut self, position: (f32, f32)) -> bool {
        self.cursor = Some(position);
        let DragState::Dragging { last } = self.drag else {
            return false;
        };
        let dx = position.0 - last.0;
        let dy = position.1 - last.1;
        self.drag = DragState::Dragging { last: position };
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        self.offset.0 -= dx;
        self.offset.1 -= dy;
        true
    }

    pub fn visible_region(&self) -> Option<Region> {
        let tile = self.tile.rect();
        let (ox, oy) = self.offset;
        let left = ox.max(tile.x as f32);
        let top = oy.max(tile.y as f32);
        let right = (ox + self.viewport.0).min(tile.right() as f32);
        let bottom = (oy + self.viewport.1).min(tile.bottom() as f32);
        if right <= left || bottom <= top {
            return None;
        }
        let x = ((left - tile.x as f32).round() as u32).min(tile.width - 1);
        let y = ((top - tile.y as f32).round() as u32).min(tile.height - 1);
        let width = ((right - left).round() as u32).min(tile.width - x);
        let height = ((bottom - top).round() as u32).min(tile.height - y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Region {
            x,
            y,
            width,
            height,
            pad_left: (left - ox).round(),
            pad_top: (top - oy).round(),
        })
    }

    /// Crop of the current tile covering the window.
    pub fn visible_frame(&self) -> Option<(RgbaImage, Region)> {
        let region = self.visible_region()?;
        let crop = imageops::crop_imm(
            self.tile.image.as_ref(),
            region.x,
            region.y,
            region.width,
            region.height,
        )
        .to_image();
        Some((crop, region))
    }
}
