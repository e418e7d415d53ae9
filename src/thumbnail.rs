use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use iced::widget::image::Handle;
use image::GenericImageView;
use image::imageops::FilterType;

use crate::error::{GalleryError, Result};

/// A decoded, resized, display-ready copy of a source image.
#[derive(Debug)]
pub struct Thumbnail {
    pub handle: Handle,
    pub width: u32,
    pub height: u32,
}

/// Decode `path` and resize it to exactly `size`, ignoring the aspect ratio.
pub fn decode_thumbnail(path: &Path, size: (u32, u32)) -> Result<Thumbnail> {
    let img = image::open(path).map_err(|source| GalleryError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let thumb = img.resize_exact(size.0, size.1, FilterType::Lanczos3);
    let (width, height) = thumb.dimensions();
    Ok(Thumbnail {
        handle: Handle::from_rgba(width, height, thumb.to_rgba8().into_raw()),
        width,
        height,
    })
}

/// Path -> thumbnail map. Unbounded unless built with a capacity, in which case
/// the least recently used entry is dropped once the capacity is exceeded.
pub struct ThumbnailCache {
    size: (u32, u32),
    capacity: Option<usize>,
    entries: HashMap<PathBuf, Arc<Thumbnail>>,
    // Front is least recently used. Only maintained when `capacity` is set.
    recency: VecDeque<PathBuf>,
}

impl ThumbnailCache {
    pub fn with_capacity(size: (u32, u32), capacity: Option<usize>) -> Self {
        Self {
            size,
            capacity: capacity.filter(|&c| c > 0),
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Return the cached thumbnail for `path`, decoding it on a miss.
    /// A hit returns the same `Arc` every time.
    pub fn get_or_create(&mut self, path: &Path) -> Result<Arc<Thumbnail>> {
        if let Some(thumb) = self.entries.get(path).cloned() {
            self.touch(path);
            return Ok(thumb);
        }

        let thumb = Arc::new(decode_thumbnail(path, self.size)?);
        self.entries.insert(path.to_path_buf(), thumb.clone());
        if let Some(capacity) = self.capacity {
            self.recency.push_back(path.to_path_buf());
            while self.entries.len() > capacity {
                let Some(oldest) = self.recency.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
                log::debug!("Evicted thumbnail {}", oldest.display());
            }
        }
        Ok(thumb)
    }

    fn touch(&mut self, path: &Path) {
        if self.capacity.is_none() {
            return;
        }
        if let Some(pos) = self.recency.iter().position(|p| p == path) {
            if let Some(p) = self.recency.remove(pos) {
                self.recency.push_back(p);
            }
        }
    }
}
