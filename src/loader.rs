use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use crate::error::{GalleryError, Result};
use crate::gallery::GalleryGrid;
use crate::queue::QueueSender;
use crate::thumbnail::ThumbnailCache;

/// Single background worker that decodes thumbnails for load requests and
/// hands the results to the UI through the work queue.
///
/// The worker owns the [`ThumbnailCache`]; nothing else touches it.
pub struct Loader {
    requests: mpsc::Sender<Vec<PathBuf>>,
}

impl Loader {
    pub fn spawn(mut cache: ThumbnailCache, queue: QueueSender<GalleryGrid>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Vec<PathBuf>>();
        thread::Builder::new()
            .name("thumbnail-loader".into())
            .spawn(move || {
                for batch in rx {
                    load_batch(&mut cache, &queue, batch);
                }
                log::debug!("Loader shutting down");
            })
            .map_err(GalleryError::Spawn)?;
        Ok(Self { requests: tx })
    }

    /// Queue `paths` for loading. Every path is reported back to the grid as
    /// added or failed, in the given order, and the grid is persisted once the
    /// whole request has been handled. Hands the paths back if the worker is
    /// gone.
    pub fn request(&self, paths: Vec<PathBuf>) -> std::result::Result<(), Vec<PathBuf>> {
        self.requests.send(paths).map_err(|e| e.0)
    }
}

fn load_batch(cache: &mut ThumbnailCache, queue: &QueueSender<GalleryGrid>, batch: Vec<PathBuf>) {
    log::debug!("Loading {} images", batch.len());
    let mut loaded = 0;
    for path in batch {
        let hit = cache.contains(&path);
        match cache.get_or_create(&path) {
            Ok(thumbnail) => {
                loaded += 1;
                log::trace!("Thumbnail for {} (cached: {})", path.display(), hit);
                queue.enqueue(move |grid| {
                    let (row, col) = grid.add_cell(path, thumbnail);
                    log::trace!("Cell added at row {row}, col {col}");
                });
            }
            Err(e) => {
                log::warn!("{}; skipping", e);
                queue.enqueue(move |grid| grid.load_failed(&path));
            }
        }
    }
    log::info!("Loaded {} images ({} cached)", loaded, cache.len());
    queue.enqueue(|grid| grid.finish_batch());
}
