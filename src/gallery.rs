use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::GRID_COLUMNS;
use crate::store::PathStore;
use crate::thumbnail::Thumbnail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(u64);

#[derive(Debug, Clone)]
pub struct GalleryCell {
    pub id: CellId,
    pub path: PathBuf,
    pub thumbnail: Arc<Thumbnail>,
}

/// Where a load request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Read back from the store at startup.
    Restored,
    /// Chosen in the file dialog.
    Picked,
}

#[derive(Debug)]
struct PendingPath {
    path: PathBuf,
    origin: LoadOrigin,
}

/// The cells shown in the main window, in display order.
///
/// The persisted list is the shown cells, then restored paths that could not
/// be decoded, then paths the loader has not reported on yet.
pub struct GalleryGrid {
    cells: Vec<GalleryCell>,
    pending: Vec<PendingPath>,
    unresolved: Vec<PathBuf>,
    store: PathStore,
    next_id: u64,
    batches_in_flight: usize,
}

impl GalleryGrid {
    pub fn new(store: PathStore) -> Self {
        Self {
            cells: Vec::new(),
            pending: Vec::new(),
            unresolved: Vec::new(),
            store,
            next_id: 0,
            batches_in_flight: 0,
        }
    }

    pub fn cells(&self) -> &[GalleryCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, id: CellId) -> Option<&GalleryCell> {
        self.cells.iter().find(|c| c.id == id)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.cells.iter().map(|c| c.path.clone()).collect()
    }

    /// Everything the store should hold right now.
    pub fn stored_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.paths();
        paths.extend(self.unresolved.iter().cloned());
        paths.extend(self.pending.iter().map(|p| p.path.clone()));
        paths
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Row-major position of a cell.
    pub fn position_of(&self, id: CellId) -> Option<(usize, usize)> {
        let index = self.cells.iter().position(|c| c.id == id)?;
        Some((index / GRID_COLUMNS, index % GRID_COLUMNS))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[GalleryCell]> {
        self.cells().chunks(GRID_COLUMNS)
    }

    /// Append a cell at the next row-major slot and return its (row, col).
    pub fn add_cell(&mut self, path: PathBuf, thumbnail: Arc<Thumbnail>) -> (usize, usize) {
        self.resolve(&path);
        let index = self.cells.len();
        let id = CellId(self.next_id);
        self.next_id += 1;
        self.cells.push(GalleryCell {
            id,
            path,
            thumbnail,
        });
        (index / GRID_COLUMNS, index % GRID_COLUMNS)
    }

    /// Remove exactly the cell `id` and persist the remaining paths. Other cells
    /// showing the same path are left alone.
    pub fn delete_cell(&mut self, id: CellId) -> Option<GalleryCell> {
        let index = self.cells.iter().position(|c| c.id == id)?;
        let cell = self.cells.remove(index);
        log::info!("Removed {} from the gallery", cell.path.display());
        self.persist();
        Some(cell)
    }

    pub fn path_of(&self, id: CellId) -> Option<&Path> {
        self.cell(id).map(|c| c.path.as_path())
    }

    /// Record a load request. Picked paths are saved right away so they
    /// survive a close before the loader gets to them.
    pub fn begin_batch(&mut self, paths: &[PathBuf], origin: LoadOrigin) {
        self.batches_in_flight += 1;
        self.pending.extend(paths.iter().map(|path| PendingPath {
            path: path.clone(),
            origin,
        }));
        if origin == LoadOrigin::Picked && !paths.is_empty() {
            self.persist();
        }
    }

    /// The loader could not decode `path`. Picked paths are forgotten.
    /// Restored ones stay saved, since the file may only be unreachable for
    /// now (an unmounted drive, say).
    pub fn load_failed(&mut self, path: &Path) {
        if self.resolve(path) == Some(LoadOrigin::Restored) {
            self.unresolved.push(path.to_path_buf());
        }
    }

    fn resolve(&mut self, path: &Path) -> Option<LoadOrigin> {
        let index = self.pending.iter().position(|p| p.path == path)?;
        Some(self.pending.remove(index).origin)
    }

    /// Called once the loader has posted every cell of a request.
    pub fn finish_batch(&mut self) {
        self.batches_in_flight = self.batches_in_flight.saturating_sub(1);
        self.persist();
    }

    pub fn is_loading(&self) -> bool {
        self.batches_in_flight > 0
    }

    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.stored_paths()) {
            log::error!("{}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::tests::scratch_dir;
    use iced::widget::image::Handle;
    use pretty_assertions::assert_eq;

    pub(crate) fn dummy_thumbnail() -> Arc<Thumbnail> {
        Arc::new(Thumbnail {
            handle: Handle::from_rgba(1, 1, vec![0u8; 4]),
            width: 1,
            height: 1,
        })
    }

    fn grid(tag: &str) -> GalleryGrid {
        GalleryGrid::new(PathStore::new(scratch_dir(tag).join("image_paths.json")))
    }

    #[test]
    fn cells_fill_rows_of_five() {
        let mut grid = grid("grid-layout");
        let positions: Vec<_> = (0..7)
            .map(|i| grid.add_cell(PathBuf::from(format!("{i}.png")), dummy_thumbnail()))
            .collect();
        assert_eq!(
            positions,
            vec![(0, 0), (0, 1), (0, 2), (0, 3), (0, 4), (1, 0), (1, 1)]
        );
        assert_eq!(grid.rows().map(|r| r.len()).collect::<Vec<_>>(), vec![5, 2]);
    }

    #[test]
    fn delete_removes_cell_and_persists() {
        let mut grid = grid("grid-delete");
        grid.add_cell(PathBuf::from("a.png"), dummy_thumbnail());
        grid.add_cell(PathBuf::from("b.png"), dummy_thumbnail());
        grid.add_cell(PathBuf::from("c.png"), dummy_thumbnail());
        grid.persist();

        let b = grid.cells()[1].id;
        let removed = grid.delete_cell(b).unwrap();
        assert_eq!(removed.path, PathBuf::from("b.png"));
        assert_eq!(
            grid.store.load(),
            vec![PathBuf::from("a.png"), PathBuf::from("c.png")]
        );

        // Reloading and saving again must not bring it back.
        let reloaded = grid.store.load();
        grid.store.save(&reloaded).unwrap();
        assert!(!grid.store.load().contains(&PathBuf::from("b.png")));
    }

    #[test]
    fn delete_shifts_later_cells_up() {
        let mut grid = grid("grid-shift");
        for name in ["a", "b", "c", "d", "e", "f"] {
            grid.add_cell(PathBuf::from(name), dummy_thumbnail());
        }
        let f = grid.cells()[5].id;
        assert_eq!(grid.position_of(f), Some((1, 0)));
        grid.delete_cell(grid.cells()[0].id);
        assert_eq!(grid.position_of(f), Some((0, 4)));
    }

    #[test]
    fn delete_of_duplicate_path_removes_only_clicked_cell() {
        let mut grid = grid("grid-dup");
        grid.add_cell(PathBuf::from("a.png"), dummy_thumbnail());
        grid.add_cell(PathBuf::from("b.png"), dummy_thumbnail());
        grid.add_cell(PathBuf::from("a.png"), dummy_thumbnail());

        let second_a = grid.cells()[2].id;
        grid.delete_cell(second_a);

        assert_eq!(
            grid.paths(),
            vec![PathBuf::from("a.png"), PathBuf::from("b.png")]
        );
        assert_eq!(grid.cells()[0].path, PathBuf::from("a.png"));
        assert!(grid.cell(second_a).is_none());
        assert_eq!(grid.store.load(), grid.paths());
    }

    #[test]
    fn deleting_unknown_cell_is_a_no_op() {
        let mut grid = grid("grid-unknown");
        let id = grid.cells().first().map(|c| c.id);
        assert!(id.is_none());
        grid.add_cell(PathBuf::from("a.png"), dummy_thumbnail());
        let a = grid.cells()[0].id;
        grid.delete_cell(a);
        assert!(grid.delete_cell(a).is_none());
        assert!(grid.is_empty());
    }

    #[test]
    fn batch_bookkeeping() {
        let mut grid = grid("grid-batch");
        assert!(!grid.is_loading());
        grid.begin_batch(&[], LoadOrigin::Picked);
        grid.begin_batch(&[], LoadOrigin::Restored);
        grid.finish_batch();
        assert!(grid.is_loading());
        grid.finish_batch();
        assert!(!grid.is_loading());
        grid.finish_batch();
        assert!(!grid.is_loading());
    }

    #[test]
    fn deleting_during_a_load_keeps_paths_not_yet_shown() {
        let mut grid = grid("grid-pending");
        let a = PathBuf::from("a.png");
        let b = PathBuf::from("b.png");
        let c = PathBuf::from("c.png");
        let saved = vec![a.clone(), b.clone(), c.clone()];
        grid.store.save(&saved).unwrap();

        grid.begin_batch(&saved, LoadOrigin::Restored);
        grid.add_cell(a.clone(), dummy_thumbnail());
        grid.delete_cell(grid.cells()[0].id);
        assert!(grid.is_loading());
        assert_eq!(grid.store.load(), vec![b.clone(), c.clone()]);

        grid.add_cell(b.clone(), dummy_thumbnail());
        grid.add_cell(c.clone(), dummy_thumbnail());
        grid.finish_batch();
        assert_eq!(grid.pending_len(), 0);
        assert_eq!(grid.store.load(), vec![b, c]);
    }

    #[test]
    fn picked_paths_are_saved_before_they_load() {
        let mut grid = grid("grid-picked");
        let (x, y) = (PathBuf::from("x.png"), PathBuf::from("y.png"));

        grid.begin_batch(&[x.clone(), y.clone()], LoadOrigin::Picked);
        assert_eq!(grid.store.load(), vec![x.clone(), y.clone()]);

        grid.add_cell(x.clone(), dummy_thumbnail());
        grid.load_failed(&y);
        grid.finish_batch();
        assert_eq!(grid.store.load(), vec![x]);
    }

    #[test]
    fn restored_path_that_fails_to_decode_stays_saved() {
        let mut grid = grid("grid-unresolved");
        let gone = PathBuf::from("/mnt/usb/gone.png");
        let here = PathBuf::from("here.png");

        grid.begin_batch(&[gone.clone(), here.clone()], LoadOrigin::Restored);
        grid.load_failed(&gone);
        grid.add_cell(here.clone(), dummy_thumbnail());
        grid.finish_batch();

        assert_eq!(grid.paths(), vec![here.clone()]);
        assert_eq!(grid.stored_paths(), vec![here.clone(), gone.clone()]);
        assert_eq!(grid.store.load(), vec![here.clone(), gone.clone()]);

        grid.delete_cell(grid.cells()[0].id);
        assert_eq!(grid.store.load(), vec![gone]);
    }

    #[test]
    fn pending_duplicates_resolve_one_at_a_time() {
        let mut grid = grid("grid-pending-dup");
        let a = PathBuf::from("a.png");
        grid.begin_batch(&[a.clone(), a.clone()], LoadOrigin::Picked);
        grid.add_cell(a.clone(), dummy_thumbnail());
        assert_eq!(grid.pending_len(), 1);
        assert_eq!(grid.stored_paths(), vec![a.clone(), a]);
    }
}
