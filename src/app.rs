use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use iced::widget::{Space, button, column, container, image, row, scrollable, text};
use iced::{Color, Element, Length, Padding, Size, Subscription, Task, Theme, mouse, window};

use crate::config::{Config, QUEUE_TICK};
use crate::gallery::{CellId, GalleryCell, GalleryGrid, LoadOrigin};
use crate::loader::Loader;
use crate::queue::WorkQueue;
use crate::store::PathStore;
use crate::thumbnail::ThumbnailCache;
use crate::viewer::{self, Tile, ViewerState};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"];
const CELL_PADDING: f32 = 10.0;
const LABEL_COLOR: Color = Color::from_rgb(0.5, 0.5, 0.55);

fn main_window_size() -> Size {
    Size::new(1000.0, 700.0)
}

fn viewer_window_size() -> Size {
    Size::new(1000.0, 700.0)
}

fn boot() -> (Gallery, Task<Message>) {
    let config = Config::from_env();
    log::debug!("Using {:?}", config);

    let (main_window, open) = window::open(window::Settings {
        size: main_window_size(),
        ..window::Settings::default()
    });

    let queue = WorkQueue::new();
    let store = PathStore::new(config.store_path.clone());
    let saved = store.load();
    log::info!(
        "Restoring {} saved images from {}",
        saved.len(),
        store.path().display()
    );
    let cache = ThumbnailCache::with_capacity(config.thumbnail_size, config.cache_capacity);
    let loader = match Loader::spawn(cache, queue.sender()) {
        Ok(loader) => Some(loader),
        Err(e) => {
            log::error!("{}", e);
            None
        }
    };

    let mut state = Gallery {
        main_window,
        grid: GalleryGrid::new(store),
        queue,
        loader,
        viewers: HashMap::new(),
    };
    request_load(&mut state, saved, LoadOrigin::Restored);

    (state, open.discard())
}

pub fn run() -> iced::Result {
    iced::daemon(boot, update, view)
        .title(title)
        .theme(theme)
        .subscription(subscription)
        .run()
}

struct Gallery {
    main_window: window::Id,
    grid: GalleryGrid,
    queue: WorkQueue<GalleryGrid>,
    loader: Option<Loader>,
    viewers: HashMap<window::Id, Viewer>,
}

struct Viewer {
    path: PathBuf,
    viewport: Size,
    phase: ViewerPhase,
}

enum ViewerPhase {
    Loading,
    Failed,
    Ready {
        state: ViewerState,
        frame: Option<Frame>,
    },
}

/// The visible part of the current frame, ready for the image widget.
struct Frame {
    handle: image::Handle,
    padding: Padding,
}

#[derive(Debug, Clone)]
pub enum Message {
    LoadImages,
    FilesPicked(Option<Vec<PathBuf>>),
    Tick,
    OpenViewer(CellId),
    DeleteCell(CellId),
    ViewerDecoded(window::Id, Option<Arc<::image::RgbaImage>>),
    ViewerRendered(window::Id, Tile),
    ViewerInput(window::Id, ViewerInput),
    WindowResized(window::Id, Size),
    WindowClosed(window::Id),
}

#[derive(Debug, Clone, Copy)]
pub enum ViewerInput {
    CursorMoved(f32, f32),
    Pressed,
    Released,
    Wheel(f32),
}

fn subscription(state: &Gallery) -> Subscription<Message> {
    let events = iced::event::listen_with(|event, _status, window| match event {
        iced::Event::Mouse(mouse::Event::CursorMoved { position }) => Some(Message::ViewerInput(
            window,
            ViewerInput::CursorMoved(position.x, position.y),
        )),
        iced::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
            Some(Message::ViewerInput(window, ViewerInput::Pressed))
        }
        iced::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
            Some(Message::ViewerInput(window, ViewerInput::Released))
        }
        iced::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
            let y = match delta {
                mouse::ScrollDelta::Lines { y, .. } | mouse::ScrollDelta::Pixels { y, .. } => y,
            };
            Some(Message::ViewerInput(window, ViewerInput::Wheel(y)))
        }
        iced::Event::Window(window::Event::Resized(size)) => {
            Some(Message::WindowResized(window, size))
        }
        _ => None,
    });

    let closed = window::close_events().map(Message::WindowClosed);

    // Work only shows up while a load request is outstanding.
    if state.grid.is_loading() {
        Subscription::batch([
            events,
            closed,
            iced::time::every(QUEUE_TICK).map(|_| Message::Tick),
        ])
    } else {
        Subscription::batch([events, closed])
    }
}

fn update(state: &mut Gallery, message: Message) -> Task<Message> {
    match message {
        Message::LoadImages => {
            return Task::perform(pick_files(), Message::FilesPicked);
        }
        Message::FilesPicked(Some(paths)) => {
            request_load(state, paths, LoadOrigin::Picked);
        }
        Message::FilesPicked(None) => {}
        Message::Tick => {
            let ran = state.queue.run_pending(&mut state.grid);
            if ran > 0 {
                log::trace!("Ran {} queued tasks", ran);
            }
        }
        Message::OpenViewer(id) => {
            if let Some(path) = state.grid.path_of(id).map(Path::to_path_buf) {
                return open_viewer(state, path);
            }
        }
        Message::DeleteCell(id) => {
            if let Some((row, col)) = state.grid.position_of(id) {
                log::debug!("Deleting cell at row {row}, col {col}");
            }
            state.grid.delete_cell(id);
        }
        Message::ViewerDecoded(id, original) => {
            if let Some(viewer) = state.viewers.get_mut(&id) {
                viewer.phase = match original {
                    Some(original) => {
                        let view = ViewerState::new(
                            original,
                            (viewer.viewport.width, viewer.viewport.height),
                        );
                        log::debug!(
                            "Opened {} at {:?}",
                            viewer.path.display(),
                            view.original_size()
                        );
                        let frame = build_frame(&view);
                        ViewerPhase::Ready { state: view, frame }
                    }
                    None => ViewerPhase::Failed,
                };
            }
        }
        Message::ViewerRendered(id, tile) => {
            if let Some(ViewerPhase::Ready { state: view, frame }) =
                state.viewers.get_mut(&id).map(|v| &mut v.phase)
            {
                if view.finish_render(tile) {
                    log::trace!("Viewer tile is now {:?}", view.frame_size());
                    *frame = build_frame(view);
                }
                // Input that arrived meanwhile may have moved past this tile.
                return render_frame(id, view);
            }
        }
        Message::ViewerInput(id, input) => {
            if let Some(ViewerPhase::Ready { state: view, frame }) =
                state.viewers.get_mut(&id).map(|v| &mut v.phase)
            {
                match input {
                    ViewerInput::CursorMoved(x, y) => {
                        if view.cursor_moved((x, y)) {
                            *frame = build_frame(view);
                            return render_frame(id, view);
                        }
                    }
                    ViewerInput::Pressed => {
                        view.press();
                        log::trace!("Viewer {:?} is {:?}", id, view.drag_state());
                    }
                    ViewerInput::Released => {
                        view.release();
                        log::trace!("Pan ended at offset {:?}", view.offset());
                    }
                    ViewerInput::Wheel(delta) => {
                        if view.zoom(delta) {
                            if view.is_rendering() {
                                log::trace!(
                                    "Zoom to {:.3} waits for the running render",
                                    view.scale()
                                );
                            }
                            return render_frame(id, view);
                        }
                    }
                }
            }
        }
        Message::WindowResized(id, size) => {
            if let Some(viewer) = state.viewers.get_mut(&id) {
                viewer.viewport = size;
                if let ViewerPhase::Ready { state: view, frame } = &mut viewer.phase {
                    view.set_viewport(size.width, size.height);
                    *frame = build_frame(view);
                    return render_frame(id, view);
                }
            }
        }
        Message::WindowClosed(id) => {
            if id == state.main_window {
                return iced::exit();
            }
            if let Some(viewer) = state.viewers.remove(&id) {
                log::debug!("Closed viewer for {}", viewer.path.display());
            }
        }
    }
    Task::none()
}

fn request_load(state: &mut Gallery, paths: Vec<PathBuf>, origin: LoadOrigin) {
    if paths.is_empty() {
        return;
    }
    let Some(loader) = state.loader.as_ref() else {
        log::error!("Loader is not running; ignoring {} images", paths.len());
        return;
    };
    state.grid.begin_batch(&paths, origin);
    if let Err(paths) = loader.request(paths) {
        log::error!("Loader has stopped");
        for path in &paths {
            state.grid.load_failed(path);
        }
        state.grid.finish_batch();
    }
}

fn open_viewer(state: &mut Gallery, path: PathBuf) -> Task<Message> {
    let (id, open) = window::open(window::Settings {
        size: viewer_window_size(),
        ..window::Settings::default()
    });
    state.viewers.insert(
        id,
        Viewer {
            path: path.clone(),
            viewport: viewer_window_size(),
            phase: ViewerPhase::Loading,
        },
    );

    let decode = Task::perform(
        async move {
            match viewer::open_original(&path) {
                Ok(img) => Some(Arc::new(img)),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            }
        },
        move |original| Message::ViewerDecoded(id, original),
    );
    Task::batch([open.discard(), decode])
}

/// Start the viewer's next render if it needs one and none is running.
fn render_frame(id: window::Id, view: &mut ViewerState) -> Task<Message> {
    let Some(job) = view.start_render() else {
        return Task::none();
    };
    log::trace!(
        "Rendering {:?} at {:.3} for viewer {:?}",
        job.area(),
        job.scale(),
        id
    );
    Task::perform(async move { job.run() }, move |tile| {
        Message::ViewerRendered(id, tile)
    })
}

fn build_frame(view: &ViewerState) -> Option<Frame> {
    let (crop, region) = view.visible_frame()?;
    let (width, height) = crop.dimensions();
    Some(Frame {
        handle: image::Handle::from_rgba(width, height, crop.into_raw()),
        padding: Padding {
            top: region.pad_top,
            right: 0.0,
            bottom: 0.0,
            left: region.pad_left,
        },
    })
}

fn view(state: &Gallery, window: window::Id) -> Element<'_, Message> {
    if window == state.main_window {
        return gallery_view(state);
    }
    match state.viewers.get(&window) {
        Some(viewer) => viewer_view(viewer),
        None => Space::new().into(),
    }
}

fn gallery_view(state: &Gallery) -> Element<'_, Message> {
    let count = state.grid.len();
    let count_text = if state.grid.is_loading() {
        format!("{} photos, {} loading...", count, state.grid.pending_len())
    } else {
        format!("{} photos", count)
    };

    let toolbar = row![
        button("Load Images").on_press(Message::LoadImages),
        text(count_text).size(13).color(LABEL_COLOR),
    ]
    .spacing(10)
    .padding(10)
    .align_y(iced::Alignment::Center);

    let body: Element<'_, Message> = if state.grid.is_empty() {
        let hint = if state.grid.is_loading() {
            "Loading..."
        } else {
            "Load some images to get started"
        };
        container(text(hint)).center(Length::Fill).into()
    } else {
        let rows: Vec<Element<'_, Message>> = state
            .grid
            .rows()
            .map(|cells| row(cells.iter().map(cell_view)).into())
            .collect();
        scrollable(column(rows).padding(CELL_PADDING))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    };

    column![toolbar, body].into()
}

fn cell_view(cell: &GalleryCell) -> Element<'_, Message> {
    let thumb = &cell.thumbnail;
    let picture = button(
        image(thumb.handle.clone())
            .width(thumb.width as f32)
            .height(thumb.height as f32),
    )
    .on_press(Message::OpenViewer(cell.id))
    .padding(0)
    .style(button::text);

    let delete = button(text("Delete").size(13))
        .on_press(Message::DeleteCell(cell.id))
        .style(button::danger);

    column![picture, delete]
        .spacing(4)
        .padding(CELL_PADDING)
        .align_x(iced::Alignment::Center)
        .into()
}

fn viewer_view(viewer: &Viewer) -> Element<'_, Message> {
    match &viewer.phase {
        ViewerPhase::Loading => container(text("Loading...")).center(Length::Fill).into(),
        ViewerPhase::Failed => container(
            text(format!("Could not open {}", viewer.path.display())).color(LABEL_COLOR),
        )
        .center(Length::Fill)
        .into(),
        ViewerPhase::Ready {
            frame: Some(frame), ..
        } => container(image(frame.handle.clone()).content_fit(iced::ContentFit::None))
            .padding(frame.padding)
            .width(Length::Fill)
            .height(Length::Fill)
            .clip(true)
            .into(),
        ViewerPhase::Ready { frame: None, .. } => Space::new()
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
    }
}

fn title(state: &Gallery, window: window::Id) -> String {
    match state.viewers.get(&window) {
        Some(viewer) => {
            let name = viewer
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match &viewer.phase {
                ViewerPhase::Ready { state: view, .. } => {
                    format!("Zoomed image: {} ({:.0}%)", name, view.scale() * 100.0)
                }
                _ => format!("Zoomed image: {}", name),
            }
        }
        None => "Image Gallery".into(),
    }
}

fn theme(_state: &Gallery, _window: window::Id) -> Theme {
    Theme::Dark
}

async fn pick_files() -> Option<Vec<PathBuf>> {
    rfd::AsyncFileDialog::new()
        .set_title("Select images")
        .add_filter("Images", IMAGE_EXTENSIONS)
        .add_filter("All files", &["*"])
        .pick_files()
        .await
        .map(|handles| handles.iter().map(|h| h.path().to_path_buf()).collect())
}
