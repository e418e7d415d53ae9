mod app;
mod config;
mod error;
mod gallery;
mod loader;
mod queue;
mod store;
mod thumbnail;
mod viewer;

fn main() -> iced::Result {
    env_logger::init();
    app::run()
}
