pub mod config;
pub mod error;
pub mod events;
pub mod gallery;
pub mod tasks {
    pub mod loader;
    pub mod media;
    pub mod viewer;
}
