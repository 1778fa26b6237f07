//! UI layer: the single document desk view.

pub mod app;

pub use app::DocumentDeskApp;
