pub mod app;
pub mod draw;
pub mod gallery;
pub mod modal;
pub mod search;
pub mod session;
