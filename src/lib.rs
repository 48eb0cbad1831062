pub mod app;
pub mod logwatch;
