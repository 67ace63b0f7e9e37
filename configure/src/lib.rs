pub mod app;
pub mod display;
pub mod opt;
pub mod run;
