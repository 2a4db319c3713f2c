//! View layer
//!
//! Format templates, the scrollback windows and the two printers.

pub mod components;
pub mod display;
pub mod scrollbar;
pub mod text_printer;
pub mod viewport;
pub mod vterm;
