pub mod status_reader;
pub mod terminal_buffer;
pub mod terminal_modes;
pub mod time_source;
pub mod tracing_setup;
