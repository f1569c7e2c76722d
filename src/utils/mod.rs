pub mod cwd_signal;
pub mod dynamic_debounce;
pub mod id_helper;
pub mod ring_buffer;
