pub mod frame_slot;
pub mod impl_console;
pub mod impl_gui;
pub mod interface;
