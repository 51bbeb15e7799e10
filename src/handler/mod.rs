pub mod devices;
pub mod send_push;
