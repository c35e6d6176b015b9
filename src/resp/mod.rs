// RESP front end: decodes commands and maps them onto the queue registry

pub mod handler;
pub mod server;
pub mod utils;

pub use server::{RespConfig, RespServer};
