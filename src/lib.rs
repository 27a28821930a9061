pub mod config;
pub mod env;
pub mod id;
pub mod record;
pub mod render;
pub mod self_ref;

pub mod fetch;
pub mod transmitter;

pub mod interceptor;
pub mod layer;
pub mod panic_hook;
pub mod rejection;

pub mod init;

#[cfg(test)]
mod testing;
