//! h2c-client - interactive HTTP/2 cleartext upgrade client
//!
//! This crate negotiates the HTTP/1.1 → HTTP/2 "h2c" upgrade over plain TCP
//! and lets an operator drive the resulting connection with line commands.

pub mod h2c;
pub mod http;
pub mod net;
pub mod repl;
