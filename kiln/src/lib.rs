//! Kiln host
//!
//! Runs an [`AppFilter`](kiln_filter::AppFilter) behind a hyper HTTP/1
//! server and ships a small demo application.

pub mod server;
pub mod welcome;

pub use server::{handle_request, serve, ResponseBody};
