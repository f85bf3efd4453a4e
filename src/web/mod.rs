// HTTP relay in front of the restoration service
// Accepts photo uploads and forwards them upstream

mod app;
mod error;
mod extract_request_data;
mod handlers;
mod headers;
mod listeners;
mod models;

pub use app::create_app;
pub use self::headers::AttachmentDisposition;
pub use listeners::create_listener;

use crate::upstream::RestorationClient;
use std::sync::Arc;

// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub type SharedRestorationClient = Arc<RestorationClient>;
