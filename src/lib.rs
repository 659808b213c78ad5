//! Browser-side supervisor for server-rendered live views.
//!
//! A [`LiveSocket`] joins every live view found in the document over one socket, forwards
//! bound DOM events to the owning view, integrates live navigation with the browser history
//! and recovers from timeouts by reloading the page after a jittered delay.
//!
//! Rendering, the wire transport and storage are capabilities supplied by the embedder:
//! see [`Renderer`], [`Socket`] and [`Storage`]. [`JsSocket`] adapts a Phoenix-compatible
//! JavaScript socket.

#![doc(html_root_url = "https://docs.rs/live-socket/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod backoff;
pub mod browser;
pub mod channel;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod dedup;
pub mod devtools;
pub mod dom;
mod error;
pub mod events;
mod js_socket;
pub mod listeners;
pub mod navigation;
pub mod private;
mod socket;
pub mod storage;
pub mod view;
pub mod view_tree;

pub use backoff::{Backoff, BackoffPolicy};
pub use browser::{Browser, HistoryKind, HistoryState, NavKind, WebBrowser};
pub use channel::{Channel, Push, PushOpts, ReplyKind, Socket};
pub use config::{Defaults, DomCallbacks, Options};
pub use error::Error;
pub use js_socket::JsSocket;
pub use socket::LiveSocket;
pub use storage::{MemoryStorage, Storage};
pub use view::{Renderer, TargetCtx, View};
