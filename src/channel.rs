//! The transport capability: a socket multiplexing per-view channels.
//!
//! This crate never implements the wire transport itself. [`JsSocket`](`crate::JsSocket`) adapts a
//! Phoenix-compatible JavaScript socket; tests and other transports implement the traits directly.

use serde_json::Value;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyKind {
	Ok,
	Error,
	Timeout,
}

impl ReplyKind {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			ReplyKind::Ok => "ok",
			ReplyKind::Error => "error",
			ReplyKind::Timeout => "timeout",
		}
	}
}

/// Join replies fire again on every rejoin, so callbacks may run more than once.
pub type ReplyCallback = Box<dyn FnMut(Value)>;

/// An outbound message awaiting its reply.
pub trait Push {
	/// Registers `callback` for replies of `kind` and returns the push for chaining.
	fn receive(self: Box<Self>, kind: ReplyKind, callback: ReplyCallback) -> Box<dyn Push>;
}

/// One server-side topic, typically one live view.
pub trait Channel {
	fn join(&self) -> Box<dyn Push>;
	fn leave(&self);
	/// `timeout` is in milliseconds; [`None`] uses the transport's default.
	fn push(&self, event: &str, payload: Value, timeout: Option<u32>) -> Box<dyn Push>;
	/// Subscribes to server-initiated messages of `event`.
	fn on(&self, event: &str, callback: Box<dyn FnMut(Value)>);
}

pub trait Socket {
	fn open(&self);
	fn close(&self, on_close: Option<Box<dyn FnOnce()>>);
	fn is_connected(&self) -> bool;
	fn on_open(&self, callback: Box<dyn FnMut()>);
	fn channel(&self, topic: &str, params: Value) -> Rc<dyn Channel>;
}

/// Outbound push options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushOpts {
	/// When set, a reply timeout on a view that hasn't rejoined since forces a jittered reload.
	pub timeout: bool,
}
