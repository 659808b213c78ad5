//! Session-scoped debugging aids: verbose logging, profiling timers and simulated latency.
//!
//! All flags live in session storage, so they survive reloads but not the browser session.

use crate::{
	channel::{Push, ReplyCallback, ReplyKind},
	constants::{PHX_LV_DEBUG, PHX_LV_LATENCY_SIM, PHX_LV_PROFILE},
	storage::Storage,
};
use core::cell::RefCell;
use gloo_timers::callback::Timeout;
use std::rc::Rc;
use tracing::{info, trace};

#[must_use]
pub fn is_debug_enabled(storage: &dyn Storage) -> bool {
	storage.get_item(PHX_LV_DEBUG).as_deref() == Some("true")
}

pub fn enable_debug(storage: &dyn Storage) {
	storage.set_item(PHX_LV_DEBUG, "true")
}

pub fn disable_debug(storage: &dyn Storage) {
	storage.remove_item(PHX_LV_DEBUG)
}

#[must_use]
pub fn is_profile_enabled(storage: &dyn Storage) -> bool {
	storage.get_item(PHX_LV_PROFILE).as_deref() == Some("true")
}

pub fn enable_profiling(storage: &dyn Storage) {
	storage.set_item(PHX_LV_PROFILE, "true")
}

pub fn disable_profiling(storage: &dyn Storage) {
	storage.remove_item(PHX_LV_PROFILE)
}

/// Delays every push and every server message by `upper_bound_ms`. Also enables debugging.
pub fn enable_latency_sim(storage: &dyn Storage, upper_bound_ms: u32) {
	enable_debug(storage);
	info!("Latency simulator enabled for the duration of this browser session.");
	storage.set_item(PHX_LV_LATENCY_SIM, &upper_bound_ms.to_string())
}

pub fn disable_latency_sim(storage: &dyn Storage) {
	storage.remove_item(PHX_LV_LATENCY_SIM)
}

/// The simulated latency in milliseconds, if enabled. `0` and unparsable values count as disabled.
#[must_use]
pub fn latency_sim(storage: &dyn Storage) -> Option<u32> {
	storage
		.get_item(PHX_LV_LATENCY_SIM)
		.and_then(|value| value.trim().parse().ok())
		.filter(|&latency| latency > 0)
}

/// Runs `f` inside a named console timer while profiling is enabled.
pub fn time<T>(storage: &dyn Storage, name: &str, f: impl FnOnce() -> T) -> T {
	if !is_profile_enabled(storage) {
		return f();
	}
	web_sys::console::time_with_label(name);
	let result = f();
	web_sys::console::time_end_with_label(name);
	result
}

#[derive(Default)]
struct Deferred {
	push: Option<Box<dyn Push>>,
	queued: Vec<(ReplyKind, ReplyCallback)>,
	cancelled: bool,
}

/// A push handle standing in for one that is only sent after the simulated latency.
///
/// Reply registrations are queued and replayed onto the real push once it exists.
pub struct DeferredPush {
	state: Rc<RefCell<Deferred>>,
}

impl DeferredPush {
	/// Schedules `push` after `latency_ms`. `should_send` is checked when the timer fires.
	pub fn schedule(latency_ms: u32, should_send: impl FnOnce() -> bool + 'static, push: impl FnOnce() -> Box<dyn Push> + 'static) -> Self {
		info!("Simulating {}ms of latency from client to server.", latency_ms);
		let state = Rc::new(RefCell::new(Deferred::default()));
		let deferred = state.clone();
		Timeout::new(latency_ms, move || {
			if !should_send() {
				deferred.borrow_mut().cancelled = true;
				return trace!("Deferred push dropped.");
			}
			let queued = core::mem::take(&mut deferred.borrow_mut().queued);
			let sent = queued.into_iter().fold(push(), |push, (kind, callback)| push.receive(kind, callback));
			deferred.borrow_mut().push = Some(sent);
		})
		.forget();
		Self { state }
	}
}

impl Push for DeferredPush {
	fn receive(self: Box<Self>, kind: ReplyKind, callback: ReplyCallback) -> Box<dyn Push> {
		let state = self.state.clone();
		let sent = state.borrow_mut().push.take();
		match sent {
			Some(sent) => {
				let sent = sent.receive(kind, callback);
				state.borrow_mut().push = Some(sent);
			}
			None => {
				let mut state = state.borrow_mut();
				if !state.cancelled {
					state.queued.push((kind, callback))
				}
			}
		}
		self
	}
}

/// Delivers a server message to `callback`, after the simulated latency if one is enabled.
pub fn deliver<T: 'static>(storage: &dyn Storage, message: T, callback: Rc<dyn Fn(T)>) {
	match latency_sim(storage) {
		None => callback(message),
		Some(latency) => {
			info!("Simulating {}ms of latency from server to client.", latency);
			Timeout::new(latency, move || callback(message)).forget();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::MemoryStorage;

	#[test]
	fn flags_round_trip_through_storage() {
		let storage = MemoryStorage::new();
		assert!(!is_debug_enabled(&storage));
		enable_debug(&storage);
		assert!(is_debug_enabled(&storage));
		disable_debug(&storage);
		assert!(!is_debug_enabled(&storage));

		enable_profiling(&storage);
		assert!(is_profile_enabled(&storage));
		disable_profiling(&storage);
		assert!(!is_profile_enabled(&storage));
	}

	#[test]
	fn latency_sim_parsing() {
		let storage = MemoryStorage::new();
		assert_eq!(latency_sim(&storage), None);
		storage.set_item(PHX_LV_LATENCY_SIM, "250");
		assert_eq!(latency_sim(&storage), Some(250));
		storage.set_item(PHX_LV_LATENCY_SIM, "0");
		assert_eq!(latency_sim(&storage), None);
		storage.set_item(PHX_LV_LATENCY_SIM, "fast");
		assert_eq!(latency_sim(&storage), None);
		disable_latency_sim(&storage);
		assert_eq!(storage.get_item(PHX_LV_LATENCY_SIM), None);
	}

	#[test]
	fn time_without_profiling_just_runs() {
		let storage = MemoryStorage::new();
		assert_eq!(time(&storage, "noop", || 7), 7);
	}
}
