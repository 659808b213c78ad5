//! Owned DOM event listener registrations.
//!
//! Each [`Listener`] removes itself from its target when dropped, so a [`Listeners`] set
//! unbinds everything it installed once its owner goes away.

use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{AddEventListenerOptions, EventTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerOptions {
	pub capture: bool,
	pub once: bool,
}

impl ListenerOptions {
	pub const BUBBLE: Self = Self { capture: false, once: false };
	pub const CAPTURE: Self = Self { capture: true, once: false };
	pub const ONCE: Self = Self { capture: false, once: true };
}

pub struct Listener {
	target: EventTarget,
	event: String,
	capture: bool,
	closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl core::fmt::Debug for Listener {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Listener")
			.field("target", &self.target)
			.field("event", &self.event)
			.field("capture", &self.capture)
			.finish_non_exhaustive()
	}
}

impl Drop for Listener {
	fn drop(&mut self) {
		if let Err(error) = self
			.target
			.remove_event_listener_with_callback_and_bool(&self.event, self.closure.as_ref().unchecked_ref(), self.capture)
		{
			error!("Failed to remove {:?} event listener: {:?}", self.event, error)
		}
	}
}

#[derive(Debug, Default)]
pub struct Listeners {
	listeners: Vec<Listener>,
	options_cache: [Option<AddEventListenerOptions>; 4],
}

impl Listeners {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn cached_options(&mut self, options: ListenerOptions) -> &AddEventListenerOptions {
		let entry = &mut self.options_cache[options.capture as usize + options.once as usize * 2];
		entry.get_or_insert_with(|| {
			let web_options = AddEventListenerOptions::new();
			web_options.set_capture(options.capture);
			web_options.set_once(options.once);
			web_options
		})
	}

	/// Installs `handler` on `target` and keeps it alive until this set is dropped or cleared.
	pub fn add(&mut self, target: &EventTarget, event: &str, options: ListenerOptions, handler: impl FnMut(web_sys::Event) + 'static) {
		let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
		let web_options = self.cached_options(options).clone();
		match target.add_event_listener_with_callback_and_add_event_listener_options(event, closure.as_ref().unchecked_ref(), &web_options) {
			Ok(()) => {
				trace!("Added {:?} listener (capture: {}).", event, options.capture);
				self.listeners.push(Listener {
					target: target.clone(),
					event: event.to_owned(),
					capture: options.capture,
					closure,
				})
			}
			Err(error) => error!("Failed to add {:?} event listener: {:?}", event, error),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.listeners.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.listeners.is_empty()
	}

	/// Removes all listeners.
	///
	/// Must not be called from within one of the listeners being removed.
	pub fn clear(&mut self) {
		self.listeners.clear()
	}
}
