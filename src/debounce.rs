//! Debounce/throttle coalescing of bound events.
//!
//! The policy is read from the element or its nearest ancestor carrying a debounce or throttle
//! attribute. An empty value selects the configured default. `blur` (debounce only) holds the
//! event until the element loses focus.

use crate::{
	config::Defaults,
	listeners::ListenerOptions,
	private::{Pending, PrivateStore},
};
use core::cell::RefCell;
use gloo_timers::callback::Timeout;
use std::rc::{Rc, Weak};
use tracing::{error, trace};
use wasm_bindgen::JsCast;
use web_sys::{Element, KeyboardEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coalesce {
	Immediate,
	/// Trailing call after the element blurs.
	Blur,
	/// Trailing call once no event arrived for this many milliseconds.
	Debounce(u32),
	/// Leading call, then nothing for this many milliseconds.
	Throttle(u32),
	Invalid(String),
}

fn parse_ms(value: &str, default: u32) -> Option<u32> {
	let value = value.trim();
	if value.is_empty() {
		Some(default)
	} else {
		value.parse().ok()
	}
}

/// Debounce takes precedence over throttle when both attributes are present.
#[must_use]
pub fn parse_coalesce(debounce: Option<&str>, throttle: Option<&str>, defaults: Defaults) -> Coalesce {
	match (debounce, throttle) {
		(Some(value), _) if value.trim() == "blur" => Coalesce::Blur,
		(Some(value), _) => parse_ms(value, defaults.debounce).map_or_else(|| Coalesce::Invalid(value.to_owned()), Coalesce::Debounce),
		(None, Some(value)) => parse_ms(value, defaults.throttle).map_or_else(|| Coalesce::Invalid(value.to_owned()), Coalesce::Throttle),
		(None, None) => Coalesce::Immediate,
	}
}

#[must_use]
pub fn resolve(element: &Element, debounce_attribute: &str, throttle_attribute: &str, defaults: Defaults) -> Coalesce {
	let selector = format!("[{}],[{}]", debounce_attribute, throttle_attribute);
	match element.closest(&selector) {
		Ok(Some(holder)) => parse_coalesce(
			holder.get_attribute(debounce_attribute).as_deref(),
			holder.get_attribute(throttle_attribute).as_deref(),
			defaults,
		),
		Ok(None) => Coalesce::Immediate,
		Err(error) => {
			error!("Invalid coalesce selector {:?}: {:?}", selector, error);
			Coalesce::Immediate
		}
	}
}

fn flush(pending: &Pending) {
	let callback = pending.borrow_mut().take();
	if let Some(callback) = callback {
		callback()
	}
}

/// Stores `callback` as the element's pending trailing call, discarding any earlier one.
fn replace_pending(store: &RefCell<PrivateStore>, element: &Element, callback: Box<dyn FnOnce()>) -> Pending {
	let pending: Pending = Rc::new(RefCell::new(Some(callback)));
	let mut store = store.borrow_mut();
	let state = store.entry(element);
	if let Some(previous) = state.pending.replace(pending.clone()) {
		previous.borrow_mut().take();
	}
	pending
}

fn ensure_blur_flush(store: &Rc<RefCell<PrivateStore>>, element: &Element) {
	let weak: Weak<RefCell<PrivateStore>> = Rc::downgrade(store);
	let mut store = store.borrow_mut();
	let state = store.entry(element);
	if !state.listeners.is_empty() {
		return;
	}
	let blurred = element.clone();
	state.listeners.add(element, "blur", ListenerOptions::BUBBLE, move |_| {
		let store = match weak.upgrade() {
			Some(store) => store,
			None => return,
		};
		let pending = store.borrow().get(&blurred).and_then(|state| state.pending.clone());
		if let Some(pending) = pending {
			trace!("Flushing debounced event on blur.");
			flush(&pending)
		}
	});
}

/// Runs `callback` now, later, or never, according to `coalesce`.
pub fn debounce(store: &Rc<RefCell<PrivateStore>>, element: &Element, event: &web_sys::Event, coalesce: Coalesce, callback: Box<dyn FnOnce()>) {
	match coalesce {
		Coalesce::Immediate => callback(),

		Coalesce::Invalid(value) => error!("Invalid throttle/debounce value: {:?}", value),

		Coalesce::Blur => {
			replace_pending(store, element, callback);
			ensure_blur_flush(store, element);
		}

		Coalesce::Debounce(ms) => {
			let pending = replace_pending(store, element, callback);
			let timer = Timeout::new(ms, move || flush(&pending));
			store.borrow_mut().entry(element).timer = Some(timer);
			ensure_blur_flush(store, element);
		}

		Coalesce::Throttle(ms) => {
			{
				let weak = Rc::downgrade(store);
				let mut store = store.borrow_mut();
				let state = store.entry(element);

				let mut new_key_down = false;
				if event.type_() == "keydown" {
					let key = event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key);
					new_key_down = state.prev_key != key;
					state.prev_key = key;
				}
				if state.throttled && !new_key_down {
					return trace!("Throttled {:?}.", event.type_());
				}

				state.throttled = true;
				let throttled = element.clone();
				state.timer = Some(Timeout::new(ms, move || {
					if let Some(store) = weak.upgrade() {
						if let Some(state) = store.borrow_mut().get_mut(&throttled) {
							state.throttled = false
						}
					}
				}));
			}
			callback()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const DEFAULTS: Defaults = Defaults { debounce: 300, throttle: 200 };

	#[test]
	fn no_attribute_is_immediate() {
		assert_eq!(parse_coalesce(None, None, DEFAULTS), Coalesce::Immediate);
	}

	#[test]
	fn empty_values_use_defaults() {
		assert_eq!(parse_coalesce(Some(""), None, DEFAULTS), Coalesce::Debounce(300));
		assert_eq!(parse_coalesce(None, Some(""), DEFAULTS), Coalesce::Throttle(200));
	}

	#[test]
	fn explicit_values_and_precedence() {
		assert_eq!(parse_coalesce(Some("50"), Some("1000"), DEFAULTS), Coalesce::Debounce(50));
		assert_eq!(parse_coalesce(None, Some(" 1000 "), DEFAULTS), Coalesce::Throttle(1000));
		assert_eq!(parse_coalesce(Some("blur"), None, DEFAULTS), Coalesce::Blur);
	}

	#[test]
	fn garbage_is_reported() {
		assert_eq!(parse_coalesce(Some("soon"), None, DEFAULTS), Coalesce::Invalid("soon".to_owned()));
		assert_eq!(parse_coalesce(None, Some("-5"), DEFAULTS), Coalesce::Invalid("-5".to_owned()));
	}
}
