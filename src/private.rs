//! Per-element private state, kept on the Rust side and keyed by a number stamped onto the element.

use crate::{dedup::Iteration, listeners::Listeners};
use core::cell::RefCell;
use gloo_timers::callback::Timeout;
use hashbrown::HashMap;
use js_sys::Reflect;
use std::rc::Rc;
use tracing::trace;
use wasm_bindgen::JsValue;
use web_sys::Element;

const PRIVATE_KEY: &str = "phxPrivateKey";

/// A coalesced callback waiting for its debounce interval or for a blur.
pub type Pending = Rc<RefCell<Option<Box<dyn FnOnce()>>>>;

#[derive(Default)]
pub struct ElementState {
	pub prev_iteration: Option<Iteration>,
	pub has_focused: bool,
	pub throttled: bool,
	pub prev_key: Option<String>,
	pub pending: Option<Pending>,
	/// Replacing this cancels the previous timer.
	pub timer: Option<Timeout>,
	pub tracked_files: Vec<web_sys::Blob>,
	/// Blur flushing for debounced elements; installed at most once.
	pub listeners: Listeners,
}

impl core::fmt::Debug for ElementState {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("ElementState")
			.field("prev_iteration", &self.prev_iteration)
			.field("has_focused", &self.has_focused)
			.field("throttled", &self.throttled)
			.field("pending", &self.pending.is_some())
			.field("tracked_files", &self.tracked_files.len())
			.finish_non_exhaustive()
	}
}

impl ElementState {
	/// Drops a pending trailing callback and lifts throttling.
	pub fn reset_cycle(&mut self) {
		if let Some(pending) = self.pending.take() {
			pending.borrow_mut().take();
		}
		self.timer = None;
		self.throttled = false;
	}
}

#[derive(Debug, Default)]
pub struct PrivateStore {
	next_key: u32,
	entries: HashMap<u32, (Element, ElementState)>,
}

impl PrivateStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn key_of(element: &Element) -> Option<u32> {
		Reflect::get(element, &JsValue::from_str(PRIVATE_KEY))
			.ok()
			.and_then(|key| key.as_f64())
			.map(|key| key as u32)
	}

	/// Read-only access; does not stamp the element.
	pub fn get(&self, element: &Element) -> Option<&ElementState> {
		Self::key_of(element).and_then(|key| self.entries.get(&key)).map(|(_, state)| state)
	}

	pub fn get_mut(&mut self, element: &Element) -> Option<&mut ElementState> {
		Self::key_of(element).and_then(move |key| self.entries.get_mut(&key)).map(|(_, state)| state)
	}

	pub fn entry(&mut self, element: &Element) -> &mut ElementState {
		let key = match Self::key_of(element) {
			Some(key) if self.entries.contains_key(&key) => key,
			_ => {
				self.next_key += 1;
				if let Err(error) = Reflect::set(element, &JsValue::from_str(PRIVATE_KEY), &JsValue::from_f64(f64::from(self.next_key))) {
					tracing::error!("Failed to stamp private key onto element: {:?}", error)
				}
				self.next_key
			}
		};
		&mut self.entries.entry(key).or_insert_with(|| (element.clone(), ElementState::default())).1
	}

	/// Applies `f` to the state of every tracked element inside `container` (inclusive).
	pub fn for_each_within(&mut self, container: &Element, mut f: impl FnMut(&Element, &mut ElementState)) {
		for (element, state) in self.entries.values_mut() {
			if container.contains(Some(element.as_ref())) {
				f(element, state)
			}
		}
	}

	/// Forgets elements that left the document.
	///
	/// Their listeners are handed back to the caller, which must not drop them while one of them is running.
	pub fn prune(&mut self) -> Vec<Listeners> {
		let mut removed = Vec::new();
		self.entries.retain(|_, (element, state)| {
			if element.is_connected() {
				true
			} else {
				removed.push(core::mem::take(&mut state.listeners));
				false
			}
		});
		trace!("Pruned private state of {} detached element(s).", removed.len());
		removed
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
