//! Global event delegation.
//!
//! A fixed set of listeners is installed once on `window`. Each resolves the element carrying
//! the matching binding attribute, applies debounce/throttle coalescing, finds the owning view
//! (or the view named by the element's target attribute) and pushes the event to it.

use crate::{
	constants::{PHX_CAPTURE_CLICK, PHX_CHANGE, PHX_CLICK, PHX_DEBOUNCE, PHX_DROP_TARGET, PHX_KEY, PHX_SUBMIT, PHX_THROTTLE, PHX_TRACK_UPLOADS, PHX_WINDOW},
	debounce,
	dedup::{InputIterations, InputKind},
	dom,
	listeners::{ListenerOptions, Listeners},
	navigation,
	socket::LiveSocket,
	view::{TargetCtx, View},
};
use js_sys::{Array, Reflect};
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{error, trace, trace_span};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, CustomEvent, DragEvent, Element, EventTarget, HtmlFormElement, HtmlInputElement, KeyboardEvent, PageTransitionEvent};

/// Owns the global listeners. Dropping it unbinds them.
#[derive(Debug, Default)]
pub struct EventBinder {
	bound: bool,
	listeners: Listeners,
	/// Shared by all form inputs.
	iterations: InputIterations,
}

impl EventBinder {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn is_bound(&self) -> bool {
		self.bound
	}

	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.len()
	}

	/// Advances the form event counter. See [`InputIterations::observe`].
	pub fn observe_input(&mut self, previous: Option<crate::dedup::Iteration>, kind: InputKind) -> Option<crate::dedup::Iteration> {
		self.iterations.observe(previous, kind)
	}

	/// Installs all global listeners. A second call does nothing.
	pub(crate) fn bind(&mut self, socket: &LiveSocket) {
		if self.bound {
			return trace!("Top level events already bound.");
		}
		let window = match web_sys::window() {
			Some(window) => window,
			None => return error!("No window to bind events to."),
		};
		self.bound = true;
		let listeners = &mut self.listeners;
		let this = socket.this();

		if let Some(body) = dom::document().and_then(|document| document.body()) {
			// Makes click events bubble on mobile Safari.
			listeners.add(&body, "click", ListenerOptions::BUBBLE, |_| ());
		}

		let pageshow = this.clone();
		listeners.add(&window, "pageshow", ListenerOptions::CAPTURE, move |event| {
			let persisted = event.dyn_ref::<PageTransitionEvent>().map_or(false, PageTransitionEvent::persisted);
			if let (true, Some(socket)) = (persisted, pageshow.upgrade()) {
				socket.on_bfcache_restore()
			}
		});

		navigation::bind_nav(socket, listeners, &window);
		bind_click(listeners, &window, &this, "click", PHX_CLICK, false);
		bind_click(listeners, &window, &this, "mousedown", PHX_CAPTURE_CLICK, true);
		bind_forms(listeners, &window, &this);

		bind_generic(listeners, &window, &this, "keyup", "keyup", push_key);
		bind_generic(listeners, &window, &this, "keydown", "keydown", push_key);
		bind_generic(listeners, &window, &this, "blur", "focusout", push_element_focus);
		bind_generic(listeners, &window, &this, "focus", "focusin", push_element_focus);
		bind_generic(listeners, &window, &this, "blur", "blur", push_window_focus);
		bind_generic(listeners, &window, &this, "focus", "focus", push_window_focus);

		listeners.add(&window, "dragover", ListenerOptions::BUBBLE, |event| event.prevent_default());
		let drop = this.clone();
		listeners.add(&window, "drop", ListenerOptions::BUBBLE, move |event| {
			event.prevent_default();
			if let Some(socket) = drop.upgrade() {
				on_drop(&socket, &event)
			}
		});
		on(listeners, &window, PHX_TRACK_UPLOADS, &this, on_track_uploads);

		trace!("Bound {} top level listeners.", listeners.len());
	}
}

/// A resolved binding, handed to the per-kind push.
pub struct Dispatch<'a> {
	pub event: &'a web_sys::Event,
	/// The binding kind, for example `"keyup"` or `"blur"`.
	pub kind: &'a str,
	pub view: Rc<View>,
	pub target: Element,
	pub target_ctx: TargetCtx,
	pub phx_event: &'a str,
	/// Whether the binding was found through its `window-` variant.
	pub window_scoped: bool,
}

type Handler = fn(&LiveSocket, Dispatch<'_>);

/// Adds a listener that is skipped while events are silenced.
fn on(listeners: &mut Listeners, target: &EventTarget, event: &str, socket: &Weak<LiveSocket>, handler: fn(&LiveSocket, &web_sys::Event)) {
	let socket = socket.clone();
	listeners.add(target, event, ListenerOptions::BUBBLE, move |event| {
		if let Some(socket) = socket.upgrade() {
			if !socket.is_silenced() {
				handler(&socket, &event)
			}
		}
	})
}

/// Coalesces per `target`'s debounce/throttle attributes, then resolves owners and calls `handler`.
fn dispatch_debounced(socket: &LiveSocket, event: &web_sys::Event, kind: &'static str, target: Element, phx_event: String, window_scoped: bool, handler: Handler) {
	let coalesce = debounce::resolve(&target, &socket.binding(PHX_DEBOUNCE), &socket.binding(PHX_THROTTLE), socket.defaults());
	let this = socket.this();
	let owned_event = event.clone();
	let element = target.clone();
	debounce::debounce(
		socket.private(),
		&element,
		event,
		coalesce,
		Box::new(move || {
			let socket = match this.upgrade() {
				Some(socket) => socket,
				None => return,
			};
			let _span = trace_span!("dispatch", kind, phx_event = phx_event.as_str()).entered();
			socket.within_owners(&target, &mut |view, target_ctx| {
				handler(
					&socket,
					Dispatch {
						event: &owned_event,
						kind,
						view,
						target: target.clone(),
						target_ctx,
						phx_event: &phx_event,
						window_scoped,
					},
				)
			})
		}),
	)
}

/// Binds `kind` through the native `browser_event`.
///
/// The event's own target is matched first. Otherwise every element carrying the `window-`
/// variant of the binding receives it.
fn bind_generic(listeners: &mut Listeners, window: &web_sys::Window, socket: &Weak<LiveSocket>, kind: &'static str, browser_event: &str, handler: Handler) {
	let socket = socket.clone();
	listeners.add(window, browser_event, ListenerOptions::BUBBLE, move |event| {
		let socket = match socket.upgrade() {
			Some(socket) if !socket.is_silenced() => socket,
			_ => return,
		};
		let binding = socket.binding(kind);
		let bound_target = event
			.target()
			.and_then(|target| target.dyn_into::<Element>().ok())
			.and_then(|target| target.get_attribute(&binding).map(|phx_event| (target, phx_event)));

		match bound_target {
			Some((target, phx_event)) => dispatch_debounced(&socket, &event, kind, target, phx_event, false, handler),
			None => {
				let window_binding = socket.binding(&format!("{}{}", PHX_WINDOW, kind));
				let document = match dom::document() {
					Some(document) => document,
					None => return,
				};
				for el in dom::all_in_document(&document, &format!("[{}]", window_binding)) {
					if let Some(phx_event) = el.get_attribute(&window_binding) {
						dispatch_debounced(&socket, &event, kind, el, phx_event, true, handler)
					}
				}
			}
		}
	})
}

fn push_key(socket: &LiveSocket, dispatch: Dispatch<'_>) {
	let pressed = dispatch.event.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key);
	if let Some(match_key) = dispatch.target.get_attribute(&socket.binding(PHX_KEY)) {
		if pressed.as_ref().map(|pressed| pressed.to_lowercase()) != Some(match_key.to_lowercase()) {
			return trace!("Key {:?} filtered out.", pressed);
		}
	}
	let mut meta = serde_json::Map::new();
	meta.insert("key".to_owned(), pressed.map_or(Value::Null, Value::String));
	meta.extend(socket.event_meta(dispatch.kind, dispatch.event, &dispatch.target));
	dispatch.view.push_key(&dispatch.target, &dispatch.target_ctx, dispatch.kind, dispatch.phx_event, meta)
}

/// `focusin`/`focusout` bubble from elements, so they carry element bindings.
fn push_element_focus(socket: &LiveSocket, dispatch: Dispatch<'_>) {
	if !dispatch.window_scoped {
		push_event(socket, dispatch)
	}
}

/// Plain `focus`/`blur` only reach the window listener for the window itself.
fn push_window_focus(socket: &LiveSocket, dispatch: Dispatch<'_>) {
	if dispatch.window_scoped {
		push_event(socket, dispatch)
	}
}

fn push_event(socket: &LiveSocket, dispatch: Dispatch<'_>) {
	let meta = socket.event_meta(dispatch.kind, dispatch.event, &dispatch.target);
	dispatch.view.push_event(dispatch.kind, &dispatch.target, &dispatch.target_ctx, dispatch.phx_event, meta)
}

/// Clicks are forwarded only while connected, even if events aren't silenced.
///
/// The capture variant listens on `mousedown` and also matches a bound descendant of the target,
/// which catches elements whose own click handling suppresses the regular event.
fn bind_click(listeners: &mut Listeners, window: &web_sys::Window, socket: &Weak<LiveSocket>, event_name: &str, binding: &'static str, capture: bool) {
	let socket = socket.clone();
	let options = if capture { ListenerOptions::CAPTURE } else { ListenerOptions::BUBBLE };
	listeners.add(window, event_name, options, move |event| {
		let socket = match socket.upgrade() {
			Some(socket) if socket.is_connected() => socket,
			_ => return,
		};
		let click = socket.binding(binding);
		let target = if capture {
			let selector = format!("[{}]", click);
			dom::target_element(event.target()).and_then(|target| match target.matches(&selector) {
				Ok(true) => Some(target),
				_ => target.query_selector(&selector).ok().flatten(),
			})
		} else {
			dom::closest_binding(event.target(), &click)
		};
		let (target, phx_event) = match target.and_then(|target| target.get_attribute(&click).map(|phx_event| (target, phx_event))) {
			Some(found) => found,
			None => return,
		};
		if target.get_attribute("href").as_deref() == Some("#") {
			event.prevent_default()
		}
		dispatch_debounced(&socket, &event, "click", target, phx_event, false, push_event)
	})
}

fn bind_forms(listeners: &mut Listeners, window: &web_sys::Window, socket: &Weak<LiveSocket>) {
	on(listeners, window, "submit", socket, on_submit);
	on(listeners, window, InputKind::Change.as_str(), socket, on_input);
	on(listeners, window, InputKind::Input.as_str(), socket, on_input);
}

fn on_submit(socket: &LiveSocket, event: &web_sys::Event) {
	let form = match event.target().and_then(|target| target.dyn_into::<HtmlFormElement>().ok()) {
		Some(form) => form,
		None => return,
	};
	let phx_event = match form.get_attribute(&socket.binding(PHX_SUBMIT)) {
		Some(phx_event) => phx_event,
		None => return,
	};
	event.prevent_default();
	if let Err(error) = form.set_attribute("disabled", "") {
		error!("Failed to disable submitted form: {:?}", error)
	}
	socket.private().borrow_mut().for_each_within(&form, |_, state| state.reset_cycle());
	socket.within_owners(&form, &mut |view, target_ctx| view.submit_form(&form, &target_ctx, &phx_event))
}

fn on_input(socket: &LiveSocket, event: &web_sys::Event) {
	let kind = match InputKind::from_event_type(&event.type_()) {
		Some(kind) => kind,
		None => return,
	};
	let input = match dom::target_element(event.target()) {
		Some(input) => input,
		None => return,
	};
	let form = match input.closest("form").ok().flatten() {
		Some(form) => form,
		None => return,
	};
	let phx_event = match form.get_attribute(&socket.binding(PHX_CHANGE)) {
		Some(phx_event) => phx_event,
		None => return,
	};
	if let Some(number) = input.dyn_ref::<HtmlInputElement>() {
		if number.type_() == "number" && number.validity().bad_input() {
			return trace!("Partial number input ignored.");
		}
	}

	let previous = socket.private().borrow().get(&input).and_then(|state| state.prev_iteration);
	let iteration = socket.binder().borrow_mut().observe_input(previous, kind);
	let iteration = match iteration {
		Some(iteration) => iteration,
		None => return trace!("Duplicate {:?} for the same edit dropped.", kind.as_str()),
	};
	socket.private().borrow_mut().entry(&input).prev_iteration = Some(iteration);

	let coalesce = debounce::resolve(&input, &socket.binding(PHX_DEBOUNCE), &socket.binding(PHX_THROTTLE), socket.defaults());
	let this = socket.this();
	let element = input.clone();
	debounce::debounce(
		socket.private(),
		&element,
		event,
		coalesce,
		Box::new(move || {
			let socket = match this.upgrade() {
				Some(socket) => socket,
				None => return,
			};
			socket.within_owners(&form, &mut |view, target_ctx| {
				socket.private().borrow_mut().entry(&input).has_focused = true;
				if !dom::is_textual_input(&input) {
					socket.set_active_element(&input)
				}
				view.push_input(&input, &target_ctx, &phx_event)
			})
		}),
	)
}

fn on_drop(socket: &LiveSocket, event: &web_sys::Event) {
	let drop_target = dom::closest_binding(event.target(), &socket.binding(PHX_DROP_TARGET))
		.and_then(|holder| holder.get_attribute(&socket.binding(PHX_DROP_TARGET)))
		.and_then(|id| dom::document()?.get_element_by_id(&id))
		.and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
	let drop_target = match drop_target {
		Some(input) if !input.disabled() && input.files().is_some() => input,
		_ => return,
	};
	let files: Vec<Blob> = match event.dyn_ref::<DragEvent>().and_then(DragEvent::data_transfer).and_then(|transfer| transfer.files()) {
		Some(list) => (0..list.length()).filter_map(|i| list.get(i)).map(Blob::from).collect(),
		None => Vec::new(),
	};
	if files.is_empty() {
		return;
	}
	track_files(socket, &drop_target, files);
	dom::dispatch_input(&drop_target)
}

fn on_track_uploads(socket: &LiveSocket, event: &web_sys::Event) {
	let target = match dom::target_element(event.target()) {
		Some(target) if dom::is_upload_input(&target) => target,
		_ => return,
	};
	let files: Vec<Blob> = event
		.dyn_ref::<CustomEvent>()
		.map(CustomEvent::detail)
		.and_then(|detail| Reflect::get(&detail, &JsValue::from_str("files")).ok())
		.filter(|files| !files.is_undefined() && !files.is_null())
		.map(|files| Array::from(&files))
		.map(|files| files.iter().filter_map(|file| file.dyn_into::<Blob>().ok()).collect())
		.unwrap_or_default();
	track_files(socket, &target, files);
	dom::dispatch_input(&target)
}

fn track_files(socket: &LiveSocket, input: &Element, files: Vec<Blob>) {
	trace!("Tracking {} file(s).", files.len());
	socket.private().borrow_mut().entry(input).tracked_files.extend(files)
}
