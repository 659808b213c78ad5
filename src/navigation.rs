//! Live navigation: link interception, history integration and back/forward handling.
//!
//! A patch keeps the main view and only changes its address; a redirect replaces the main view
//! with a freshly joined one. Both are ordered by a monotonically increasing link reference:
//! only the most recent navigation may commit.

use crate::{
	browser::{self, HistoryKind, HistoryState, Location, NavKind},
	constants::{PAGE_LOADING_START, PAGE_LOADING_STOP, PHX_LINK_STATE, PHX_LIVE_LINK, SCROLL_PERSIST_DELAY},
	dom,
	error::Error,
	listeners::{ListenerOptions, Listeners},
	socket::LiveSocket,
};
use gloo_timers::callback::Timeout;
use serde_json::json;
use std::rc::{Rc, Weak};
use tracing::{instrument, trace, warn};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlAnchorElement, MouseEvent};

/// The pending-link counter and the committed href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTracker {
	link_ref: u64,
	pending: Option<String>,
	href: String,
}

impl LinkTracker {
	#[must_use]
	pub fn new(href: impl Into<String>) -> Self {
		Self {
			link_ref: 1,
			pending: None,
			href: href.into(),
		}
	}

	/// Starts a navigation to `href`, superseding any other in flight.
	pub fn set_pending(&mut self, href: impl Into<String>) -> u64 {
		self.link_ref += 1;
		self.pending = Some(href.into());
		self.link_ref
	}

	/// Commits the navigation started as `link_ref`, if it is still the latest one.
	///
	/// Committing the latest reference again is harmless and keeps the committed href.
	pub fn commit(&mut self, link_ref: u64) -> bool {
		if link_ref != self.link_ref {
			return false;
		}
		if let Some(pending) = self.pending.take() {
			self.href = pending
		}
		true
	}

	#[must_use]
	pub fn pending(&self) -> Option<&str> {
		self.pending.as_deref()
	}

	#[must_use]
	pub fn has_pending(&self) -> bool {
		self.pending.is_some()
	}

	#[must_use]
	pub fn href(&self) -> &str {
		&self.href
	}

	#[must_use]
	pub fn current_ref(&self) -> u64 {
		self.link_ref
	}
}

impl LiveSocket {
	/// Dispatches `phx:page-loading-start` on `window` and returns the matching stop dispatch.
	pub fn with_page_loading(&self, to: &str, kind: NavKind) -> Box<dyn FnOnce()> {
		let info = json!({ "to": to, "kind": kind.as_str() });
		let window = match web_sys::window() {
			Some(window) => window,
			None => return Box::new(|| ()),
		};
		dom::dispatch_custom(&window, PAGE_LOADING_START, &info, false);
		Box::new(move || dom::dispatch_custom(&window, PAGE_LOADING_STOP, &info, false))
	}

	/// Patches the main view to `href` and records a history entry once the server accepts it.
	#[instrument(skip(self, target))]
	pub fn push_history_patch(&self, href: &str, kind: HistoryKind, target: Option<&Element>) {
		let main = match self.main() {
			Some(main) => main,
			None => return warn!("No main view to patch."),
		};
		let done = self.with_page_loading(href, NavKind::Patch);
		let this = self.this();
		let href_owned = href.to_owned();
		main.push_link_patch(
			href,
			target,
			Some(Box::new(move |link_ref| {
				if let Some(socket) = this.upgrade() {
					socket.history_patch(&href_owned, kind, Some(link_ref))
				}
				done()
			})),
		)
	}

	/// Records a patch of the main view in the history, unless a newer navigation superseded it.
	///
	/// Without `link_ref`, a new navigation is started and committed right away.
	pub fn history_patch(&self, href: &str, kind: HistoryKind, link_ref: Option<u64>) {
		let link_ref = link_ref.unwrap_or_else(|| self.set_pending_link(href));
		if !self.commit_pending_link(link_ref) {
			return trace!("Superseded history patch to {:?} dropped.", href);
		}
		let main = match self.main() {
			Some(main) => main,
			None => return warn!("History patch without main view."),
		};
		let browser = self.browser();
		browser::push_state(browser.as_ref(), kind, HistoryState::patch(main.id()), Some(href));
		self.register_new_location(&browser.location());
	}

	/// Replaces the main view with one joined at `href`, then records a history entry
	/// that remembers the scroll offset being left.
	#[instrument(skip(self, flash))]
	pub fn history_redirect(&self, href: &str, kind: HistoryKind, flash: Option<String>) {
		let browser = self.browser();
		let scroll = browser.scroll_y();
		let done = self.with_page_loading(href, NavKind::Redirect);
		let this = self.this();
		let href_owned = href.to_owned();
		self.replace_main(
			href,
			flash,
			Some(Box::new(move || {
				if let Some(socket) = this.upgrade() {
					if let Some(main) = socket.main() {
						browser::push_state(browser.as_ref(), kind, HistoryState::redirect(main.id(), scroll), Some(&href_owned));
						socket.register_new_location(&browser.location());
					}
				}
				done()
			})),
			None,
		)
	}

	/// Marks the current history entry as the application root.
	pub fn replace_root_history(&self) {
		let main = match self.main() {
			Some(main) => main,
			None => return,
		};
		let state = HistoryState {
			root: Some(true),
			..HistoryState::patch(main.id())
		};
		browser::push_state(self.browser().as_ref(), HistoryKind::Replace, state, None)
	}

	/// Returns whether `location` differs from the registered one in path or query.
	pub fn register_new_location(&self, location: &Location) -> bool {
		self.current_location.borrow_mut().register(location)
	}

	fn on_popstate(&self) {
		let browser = self.browser();
		let location = browser.location();
		if !self.register_new_location(&location) {
			return trace!("Popstate to registered location ignored.");
		}
		let state = browser.history_state();
		let href = location.href;

		match self.main() {
			Some(main) if main.is_connected() && state.kind == Some(NavKind::Patch) && state.id.as_deref() == Some(main.id()) => {
				main.push_link_patch(&href, None, None)
			}
			_ => {
				let this = self.this();
				let (root, scroll) = (state.root.unwrap_or(false), state.scroll);
				self.replace_main(
					&href,
					None,
					Some(Box::new(move || {
						let socket = match this.upgrade() {
							Some(socket) => socket,
							None => return,
						};
						if root {
							socket.replace_root_history()
						}
						if let Some(scroll) = scroll {
							let browser = socket.browser();
							// The new body has to render first.
							Timeout::new(0, move || browser.scroll_to(scroll)).forget();
						}
					})),
					None,
				)
			}
		}
	}

	/// Fails for a live link of unknown type, after its default action was prevented.
	fn on_link_click(&self, event: &web_sys::Event) -> Result<(), Error> {
		let target = match dom::closest_binding(event.target(), PHX_LIVE_LINK) {
			Some(target) => target,
			None => return Ok(()),
		};
		let link_type = match target.get_attribute(PHX_LIVE_LINK) {
			Some(link_type) => link_type,
			None => return Ok(()),
		};
		let wants_new_tab = event
			.dyn_ref::<MouseEvent>()
			.map_or(false, |click| click.meta_key() || click.ctrl_key() || click.button() == 1);
		if !self.is_connected() || self.main().is_none() || wants_new_tab {
			return Ok(());
		}

		let href = match target.dyn_ref::<HtmlAnchorElement>() {
			Some(anchor) => anchor.href(),
			None => target.get_attribute("href").unwrap_or_default(),
		};
		let kind = HistoryKind::from_link_state(target.get_attribute(PHX_LINK_STATE).as_deref());
		event.prevent_default();
		if self.links.borrow().pending() == Some(href.as_str()) {
			trace!("Already navigating to {:?}.", href);
			return Ok(());
		}

		match NavKind::parse(&link_type)? {
			NavKind::Patch => self.push_history_patch(&href, kind, Some(&target)),
			NavKind::Redirect => self.history_redirect(&href, kind, None),
		}
		Ok(())
	}
}

/// Installs scroll persistence, back/forward handling and live-link interception.
///
/// Does nothing without push-state support, in which case links navigate normally.
pub(crate) fn bind_nav(socket: &LiveSocket, listeners: &mut Listeners, window: &web_sys::Window) {
	let browser = socket.browser();
	if !browser.can_push_state() {
		return;
	}
	browser.set_manual_scroll_restoration();

	let scroll_timer: Rc<core::cell::RefCell<Option<Timeout>>> = Rc::default();
	let scroll_browser = browser.clone();
	listeners.add(window, "scroll", ListenerOptions::BUBBLE, move |_| {
		let browser = scroll_browser.clone();
		*scroll_timer.borrow_mut() = Some(Timeout::new(SCROLL_PERSIST_DELAY, move || {
			let scroll = browser.scroll_y();
			browser::update_current_state(browser.as_ref(), |state| state.scroll = Some(scroll))
		}));
	});

	let this: Weak<LiveSocket> = socket.this();
	listeners.add(window, "popstate", ListenerOptions::BUBBLE, move |_| {
		if let Some(socket) = this.upgrade() {
			socket.on_popstate()
		}
	});

	let this: Weak<LiveSocket> = socket.this();
	listeners.add(window, "click", ListenerOptions::BUBBLE, move |event| {
		let clicked = this.upgrade().map_or(Ok(()), |socket| socket.on_link_click(&event));
		if let Err(error) = clicked {
			wasm_bindgen::throw_str(&error.to_string())
		}
	});
}
