//! History, location and scroll access.
//!
//! [`Browser`] is the narrow capability the supervisor needs from the page;
//! [`WebBrowser`] implements it on top of `web_sys::Window`.
//! The free functions layer the navigation rules on top of any implementation.

use crate::{
	constants::PHX_FLASH,
	error::Error,
	js_socket::{from_js, to_js},
	storage::Storage,
};
use serde::{Deserialize, Serialize};
use tracing::{error, trace};
use wasm_bindgen::JsValue;
use web_sys::{ScrollRestoration, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavKind {
	Patch,
	Redirect,
}

impl NavKind {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			NavKind::Patch => "patch",
			NavKind::Redirect => "redirect",
		}
	}

	/// Parses a live-link attribute value.
	///
	/// # Errors
	///
	/// Anything but `"patch"` or `"redirect"` is rejected.
	pub fn parse(value: &str) -> Result<Self, Error> {
		match value {
			"patch" => Ok(NavKind::Patch),
			"redirect" => Ok(NavKind::Redirect),
			other => Err(Error::InvalidLinkType {
				attribute: crate::constants::PHX_LIVE_LINK,
				value: other.to_owned(),
			}),
		}
	}
}

/// Whether a history write adds an entry or overwrites the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryKind {
	#[default]
	Push,
	Replace,
}

impl HistoryKind {
	/// Reads a link-state attribute. Anything but `"replace"` pushes.
	#[must_use]
	pub fn from_link_state(link_state: Option<&str>) -> Self {
		match link_state {
			Some("replace") => HistoryKind::Replace,
			_ => HistoryKind::Push,
		}
	}
}

/// The state object stored with each history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<NavKind>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub root: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scroll: Option<f64>,
}

impl HistoryState {
	#[must_use]
	pub fn patch(id: impl Into<String>) -> Self {
		Self {
			kind: Some(NavKind::Patch),
			id: Some(id.into()),
			..Self::default()
		}
	}

	#[must_use]
	pub fn redirect(id: impl Into<String>, scroll: f64) -> Self {
		Self {
			kind: Some(NavKind::Redirect),
			id: Some(id.into()),
			scroll: Some(scroll),
			..Self::default()
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
	pub href: String,
	pub pathname: String,
	pub search: String,
	pub hash: String,
}

/// The part of a [`Location`] that identifies a distinct page for navigation purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentLocation {
	pub pathname: String,
	pub search: String,
}

impl CurrentLocation {
	/// Records `location` unless it only differs in its hash. Returns whether it changed.
	pub fn register(&mut self, location: &Location) -> bool {
		if self.pathname == location.pathname && self.search == location.search {
			false
		} else {
			self.pathname = location.pathname.clone();
			self.search = location.search.clone();
			true
		}
	}
}

impl From<&Location> for CurrentLocation {
	fn from(location: &Location) -> Self {
		Self {
			pathname: location.pathname.clone(),
			search: location.search.clone(),
		}
	}
}

pub trait Browser {
	fn location(&self) -> Location;
	fn can_push_state(&self) -> bool;
	fn history_state(&self) -> HistoryState;
	/// Writes `state` to the history without any further policy.
	fn write_history(&self, kind: HistoryKind, state: &HistoryState, url: Option<&str>);
	fn set_manual_scroll_restoration(&self);
	fn scroll_y(&self) -> f64;
	fn scroll_to(&self, y: f64);
	/// Scrolls the element named by the current location hash into view. Returns whether one was found.
	fn scroll_to_hash_target(&self) -> bool;
	/// Full navigation.
	fn assign(&self, url: &str);
	fn reload(&self);
}

#[derive(Debug, Clone)]
pub struct WebBrowser {
	window: Window,
}

impl WebBrowser {
	/// # Errors
	///
	/// Fails outside of a browser window context.
	pub fn new() -> Result<Self, Error> {
		web_sys::window().map(|window| Self { window }).ok_or(Error::NoWindow)
	}
}

fn js_to_state(value: &JsValue) -> HistoryState {
	serde_json::from_value(from_js(value)).unwrap_or_default()
}

fn state_to_js(state: &HistoryState) -> JsValue {
	serde_json::to_value(state).map_or(JsValue::NULL, |state| to_js(&state))
}

impl Browser for WebBrowser {
	fn location(&self) -> Location {
		let location = self.window.location();
		Location {
			href: location.href().unwrap_or_default(),
			pathname: location.pathname().unwrap_or_default(),
			search: location.search().unwrap_or_default(),
			hash: location.hash().unwrap_or_default(),
		}
	}

	fn can_push_state(&self) -> bool {
		self.window.history().is_ok()
	}

	fn history_state(&self) -> HistoryState {
		self.window
			.history()
			.and_then(|history| history.state())
			.map(|state| js_to_state(&state))
			.unwrap_or_default()
	}

	fn write_history(&self, kind: HistoryKind, state: &HistoryState, url: Option<&str>) {
		let history = match self.window.history() {
			Ok(history) => history,
			Err(error) => return error!("No history available: {:?}", error),
		};
		let state = state_to_js(state);
		let result = match kind {
			HistoryKind::Push => history.push_state_with_url(&state, "", url),
			HistoryKind::Replace => history.replace_state_with_url(&state, "", url),
		};
		if let Err(error) = result {
			error!("Failed to write history ({:?}): {:?}", kind, error)
		}
	}

	fn set_manual_scroll_restoration(&self) {
		if let Ok(history) = self.window.history() {
			if let Err(error) = history.set_scroll_restoration(ScrollRestoration::Manual) {
				error!("Failed to set manual scroll restoration: {:?}", error)
			}
		}
	}

	fn scroll_y(&self) -> f64 {
		self.window.scroll_y().unwrap_or(0.0)
	}

	fn scroll_to(&self, y: f64) {
		self.window.scroll_to_with_x_and_y(0.0, y)
	}

	fn scroll_to_hash_target(&self) -> bool {
		let hash = self.window.location().hash().unwrap_or_default();
		let id = hash.trim_start_matches('#');
		if id.is_empty() {
			return false;
		}
		let document = match self.window.document() {
			Some(document) => document,
			None => return false,
		};
		let target = document.get_element_by_id(id).or_else(|| {
			document
				.get_elements_by_name(id)
				.get(0)
				.and_then(|node| wasm_bindgen::JsCast::dyn_into(node).ok())
		});
		match target {
			Some(target) => {
				target.scroll_into_view();
				true
			}
			None => false,
		}
	}

	fn assign(&self, url: &str) {
		if let Err(error) = self.window.location().set_href(url) {
			error!("Failed to navigate to {:?}: {:?}", url, error)
		}
	}

	fn reload(&self) {
		if let Err(error) = self.window.location().reload() {
			error!("Failed to reload: {:?}", error)
		}
	}
}

/// Reads the state of the current entry, lets `update` modify it and writes it back in place.
pub fn update_current_state(browser: &dyn Browser, update: impl FnOnce(&mut HistoryState)) {
	if !browser.can_push_state() {
		return;
	}
	let mut state = browser.history_state();
	update(&mut state);
	let href = browser.location().href;
	browser.write_history(HistoryKind::Replace, &state, Some(&href));
}

/// Writes a navigation entry.
///
/// A redirect first stores its pre-navigation scroll offset in the entry being left,
/// so going back restores it. The scroll offset itself is never carried into the new entry.
/// Without push-state support this degrades to a full navigation.
pub fn push_state(browser: &dyn Browser, kind: HistoryKind, mut meta: HistoryState, to: Option<&str>) {
	if !browser.can_push_state() {
		if let Some(to) = to {
			browser.assign(to)
		}
		return;
	}

	let current_href = browser.location().href;
	if to == Some(current_href.as_str()) {
		trace!("History write for current location skipped.");
		return;
	}

	if meta.kind == Some(NavKind::Redirect) {
		if let Some(scroll) = meta.scroll {
			let mut current = browser.history_state();
			current.scroll = Some(scroll);
			browser.write_history(HistoryKind::Replace, &current, Some(&current_href));
		}
	}
	meta.scroll = None;

	browser.write_history(kind, &meta, to);
	if !browser.scroll_to_hash_target() && meta.kind == Some(NavKind::Redirect) {
		browser.scroll_to(0.0)
	}
}

/// Full page navigation, carrying `flash` through session storage.
pub fn redirect(browser: &dyn Browser, session_storage: &dyn Storage, to: &str, flash: Option<&str>) {
	if let Some(flash) = flash {
		session_storage.set_item(PHX_FLASH, flash)
	}
	browser.assign(to)
}

/// Retrieves and clears a flash stored by [`redirect`].
pub fn take_flash(session_storage: &dyn Storage) -> Option<String> {
	let flash = session_storage.get_item(PHX_FLASH);
	if flash.is_some() {
		session_storage.remove_item(PHX_FLASH)
	}
	flash
}
