//! [`LiveSocket`](`crate::LiveSocket`) construction options.

use crate::{
	browser::Browser,
	constants::{BINDING_PREFIX, DEFAULT_DEBOUNCE, DEFAULT_THROTTLE, LOADER_TIMEOUT},
	storage::Storage,
	view::{Renderer, View},
};
use hashbrown::HashMap;
use serde_json::{Map, Value};
use std::rc::Rc;
use wasm_bindgen::JsValue;
use web_sys::{Element, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
	/// Milliseconds.
	pub debounce: u32,
	/// Milliseconds.
	pub throttle: u32,
}

impl Default for Defaults {
	fn default() -> Self {
		Self {
			debounce: DEFAULT_DEBOUNCE,
			throttle: DEFAULT_THROTTLE,
		}
	}
}

pub type ParamsFn = Box<dyn Fn(&Element) -> Value>;
pub type MetadataFn = Box<dyn Fn(&web_sys::Event, &Element) -> Map<String, Value>>;
pub type ViewLogger = Box<dyn Fn(&View, &str, &str, &Value)>;

/// Hooks into DOM mutation, for use by the [`Renderer`].
#[derive(Default)]
pub struct DomCallbacks {
	pub on_node_added: Option<Box<dyn Fn(&Node)>>,
	pub on_before_el_updated: Option<Box<dyn Fn(&Element, &Element)>>,
}

pub struct Options {
	pub binding_prefix: String,
	pub defaults: Defaults,
	/// Connect params sent with each view's join, computed from the view's element.
	pub params: Option<ParamsFn>,
	pub hooks: HashMap<String, JsValue>,
	pub uploaders: HashMap<String, JsValue>,
	/// Delay in milliseconds before a navigating view shows its loading state.
	pub loader_timeout: u32,
	pub view_logger: Option<ViewLogger>,
	/// Extra event metadata per binding kind (`"click"`, `"keydown"`, …).
	pub metadata: HashMap<String, MetadataFn>,
	pub session_storage: Option<Rc<dyn Storage>>,
	pub local_storage: Option<Rc<dyn Storage>>,
	pub dom: DomCallbacks,
	pub renderer: Option<Rc<dyn Renderer>>,
	pub browser: Option<Rc<dyn Browser>>,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			binding_prefix: BINDING_PREFIX.to_owned(),
			defaults: Defaults::default(),
			params: None,
			hooks: HashMap::new(),
			uploaders: HashMap::new(),
			loader_timeout: LOADER_TIMEOUT,
			view_logger: None,
			metadata: HashMap::new(),
			session_storage: None,
			local_storage: None,
			dom: DomCallbacks::default(),
			renderer: None,
			browser: None,
		}
	}
}

impl Options {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_binding_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.binding_prefix = prefix.into();
		self
	}

	#[must_use]
	pub fn with_defaults(mut self, defaults: Defaults) -> Self {
		self.defaults = defaults;
		self
	}

	#[must_use]
	pub fn with_params(mut self, params: impl Fn(&Element) -> Value + 'static) -> Self {
		self.params = Some(Box::new(params));
		self
	}

	#[must_use]
	pub fn with_hook(mut self, name: impl Into<String>, hook: JsValue) -> Self {
		self.hooks.insert(name.into(), hook);
		self
	}

	#[must_use]
	pub fn with_uploader(mut self, name: impl Into<String>, uploader: JsValue) -> Self {
		self.uploaders.insert(name.into(), uploader);
		self
	}

	#[must_use]
	pub fn with_loader_timeout(mut self, ms: u32) -> Self {
		self.loader_timeout = ms;
		self
	}

	#[must_use]
	pub fn with_view_logger(mut self, logger: impl Fn(&View, &str, &str, &Value) + 'static) -> Self {
		self.view_logger = Some(Box::new(logger));
		self
	}

	#[must_use]
	pub fn with_metadata(mut self, kind: impl Into<String>, extract: impl Fn(&web_sys::Event, &Element) -> Map<String, Value> + 'static) -> Self {
		self.metadata.insert(kind.into(), Box::new(extract));
		self
	}

	#[must_use]
	pub fn with_session_storage(mut self, storage: Rc<dyn Storage>) -> Self {
		self.session_storage = Some(storage);
		self
	}

	#[must_use]
	pub fn with_local_storage(mut self, storage: Rc<dyn Storage>) -> Self {
		self.local_storage = Some(storage);
		self
	}

	#[must_use]
	pub fn with_dom_callbacks(mut self, dom: DomCallbacks) -> Self {
		self.dom = dom;
		self
	}

	#[must_use]
	pub fn with_renderer(mut self, renderer: Rc<dyn Renderer>) -> Self {
		self.renderer = Some(renderer);
		self
	}

	#[must_use]
	pub fn with_browser(mut self, browser: Rc<dyn Browser>) -> Self {
		self.browser = Some(browser);
		self
	}
}
