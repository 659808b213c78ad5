//! The connection supervisor.

use crate::{
	backoff::{Backoff, BackoffPolicy},
	browser::{self, Browser, CurrentLocation, NavKind, WebBrowser},
	channel::{Channel, Push, PushOpts, ReplyKind, Socket},
	config::{Defaults, Options},
	constants::{PHX_MAIN, PHX_PARENT_ID, PHX_VIEW_SELECTOR},
	devtools::{self, DeferredPush},
	dom,
	error::Error,
	events::EventBinder,
	js_socket::JsSocket,
	listeners::{ListenerOptions, Listeners},
	navigation::LinkTracker,
	private::PrivateStore,
	storage::{self, Storage},
	view::View,
	view_tree::ViewTree,
};
use core::cell::{Cell, RefCell};
use gloo_timers::callback::Timeout;
use serde_json::{Map, Value};
use std::rc::{Rc, Weak};
use tracing::{error, info, instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, Node};

#[derive(Debug, Default)]
struct Focus {
	active: Option<Element>,
	prev_active: Option<Element>,
	/// One-shot `mouseup`/`touchend` listeners on `active`.
	release: Listeners,
}

/// One page session's connection to the server, and everything bound to it.
///
/// Create one per page with [`LiveSocket::new`] and call [`connect`](`LiveSocket::connect`).
pub struct LiveSocket {
	this: Weak<LiveSocket>,
	endpoint: String,
	socket: Rc<dyn Socket>,
	options: Options,
	session_storage: Rc<dyn Storage>,
	local_storage: Rc<dyn Storage>,
	browser: Rc<dyn Browser>,
	/// Set irreversibly on `pagehide`.
	unloaded: Rc<Cell<bool>>,
	socket_opened: Cell<bool>,
	silenced: Cell<bool>,
	views: RefCell<ViewTree>,
	pub(crate) links: RefCell<LinkTracker>,
	pub(crate) current_location: RefCell<CurrentLocation>,
	binder: RefCell<EventBinder>,
	private: Rc<RefCell<PrivateStore>>,
	focus: RefCell<Focus>,
	/// `pagehide` and deferred `DOMContentLoaded`.
	lifecycle: RefCell<Listeners>,
}

impl core::fmt::Debug for LiveSocket {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("LiveSocket")
			.field("endpoint", &self.endpoint)
			.field("unloaded", &self.unloaded.get())
			.field("socket_opened", &self.socket_opened.get())
			.field("views", &self.views)
			.field("links", &self.links)
			.finish_non_exhaustive()
	}
}

fn window_storage(name: &'static str, storage: impl FnOnce(&web_sys::Window) -> Result<Option<web_sys::Storage>, JsValue>) -> Result<Rc<dyn Storage>, Error> {
	let window = web_sys::window().ok_or(Error::NoWindow)?;
	match storage(&window) {
		Ok(Some(storage)) => Ok(Rc::new(storage)),
		_ => Err(Error::StorageUnavailable(name)),
	}
}

impl LiveSocket {
	/// # Errors
	///
	/// Fails if `endpoint` is empty, or if no storage or browser was configured and the
	/// corresponding `window` facility is unavailable.
	#[instrument(skip(socket, options))]
	pub fn new(endpoint: &str, socket: Rc<dyn Socket>, mut options: Options) -> Result<Rc<Self>, Error> {
		if endpoint.is_empty() {
			return Err(Error::EmptyEndpoint);
		}
		let session_storage = match options.session_storage.take() {
			Some(storage) => storage,
			None => window_storage("sessionStorage", web_sys::Window::session_storage)?,
		};
		let local_storage = match options.local_storage.take() {
			Some(storage) => storage,
			None => window_storage("localStorage", web_sys::Window::local_storage)?,
		};
		let browser: Rc<dyn Browser> = match options.browser.take() {
			Some(browser) => browser,
			None => Rc::new(WebBrowser::new()?),
		};
		let location = browser.location();

		let live_socket = Rc::new_cyclic(|this| Self {
			this: this.clone(),
			endpoint: endpoint.to_owned(),
			socket,
			options,
			session_storage,
			local_storage,
			browser,
			unloaded: Rc::new(Cell::new(false)),
			socket_opened: Cell::new(false),
			silenced: Cell::new(false),
			views: RefCell::new(ViewTree::new()),
			links: RefCell::new(LinkTracker::new(location.href.clone())),
			current_location: RefCell::new(CurrentLocation::from(&location)),
			binder: RefCell::new(EventBinder::new()),
			private: Rc::new(RefCell::new(PrivateStore::new())),
			focus: RefCell::new(Focus::default()),
			lifecycle: RefCell::new(Listeners::new()),
		});

		if let Some(window) = web_sys::window() {
			let unloaded = live_socket.unloaded.clone();
			live_socket
				.lifecycle
				.borrow_mut()
				.add(&window, "pagehide", ListenerOptions::BUBBLE, move |_| unloaded.set(true));
		}
		let this = live_socket.this.clone();
		live_socket.socket.on_open(Box::new(move || {
			if let Some(socket) = this.upgrade() {
				if socket.is_unloaded() {
					info!("Socket opened in a page restored after unloading. Reloading.");
					socket.browser.reload()
				}
			}
		}));
		Ok(live_socket)
	}

	/// Constructs with a Phoenix-compatible JavaScript socket class.
	///
	/// # Errors
	///
	/// See [`JsSocket::new`] and [`LiveSocket::new`].
	pub fn with_js_socket(endpoint: &str, constructor: &JsValue, socket_options: &JsValue, options: Options) -> Result<Rc<Self>, Error> {
		let socket = JsSocket::new(constructor, endpoint, socket_options)?;
		Self::new(endpoint, Rc::new(socket), options)
	}

	pub(crate) fn this(&self) -> Weak<LiveSocket> {
		self.this.clone()
	}

	#[must_use]
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	#[must_use]
	pub fn transport(&self) -> Rc<dyn Socket> {
		self.socket.clone()
	}

	#[must_use]
	pub fn browser(&self) -> Rc<dyn Browser> {
		self.browser.clone()
	}

	#[must_use]
	pub fn session_storage(&self) -> &dyn Storage {
		self.session_storage.as_ref()
	}

	#[must_use]
	pub fn local_storage(&self) -> &dyn Storage {
		self.local_storage.as_ref()
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.options
	}

	#[must_use]
	pub fn defaults(&self) -> Defaults {
		self.options.defaults
	}

	pub(crate) fn private(&self) -> &Rc<RefCell<PrivateStore>> {
		&self.private
	}

	pub(crate) fn binder(&self) -> &RefCell<EventBinder> {
		&self.binder
	}

	#[must_use]
	pub fn is_unloaded(&self) -> bool {
		self.unloaded.get()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.socket.is_connected()
	}

	/// Whether the global listeners are installed.
	#[must_use]
	pub fn is_bound(&self) -> bool {
		self.binder.borrow().is_bound()
	}

	/// Joins all root views in the document, then binds the global listeners and opens the socket.
	///
	/// Waits for `DOMContentLoaded` if the document is still loading. Does nothing without root views.
	#[instrument(skip(self))]
	pub fn connect(&self) {
		let document = match dom::document() {
			Some(document) => document,
			None => return error!("No document to connect."),
		};
		if matches!(document.ready_state().as_str(), "complete" | "loaded" | "interactive") {
			return self.do_connect();
		}
		let this = self.this.clone();
		self.lifecycle
			.borrow_mut()
			.add(&document, "DOMContentLoaded", ListenerOptions::ONCE, move |_| {
				if let Some(socket) = this.upgrade() {
					socket.do_connect()
				}
			});
	}

	fn do_connect(&self) {
		if !self.join_root_views() {
			return trace!("No root views found.");
		}
		self.binder.borrow_mut().bind(self);
		if !self.socket_opened.replace(true) {
			self.socket.open()
		}
	}

	fn join_root_views(&self) -> bool {
		let document = match dom::document() {
			Some(document) => document,
			None => return false,
		};
		let roots = dom::all_in_document(&document, &format!("{}:not([{}])", PHX_VIEW_SELECTOR, PHX_PARENT_ID));
		let mut flash = browser::take_flash(self.session_storage.as_ref());
		for el in &roots {
			if self.get_root_by_id(&el.id()).is_some() {
				continue;
			}
			let is_main = el.has_attribute(PHX_MAIN);
			let view = self.views.borrow_mut().new_root_view(self.this.clone(), el.clone(), flash.take());
			view.set_href(self.href());
			if is_main {
				self.views.borrow_mut().set_main(Some(view.clone()))
			}
			view.join(None);
		}
		!roots.is_empty()
	}

	/// Closes the socket. `callback` runs once it is closed.
	pub fn disconnect(&self, callback: Option<Box<dyn FnOnce()>>) {
		self.socket_opened.set(false);
		self.socket.close(callback)
	}

	/// Disconnects and navigates away, keeping `flash` for the next page.
	#[instrument(skip(self, flash))]
	pub fn redirect(&self, to: &str, flash: Option<&str>) {
		self.disconnect(None);
		browser::redirect(self.browser.as_ref(), self.session_storage.as_ref(), to, flash)
	}

	/// Replaces the main view with a new one joined at `href`.
	///
	/// The new view renders into an empty clone of the main element, which is swapped into the
	/// document after the first join only if `link_ref` is still the current link reference.
	/// It replaces whichever main element is on the page by then, which is an older one while an
	/// earlier replacement has not joined yet.
	/// Without `link_ref`, a new navigation is started.
	#[instrument(skip(self, flash, callback))]
	pub fn replace_main(&self, href: &str, flash: Option<String>, callback: Option<Box<dyn FnOnce()>>, link_ref: Option<u64>) {
		let link_ref = link_ref.unwrap_or_else(|| self.set_pending_link(href));
		let old_main = match self.main() {
			Some(main) => main,
			None => return warn!("No main view to replace."),
		};
		let old_el = old_main.el().clone();
		let new_el = match dom::clone_shallow(&old_el) {
			Some(new_el) => new_el,
			None => return error!("Failed to clone the main element."),
		};
		old_main.show_loader(self.options.loader_timeout);
		old_main.destroy();

		let main = {
			let mut views = self.views.borrow_mut();
			views.remove_root(old_main.id());
			let main = views.new_root_view(self.this.clone(), new_el.clone(), flash);
			views.set_main(Some(main.clone()));
			main
		};
		main.set_redirect(href);

		let this = self.this.clone();
		let mut callback = callback;
		main.join(Some(Box::new(move |join_count| {
			let socket = match this.upgrade() {
				Some(socket) => socket,
				None => return,
			};
			if join_count == 1 && socket.commit_pending_link(link_ref) {
				match displayed_main(&old_el) {
					Some(displayed) => {
						if let Err(error) = displayed.replace_with_with_node_1(&new_el) {
							error!("Failed to swap in the new main element: {:?}", error)
						}
					}
					None => error!("No main element in the document to replace."),
				}
				if let Some(callback) = callback.take() {
					callback()
				}
			} else {
				trace!("Superseded main view join discarded.")
			}
		})));
	}

	/// Wraps an outbound push.
	///
	/// With simulated latency, the push is sent late and a stand-in handle is returned.
	/// Otherwise with `opts.timeout`, a reply timeout reloads the page unless the view rejoined
	/// or was destroyed in the meantime.
	pub fn wrap_push(&self, view: &Rc<View>, opts: PushOpts, push: impl FnOnce() -> Box<dyn Push> + 'static) -> Box<dyn Push> {
		if let Some(latency) = devtools::latency_sim(self.session_storage.as_ref()) {
			let view = Rc::downgrade(view);
			let should_send = move || view.upgrade().map_or(false, |view| !view.is_destroyed());
			return Box::new(DeferredPush::schedule(latency, should_send, push));
		}
		let push = push();
		if !opts.timeout {
			return push;
		}

		let old_join_count = view.join_count();
		let (weak_view, this) = (Rc::downgrade(view), self.this.clone());
		push.receive(
			ReplyKind::Timeout,
			Box::new(move |_| {
				let (view, socket) = match (weak_view.upgrade(), this.upgrade()) {
					(Some(view), Some(socket)) => (view, socket),
					_ => return,
				};
				if view.join_count() == old_join_count && !view.is_destroyed() {
					socket.reload_with_jitter(
						&view,
						Some(("timeout", "received timeout while communicating with server. Falling back to hard refresh for recovery")),
					);
				}
			}),
		)
	}

	/// Subscribes to server messages on `channel`, delivered late under simulated latency.
	pub fn on_channel(&self, channel: &dyn Channel, event: &str, callback: impl Fn(Value) + 'static) {
		let storage = self.session_storage.clone();
		let callback: Rc<dyn Fn(Value)> = Rc::new(callback);
		channel.on(event, Box::new(move |message| devtools::deliver(storage.as_ref(), message, callback.clone())))
	}

	/// Destroys `view`, disconnects and schedules a reload after a jittered delay.
	///
	/// Each call counts as a consecutive reload of the current path. Once the count exceeds the
	/// threshold, the fixed failsafe delay is used instead. The reload follows a pending link if
	/// there is one. `log` overrides the default log entry as `(kind, message)`.
	#[instrument(skip(self, view, log), fields(view = view.id()))]
	pub fn reload_with_jitter(&self, view: &Rc<View>, log: Option<(&str, &str)>) -> Backoff {
		view.destroy();
		self.disconnect(None);

		let path = self.browser.location().pathname;
		let tries = storage::bump_consecutive_reloads(self.local_storage.as_ref(), &path);
		match log {
			Some((kind, message)) => self.log(view, kind, || (message.to_owned(), Value::Null)),
			None => self.log(view, "join", || (format!("encountered {} consecutive reloads", tries), Value::Null)),
		}
		let policy = BackoffPolicy::default();
		let backoff = policy.jittered(tries);
		if backoff.is_failsafe {
			self.log(view, "join", || (format!("exceeded {} consecutive reloads. Entering failsafe mode", policy.max_reloads), Value::Null));
		}

		let this = self.this.clone();
		Timeout::new(backoff.delay_ms, move || {
			let socket = match this.upgrade() {
				Some(socket) => socket,
				None => return,
			};
			let pending = socket.links.borrow().pending().map(str::to_owned);
			match pending {
				Some(pending) => socket.browser.assign(&pending),
				None => socket.browser.reload(),
			}
		})
		.forget();
		backoff
	}

	#[must_use]
	pub fn get_root_by_id(&self, id: &str) -> Option<Rc<View>> {
		self.views.borrow().get_root_by_id(id)
	}

	#[must_use]
	pub fn get_view_by_el(&self, el: &Element) -> Option<Rc<View>> {
		self.views.borrow().get_view_by_el(el)
	}

	#[must_use]
	pub fn main(&self) -> Option<Rc<View>> {
		self.views.borrow().main()
	}

	#[must_use]
	pub fn root_views(&self) -> Vec<Rc<View>> {
		self.views.borrow().roots()
	}

	/// Creates and registers a root view without joining it.
	pub fn new_root_view(&self, el: Element, flash: Option<String>) -> Rc<View> {
		self.views.borrow_mut().new_root_view(self.this.clone(), el, flash)
	}

	pub fn destroy_all_views(&self) {
		let roots = self.views.borrow_mut().take_all();
		for root in roots {
			root.destroy()
		}
	}

	/// Destroys the view anchored at `el`, leaving its siblings alone.
	pub fn destroy_view_by_el(&self, el: &Element) {
		let view = self.views.borrow_mut().take_view_by_el(el);
		if let Some(view) = view {
			view.destroy()
		}
	}

	/// The nearest view enclosing `el`.
	#[must_use]
	pub fn owner(&self, el: &Element) -> Option<Rc<View>> {
		self.views.borrow().owner(el)
	}

	/// Calls `callback` with `el`'s owner, or with the views named by `el`'s target attribute.
	pub fn within_owners(&self, el: &Element, callback: &mut dyn FnMut(Rc<View>, crate::view::TargetCtx)) {
		let view = match self.owner(el) {
			Some(view) => view,
			None => return trace!("Event outside of any view dropped."),
		};
		match el.get_attribute(&self.binding(crate::constants::PHX_TARGET)) {
			None => callback(view, crate::view::TargetCtx::Element(el.clone())),
			Some(phx_target) => view.within_targets(&phx_target, callback),
		}
	}

	pub(crate) fn render_view(&self, view: &View, rendered: &Value) {
		match &self.options.renderer {
			Some(renderer) => renderer.render(view, rendered),
			None => trace!("No renderer configured; render of {:?} skipped.", view.id()),
		}
		self.prune_detached()
	}

	pub(crate) fn update_view(&self, view: &View, diff: &Value) {
		if let Some(renderer) = &self.options.renderer {
			self.time("partial render", || renderer.update(view, diff));
			self.prune_detached()
		}
	}

	pub fn trigger_node_added(&self, node: &Node) {
		if let Some(on_node_added) = &self.options.dom.on_node_added {
			on_node_added(node)
		}
	}

	pub fn trigger_before_el_updated(&self, from: &Element, to: &Element) {
		if let Some(on_before_el_updated) = &self.options.dom.on_before_el_updated {
			on_before_el_updated(from, to)
		}
	}

	/// The configured binding prefix followed by `kind`.
	#[must_use]
	pub fn binding(&self, kind: &str) -> String {
		format!("{}{}", self.options.binding_prefix, kind)
	}

	/// Extra metadata for an event of `kind`, from the configured extractor.
	#[must_use]
	pub fn event_meta(&self, kind: &str, event: &web_sys::Event, target: &Element) -> Map<String, Value> {
		self.options.metadata.get(kind).map_or_else(Map::new, |extract| extract(event, target))
	}

	#[must_use]
	pub fn connect_params(&self, el: &Element) -> Value {
		self.options.params.as_ref().map_or_else(|| Value::Object(Map::new()), |params| params(el))
	}

	#[must_use]
	pub fn hook_callbacks(&self, name: &str) -> Option<&JsValue> {
		self.options.hooks.get(name)
	}

	#[must_use]
	pub fn uploader(&self, name: &str) -> Option<&JsValue> {
		self.options.uploaders.get(name)
	}

	/// Files attached to `input` through drop or `track-uploads`.
	#[must_use]
	pub fn tracked_files(&self, input: &Element) -> Vec<web_sys::Blob> {
		self.private
			.borrow()
			.get(input)
			.map(|state| state.tracked_files.clone())
			.unwrap_or_default()
	}

	/// Whether `input` has been edited through its form's change binding.
	///
	/// For renderers that hold back validation feedback until an input was touched.
	#[must_use]
	pub fn has_focused(&self, input: &Element) -> bool {
		self.private.borrow().get(input).map_or(false, |state| state.has_focused)
	}

	/// Starts a navigation to `href`. Returns its link reference.
	pub fn set_pending_link(&self, href: &str) -> u64 {
		self.links.borrow_mut().set_pending(href)
	}

	/// See [`LinkTracker::commit`].
	pub fn commit_pending_link(&self, link_ref: u64) -> bool {
		self.links.borrow_mut().commit(link_ref)
	}

	#[must_use]
	pub fn has_pending_link(&self) -> bool {
		self.links.borrow().has_pending()
	}

	/// The last committed location.
	#[must_use]
	pub fn href(&self) -> String {
		self.links.borrow().href().to_owned()
	}

	/// Routes a view log entry to the configured logger, or to `tracing`.
	///
	/// `message` is only evaluated if the entry is emitted.
	pub fn log(&self, view: &View, kind: &str, message: impl FnOnce() -> (String, Value)) {
		if let Some(logger) = &self.options.view_logger {
			let (message, detail) = message();
			logger(view, kind, &message, &detail)
		} else if devtools::is_debug_enabled(self.session_storage.as_ref()) {
			let (message, detail) = message();
			info!(view = view.id(), kind, "{} {}", message, detail)
		} else {
			let (message, _) = message();
			trace!(view = view.id(), kind, "{}", message)
		}
	}

	pub fn time<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
		devtools::time(self.session_storage.as_ref(), name, f)
	}

	pub fn enable_debug(&self) {
		devtools::enable_debug(self.session_storage.as_ref())
	}

	pub fn disable_debug(&self) {
		devtools::disable_debug(self.session_storage.as_ref())
	}

	#[must_use]
	pub fn is_debug_enabled(&self) -> bool {
		devtools::is_debug_enabled(self.session_storage.as_ref())
	}

	pub fn enable_profiling(&self) {
		devtools::enable_profiling(self.session_storage.as_ref())
	}

	pub fn disable_profiling(&self) {
		devtools::disable_profiling(self.session_storage.as_ref())
	}

	#[must_use]
	pub fn is_profile_enabled(&self) -> bool {
		devtools::is_profile_enabled(self.session_storage.as_ref())
	}

	pub fn enable_latency_sim(&self, upper_bound_ms: u32) {
		devtools::enable_latency_sim(self.session_storage.as_ref(), upper_bound_ms)
	}

	pub fn disable_latency_sim(&self) {
		devtools::disable_latency_sim(self.session_storage.as_ref())
	}

	#[must_use]
	pub fn latency_sim(&self) -> Option<u32> {
		devtools::latency_sim(self.session_storage.as_ref())
	}

	/// Runs `f` with the global listeners muted.
	pub fn silence_events<T>(&self, f: impl FnOnce() -> T) -> T {
		let was_silenced = self.silenced.replace(true);
		let result = f();
		self.silenced.set(was_silenced);
		result
	}

	#[must_use]
	pub fn is_silenced(&self) -> bool {
		self.silenced.get()
	}

	/// Tracks `target` as focused until the next `mouseup` or `touchend` on it.
	///
	/// Mouse and touch release can move browser focus while a value is still being coerced.
	pub fn set_active_element(&self, target: &Element) {
		let mut focus = self.focus.borrow_mut();
		if focus.active.as_ref() == Some(target) {
			return;
		}
		focus.active = Some(target.clone());
		focus.release.clear();
		for event in ["mouseup", "touchend"] {
			let (this, released) = (self.this.clone(), target.clone());
			focus.release.add(target, event, ListenerOptions::ONCE, move |_| {
				if let Some(socket) = this.upgrade() {
					let mut focus = socket.focus.borrow_mut();
					if focus.active.as_ref() == Some(&released) {
						focus.active = None
					}
				}
			})
		}
	}

	/// The browser's focused element, or the tracked one while the browser reports `body`.
	#[must_use]
	pub fn active_element(&self) -> Option<Element> {
		let document = dom::document()?;
		let body: Option<Element> = document.body().map(Into::into);
		match document.active_element() {
			Some(active) if Some(&active) != body.as_ref() => Some(active),
			_ => self.focus.borrow().active.clone().or(body),
		}
	}

	/// Blurs the focused element, remembering it for [`restore_previously_active_focus`](`LiveSocket::restore_previously_active_focus`).
	pub fn blur_active_element(&self) {
		let active = self.active_element();
		if let Some(active) = &active {
			if !is_body(active) {
				if let Some(active) = active.dyn_ref::<HtmlElement>() {
					if let Err(error) = active.blur() {
						error!("Failed to blur: {:?}", error)
					}
				}
			}
		}
		self.focus.borrow_mut().prev_active = active;
	}

	pub fn restore_previously_active_focus(&self) {
		let previous = self.focus.borrow().prev_active.clone();
		if let Some(previous) = previous.filter(|previous| !is_body(previous)) {
			if let Some(previous) = previous.dyn_ref::<HtmlElement>() {
				if let Err(error) = previous.focus() {
					error!("Failed to restore focus: {:?}", error)
				}
			}
		}
	}

	/// Forgets the previously focused element if `view` owns it.
	pub fn drop_active_element(&self, view: &View) {
		let mut focus = self.focus.borrow_mut();
		if focus.prev_active.as_ref().map_or(false, |previous| view.owns_element(previous)) {
			focus.prev_active = None
		}
	}

	pub(crate) fn on_bfcache_restore(&self) {
		info!("Page restored from the back/forward cache. Reloading.");
		self.disconnect(None);
		let _ = self.with_page_loading(&self.browser.location().href, NavKind::Redirect);
		self.browser.reload()
	}

	/// Forgets private state of elements that left the document.
	///
	/// Their listeners are removed on the next tick, since this may run inside one of them.
	pub fn prune_detached(&self) {
		let released = self.private.borrow_mut().prune();
		if released.is_empty() {
			return;
		}
		trace!("Releasing listeners of {} detached element(s).", released.len());
		Timeout::new(0, move || drop(released)).forget();
	}
}

/// `el` if it is in the document, otherwise the element it was cloned from.
///
/// Main elements are cloned with their id, so the one still shown can be found by it.
fn displayed_main(el: &Element) -> Option<Element> {
	if el.is_connected() {
		return Some(el.clone());
	}
	dom::document()?.get_element_by_id(&el.id())
}

fn is_body(el: &Element) -> bool {
	el.tag_name().eq_ignore_ascii_case("body")
}
