//! A single live view: one DOM subtree bound to one server-side channel.

use crate::{
	browser::HistoryKind,
	channel::{Channel, Push, PushOpts, ReplyKind},
	constants::{PHX_COMPONENT, PHX_CONNECTED_CLASS, PHX_LOADING_CLASS, PHX_PARENT_ID, PHX_ROOT_ID, PHX_SESSION, PHX_STATIC, PHX_VALUE, PHX_VIEW_SELECTOR, PUSH_TIMEOUT},
	dom,
	socket::LiveSocket,
};
use core::cell::{Cell, RefCell};
use gloo_timers::callback::Timeout;
use hashbrown::HashMap;
use serde_json::{json, Map, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, error, instrument, trace, warn};
use wasm_bindgen::JsCast;
use web_sys::{Element, FormData, HtmlFormElement, HtmlInputElement, UrlSearchParams};

/// Applies server-rendered content to a view's element.
pub trait Renderer {
	/// Full render after a (re)join.
	fn render(&self, view: &View, rendered: &Value);

	/// Incremental update pushed by the server or returned in a reply.
	fn update(&self, view: &View, diff: &Value) {
		self.render(view, diff)
	}
}

/// Where a pushed event is addressed within the owning view.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetCtx {
	Element(Element),
	Component(u32),
}

thread_local! {
	static NEXT_ID: Cell<u32> = Cell::new(0);
}

fn ensure_id(element: &Element) -> String {
	let id = element.id();
	if !id.is_empty() {
		return id;
	}
	let id = NEXT_ID.with(|next| {
		next.set(next.get() + 1);
		format!("phx-generated-{}", next.get())
	});
	element.set_id(&id);
	id
}

fn set_loading(element: &Element, loading: bool) {
	let classes = element.class_list();
	let result = if loading {
		classes.add_1(PHX_LOADING_CLASS).and_then(|()| classes.remove_1(PHX_CONNECTED_CLASS))
	} else {
		classes.remove_1(PHX_LOADING_CLASS).and_then(|()| classes.add_1(PHX_CONNECTED_CLASS))
	};
	if let Err(error) = result {
		error!("Failed to update loading classes: {:?}", error)
	}
}

fn serialize_form(form: &HtmlFormElement) -> String {
	FormData::new_with_form(form)
		.and_then(|data| UrlSearchParams::new_with_str_sequence_sequence(&data))
		.map(|params| String::from(params.to_string()))
		.unwrap_or_else(|error| {
			error!("Failed to serialize form: {:?}", error);
			String::new()
		})
}

pub struct View {
	this: Weak<View>,
	id: String,
	el: Element,
	parent_id: Option<String>,
	/// [`None`] for roots.
	root: Option<Weak<View>>,
	socket: Weak<LiveSocket>,
	channel: RefCell<Option<Rc<dyn Channel>>>,
	join_count: Cell<u32>,
	joined: Cell<bool>,
	destroyed: Cell<bool>,
	flash: Option<String>,
	href: RefCell<Option<String>>,
	redirect: Cell<bool>,
	children: RefCell<Vec<Rc<View>>>,
	/// Every live descendant by id. Only populated on roots.
	descendants: RefCell<HashMap<String, Rc<View>>>,
	loader_timer: RefCell<Option<Timeout>>,
}

impl core::fmt::Debug for View {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("View")
			.field("id", &self.id)
			.field("parent_id", &self.parent_id)
			.field("join_count", &self.join_count.get())
			.field("joined", &self.joined.get())
			.field("destroyed", &self.destroyed.get())
			.finish_non_exhaustive()
	}
}

impl View {
	pub(crate) fn new_root(socket: Weak<LiveSocket>, el: Element, flash: Option<String>) -> Rc<Self> {
		let id = ensure_id(&el);
		if let Err(error) = el.set_attribute(PHX_ROOT_ID, &id) {
			error!("Failed to stamp root id: {:?}", error)
		}
		Rc::new_cyclic(|this| Self {
			this: this.clone(),
			id,
			el,
			parent_id: None,
			root: None,
			socket,
			channel: RefCell::new(None),
			join_count: Cell::new(0),
			joined: Cell::new(false),
			destroyed: Cell::new(false),
			flash,
			href: RefCell::new(None),
			redirect: Cell::new(false),
			children: RefCell::new(Vec::new()),
			descendants: RefCell::new(HashMap::new()),
			loader_timer: RefCell::new(None),
		})
	}

	fn new_child(parent: &View, el: Element) -> Option<Rc<Self>> {
		let root = parent.root()?;
		let id = ensure_id(&el);
		if let Err(error) = el.set_attribute(PHX_ROOT_ID, root.id()) {
			error!("Failed to stamp root id: {:?}", error)
		}
		let child = Rc::new_cyclic(|this| Self {
			this: this.clone(),
			id: id.clone(),
			el,
			parent_id: Some(parent.id.clone()),
			root: Some(Rc::downgrade(&root)),
			socket: parent.socket.clone(),
			channel: RefCell::new(None),
			join_count: Cell::new(0),
			joined: Cell::new(false),
			destroyed: Cell::new(false),
			flash: None,
			href: RefCell::new(None),
			redirect: Cell::new(false),
			children: RefCell::new(Vec::new()),
			descendants: RefCell::new(HashMap::new()),
			loader_timer: RefCell::new(None),
		});
		root.descendants.borrow_mut().insert(id, child.clone());
		parent.children.borrow_mut().push(child.clone());
		Some(child)
	}

	#[must_use]
	pub fn id(&self) -> &str {
		&self.id
	}

	#[must_use]
	pub fn el(&self) -> &Element {
		&self.el
	}

	#[must_use]
	pub fn parent_id(&self) -> Option<&str> {
		self.parent_id.as_deref()
	}

	#[must_use]
	pub fn is_root(&self) -> bool {
		self.root.is_none()
	}

	/// [`None`] for roots and for children whose parent is already gone.
	#[must_use]
	pub fn parent(&self) -> Option<Rc<View>> {
		let parent_id = self.parent_id.as_deref()?;
		let root = self.root()?;
		if root.id == parent_id {
			Some(root)
		} else {
			root.descendants.borrow().get(parent_id).cloned()
		}
	}

	#[must_use]
	pub fn child_count(&self) -> usize {
		self.children.borrow().len()
	}

	/// The root of this view's tree, which may be the view itself.
	#[must_use]
	pub fn root(&self) -> Option<Rc<View>> {
		match &self.root {
			None => self.this.upgrade(),
			Some(root) => root.upgrade(),
		}
	}

	/// Incremented once per successful (re)join.
	#[must_use]
	pub fn join_count(&self) -> u32 {
		self.join_count.get()
	}

	#[must_use]
	pub fn is_destroyed(&self) -> bool {
		self.destroyed.get()
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.joined.get() && !self.destroyed.get()
	}

	#[must_use]
	pub fn flash(&self) -> Option<&str> {
		self.flash.as_deref()
	}

	pub fn set_href(&self, href: impl Into<String>) {
		*self.href.borrow_mut() = Some(href.into());
		self.redirect.set(false)
	}

	/// Like [`set_href`](`View::set_href`), but joins as a redirect target.
	pub fn set_redirect(&self, href: impl Into<String>) {
		*self.href.borrow_mut() = Some(href.into());
		self.redirect.set(true)
	}

	#[must_use]
	pub fn href(&self) -> Option<String> {
		self.href.borrow().clone()
	}

	/// Whether `el` belongs to this view rather than to a nested one.
	#[must_use]
	pub fn owns_element(&self, el: &Element) -> bool {
		matches!(el.closest(PHX_VIEW_SELECTOR), Ok(Some(owner)) if owner.id() == self.id)
	}

	/// Resolves `el` (a view element stamped with this root's id) to its view.
	#[must_use]
	pub fn get_descendent_by_el(&self, el: &Element) -> Option<Rc<View>> {
		let id = el.id();
		if id == self.id {
			self.this.upgrade()
		} else {
			self.descendants.borrow().get(&id).cloned()
		}
	}

	pub fn destroy_descendent(&self, id: &str) {
		let descendant = self.descendants.borrow().get(id).cloned();
		if let Some(descendant) = descendant {
			descendant.destroy()
		}
	}

	/// Number of live descendants. Only meaningful on roots.
	#[must_use]
	pub fn descendant_count(&self) -> usize {
		self.descendants.borrow().len()
	}

	fn join_params(&self, socket: &LiveSocket) -> Value {
		let mut params = Map::new();
		let url = self.href().unwrap_or_else(|| socket.href());
		params.insert(if self.redirect.get() { "redirect" } else { "url" }.to_owned(), Value::String(url));
		params.insert("params".to_owned(), socket.connect_params(&self.el));
		params.insert("session".to_owned(), Value::String(self.el.get_attribute(PHX_SESSION).unwrap_or_default()));
		params.insert("static".to_owned(), self.el.get_attribute(PHX_STATIC).map_or(Value::Null, Value::String));
		if let Some(flash) = &self.flash {
			params.insert("flash".to_owned(), Value::String(flash.clone()));
		}
		Value::Object(params)
	}

	/// Opens this view's channel and joins it.
	///
	/// `on_joined` receives the new join count after the first successful join of this call,
	/// unless the view has been destroyed by then.
	#[instrument(skip(self, on_joined), fields(id = %self.id))]
	pub fn join(&self, on_joined: Option<Box<dyn FnOnce(u32)>>) {
		let (socket, this) = match (self.socket.upgrade(), self.this.upgrade()) {
			(Some(socket), Some(this)) => (socket, this),
			_ => return,
		};
		let channel = socket.transport().channel(&format!("lv:{}", self.id), self.join_params(&socket));
		self.bind_channel(&socket, &channel);
		*self.channel.borrow_mut() = Some(channel.clone());

		let (on_ok, on_error, on_timeout) = (self.this.clone(), self.this.clone(), self.this.clone());
		let mut on_joined = on_joined;
		socket
			.wrap_push(&this, PushOpts::default(), move || channel.join())
			.receive(
				ReplyKind::Ok,
				Box::new(move |reply| {
					if let Some(view) = on_ok.upgrade() {
						view.on_join(&reply, on_joined.take())
					}
				}),
			)
			.receive(
				ReplyKind::Error,
				Box::new(move |reply| {
					if let Some(view) = on_error.upgrade() {
						view.on_join_error(&reply)
					}
				}),
			)
			.receive(
				ReplyKind::Timeout,
				Box::new(move |_| {
					if let Some(view) = on_timeout.upgrade() {
						view.on_join_error(&json!({ "reason": "join timeout" }))
					}
				}),
			);
	}

	fn bind_channel(&self, socket: &LiveSocket, channel: &Rc<dyn Channel>) {
		let this = self.this.clone();
		socket.on_channel(channel.as_ref(), "diff", move |diff| {
			if let Some(view) = this.upgrade().filter(|view| !view.is_destroyed()) {
				if let Some(socket) = view.socket.upgrade() {
					socket.update_view(&view, &diff)
				}
			}
		});
		let this = self.this.clone();
		socket.on_channel(channel.as_ref(), "redirect", move |redirect| {
			if let Some(view) = this.upgrade() {
				view.on_redirect(&redirect)
			}
		});
		let this = self.this.clone();
		socket.on_channel(channel.as_ref(), "live_patch", move |patch| {
			if let Some(view) = this.upgrade() {
				view.on_live_patch(&patch)
			}
		});
		let this = self.this.clone();
		socket.on_channel(channel.as_ref(), "live_redirect", move |redirect| {
			if let Some(view) = this.upgrade() {
				view.on_live_redirect(&redirect)
			}
		});
	}

	fn on_join(&self, reply: &Value, on_joined: Option<Box<dyn FnOnce(u32)>>) {
		if self.is_destroyed() {
			return trace!("Join reply for destroyed view {:?} dropped.", self.id);
		}
		let socket = match self.socket.upgrade() {
			Some(socket) => socket,
			None => return,
		};
		self.join_count.set(self.join_count.get() + 1);
		self.joined.set(true);
		self.hide_loader();
		socket.log(self, "join", || (format!("joined (join count {})", self.join_count.get()), Value::Null));

		if let Some(rendered) = reply.get("rendered") {
			socket.time("full render", || socket.render_view(self, rendered));
		}
		self.join_new_children();

		if let Some(on_joined) = on_joined {
			on_joined(self.join_count.get())
		}
	}

	fn on_join_error(&self, reply: &Value) {
		self.joined.set(false);
		if self.is_destroyed() {
			return;
		}
		if reply.get("redirect").is_some() {
			return self.on_redirect(&reply["redirect"]);
		}
		if reply.get("live_redirect").is_some() {
			return self.on_live_redirect(&reply["live_redirect"]);
		}
		let (socket, this) = match (self.socket.upgrade(), self.this.upgrade()) {
			(Some(socket), Some(this)) => (socket, this),
			_ => return,
		};
		socket.log(self, "error", || ("unable to join".to_owned(), reply.clone()));
		socket.reload_with_jitter(&this, None);
	}

	fn on_redirect(&self, redirect: &Value) {
		if let (Some(socket), Some(to)) = (self.socket.upgrade(), redirect.get("to").and_then(Value::as_str)) {
			socket.redirect(to, redirect.get("flash").and_then(Value::as_str))
		}
	}

	fn on_live_patch(&self, patch: &Value) {
		if let (Some(socket), Some(to)) = (self.socket.upgrade(), patch.get("to").and_then(Value::as_str)) {
			let kind = HistoryKind::from_link_state(patch.get("kind").and_then(Value::as_str));
			socket.history_patch(to, kind, None)
		}
	}

	fn on_live_redirect(&self, redirect: &Value) {
		if let (Some(socket), Some(to)) = (self.socket.upgrade(), redirect.get("to").and_then(Value::as_str)) {
			let kind = HistoryKind::from_link_state(redirect.get("kind").and_then(Value::as_str));
			socket.history_redirect(to, kind, redirect.get("flash").and_then(Value::as_str).map(str::to_owned))
		}
	}

	fn join_new_children(&self) {
		let selector = format!("{}[{}={}]", PHX_VIEW_SELECTOR, PHX_PARENT_ID, dom::css_string(&self.id));
		let root = match self.root() {
			Some(root) => root,
			None => return,
		};
		for el in dom::all(&self.el, &selector) {
			if root.descendants.borrow().contains_key(&el.id()) {
				continue;
			}
			if let Some(child) = View::new_child(self, el) {
				child.join(None)
			}
		}
	}

	/// Destroys this view and all of its children. Idempotent.
	///
	/// In-flight replies and timers of a destroyed view are ignored when they arrive.
	#[instrument(skip(self), fields(id = %self.id))]
	pub fn destroy(&self) {
		if self.destroyed.replace(true) {
			return trace!("Already destroyed.");
		}
		self.joined.set(false);
		for child in self.children.take() {
			child.destroy()
		}
		if let Some(parent) = self.parent() {
			parent.children.borrow_mut().retain(|child| child.id != self.id);
		}
		if let Some(root) = self.root.as_ref().and_then(Weak::upgrade) {
			root.descendants.borrow_mut().remove(&self.id);
		}
		if let Some(channel) = self.channel.take() {
			channel.leave()
		}
		if let Some(socket) = self.socket.upgrade() {
			socket.drop_active_element(self)
		}
	}

	/// Marks the element as loading after `timeout_ms`, or right away for `0`.
	///
	/// The timer outlives [`destroy`](`View::destroy`), so an outgoing view keeps showing it.
	pub fn show_loader(&self, timeout_ms: u32) {
		if timeout_ms == 0 {
			set_loading(&self.el, true);
			if let Some(socket) = self.socket.upgrade() {
				socket.blur_active_element()
			}
			return;
		}
		let el = self.el.clone();
		let socket = self.socket.clone();
		*self.loader_timer.borrow_mut() = Some(Timeout::new(timeout_ms, move || {
			set_loading(&el, true);
			if let Some(socket) = socket.upgrade() {
				socket.blur_active_element()
			}
		}));
	}

	fn hide_loader(&self) {
		self.loader_timer.take();
		set_loading(&self.el, false)
	}

	/// Resolves `phx_target` (a component id or a CSS selector) and invokes `callback` per match.
	pub fn within_targets(&self, phx_target: &str, callback: &mut dyn FnMut(Rc<View>, TargetCtx)) {
		let is_cid = !phx_target.is_empty() && phx_target.bytes().all(|b| b.is_ascii_digit()) && (phx_target == "0" || !phx_target.starts_with('0'));
		if is_cid {
			let selector = format!("[{}={}]", PHX_COMPONENT, dom::css_string(phx_target));
			match (self.el.query_selector(&selector), phx_target.parse::<u32>(), self.this.upgrade()) {
				(Ok(Some(_)), Ok(cid), Some(this)) => callback(this, TargetCtx::Component(cid)),
				_ => error!("No component found matching phx-target of {}", phx_target),
			}
			return;
		}

		let (socket, document) = match (self.socket.upgrade(), dom::document()) {
			(Some(socket), Some(document)) => (socket, document),
			_ => return,
		};
		let targets = dom::all_in_document(&document, phx_target);
		if targets.is_empty() {
			error!("Nothing found matching the phx-target selector {:?}", phx_target)
		}
		for target in targets {
			if let Some(view) = socket.owner(&target) {
				callback(view, TargetCtx::Element(target))
			}
		}
	}

	fn target_cid(target_ctx: &TargetCtx) -> Option<u32> {
		match target_ctx {
			TargetCtx::Component(cid) => Some(*cid),
			TargetCtx::Element(el) => el
				.closest(&format!("[{}]", PHX_COMPONENT))
				.ok()
				.flatten()
				.and_then(|component| component.get_attribute(PHX_COMPONENT))
				.and_then(|cid| cid.parse().ok()),
		}
	}

	/// Collects `<prefix>value-*` attributes and the element's own value on top of `meta`.
	fn extract_meta(&self, el: &Element, mut meta: Map<String, Value>) -> Map<String, Value> {
		let prefix = match self.socket.upgrade() {
			Some(socket) => socket.binding(PHX_VALUE),
			None => return meta,
		};
		for name in el.get_attribute_names().iter().filter_map(|name| name.as_string()) {
			if let Some(key) = name.strip_prefix(&prefix) {
				if let Some(value) = el.get_attribute(&name) {
					meta.insert(key.to_owned(), Value::String(value));
				}
			}
		}
		if !meta.contains_key("value") {
			let value = match el.dyn_ref::<HtmlInputElement>() {
				Some(input) if matches!(input.type_().as_str(), "checkbox" | "radio") && !input.checked() => None,
				Some(input) => Some(input.value()),
				None => el.get_attribute("value"),
			};
			if let Some(value) = value {
				meta.insert("value".to_owned(), Value::String(value));
			}
		}
		meta
	}

	fn event_payload(kind: &str, phx_event: &str, value: Value, target_ctx: &TargetCtx) -> Value {
		let mut payload = json!({ "type": kind, "event": phx_event, "value": value });
		if let Some(cid) = Self::target_cid(target_ctx) {
			payload["cid"] = json!(cid);
		}
		payload
	}

	/// Pushes `event` through the supervisor, rendering any diff in the reply.
	///
	/// Returns [`None`] if the view isn't connected. `on_reply` is skipped if the view is destroyed
	/// before the reply arrives.
	pub fn push_with_reply(&self, event: &str, payload: Value, on_reply: impl FnOnce(&View, &Value) + 'static) -> Option<Box<dyn Push>> {
		if !self.is_connected() {
			warn!("Push of {:?} through disconnected view {:?} dropped.", event, self.id);
			return None;
		}
		let (socket, this) = (self.socket.upgrade()?, self.this.upgrade()?);
		let channel = self.channel.borrow().clone()?;
		if cfg!(feature = "dangerous-logging") {
			debug!("Pushing {:?}: {}", event, payload);
		} else {
			debug!("Pushing {:?}.", event);
		}
		let event = event.to_owned();
		let weak = self.this.clone();
		let mut on_reply = Some(on_reply);
		let push = socket
			.wrap_push(&this, PushOpts { timeout: true }, move || channel.push(&event, payload, Some(PUSH_TIMEOUT)))
			.receive(
				ReplyKind::Ok,
				Box::new(move |reply| {
					let view = match weak.upgrade() {
						Some(view) if !view.is_destroyed() => view,
						_ => return trace!("Reply for destroyed view dropped."),
					};
					if let Some(diff) = reply.get("diff") {
						if let Some(socket) = view.socket.upgrade() {
							socket.update_view(&view, diff)
						}
					}
					if reply.get("redirect").is_some() {
						view.on_redirect(&reply["redirect"])
					} else if reply.get("live_redirect").is_some() {
						view.on_live_redirect(&reply["live_redirect"])
					}
					if let Some(on_reply) = on_reply.take() {
						on_reply(&view, &reply)
					}
				}),
			);
		Some(push)
	}

	pub fn push_event(&self, kind: &str, target: &Element, target_ctx: &TargetCtx, phx_event: &str, meta: Map<String, Value>) {
		let value = Value::Object(self.extract_meta(target, meta));
		self.push_with_reply("event", Self::event_payload(kind, phx_event, value, target_ctx), |_, _| ());
	}

	pub fn push_key(&self, target: &Element, target_ctx: &TargetCtx, kind: &str, phx_event: &str, meta: Map<String, Value>) {
		self.push_event(kind, target, target_ctx, phx_event, meta)
	}

	/// Pushes the state of `input`'s form.
	pub fn push_input(&self, input: &Element, target_ctx: &TargetCtx, phx_event: &str) {
		let form = match input.closest("form").ok().flatten().and_then(|form| form.dyn_into::<HtmlFormElement>().ok()) {
			Some(form) => form,
			None => return warn!("Input outside of a form ignored."),
		};
		let mut payload = Self::event_payload("form", phx_event, Value::String(serialize_form(&form)), target_ctx);
		if let Some(name) = input.get_attribute("name") {
			payload["_target"] = Value::String(name);
		}
		self.push_with_reply("event", payload, |_, _| ());
	}

	/// Pushes a submission of `form`, re-enabling it once the server replies.
	pub fn submit_form(&self, form: &HtmlFormElement, target_ctx: &TargetCtx, phx_event: &str) {
		let payload = Self::event_payload("form", phx_event, Value::String(serialize_form(form)), target_ctx);
		let form = form.clone();
		let pushed = self.push_with_reply("event", payload, move |_, _| {
			if let Err(error) = form.remove_attribute("disabled") {
				error!("Failed to re-enable form: {:?}", error)
			}
		});
		if pushed.is_none() {
			warn!("Form submission through disconnected view {:?} dropped.", self.id)
		}
	}

	/// Asks the server to patch this view to `href`.
	///
	/// The patch is only committed if no newer navigation started meanwhile. `callback` runs on every
	/// reply with the link reference, which it has to check itself.
	pub fn push_link_patch(&self, href: &str, target: Option<&Element>, callback: Option<Box<dyn FnOnce(u64)>>) {
		let socket = match self.socket.upgrade() {
			Some(socket) => socket,
			None => return,
		};
		let link_ref = socket.set_pending_link(href);
		if let Some(target) = target {
			trace!("Link patch from {:?}.", target.tag_name());
		}
		let href_owned = href.to_owned();
		let push = self.push_with_reply("live_patch", json!({ "url": href }), move |view, reply| {
			let socket = match view.socket.upgrade() {
				Some(socket) => socket,
				None => return,
			};
			if reply.get("link_redirect").and_then(Value::as_bool).unwrap_or(false) {
				socket.replace_main(&href_owned, None, callback.map(|callback| Box::new(move || callback(link_ref)) as Box<dyn FnOnce()>), Some(link_ref))
			} else {
				if socket.commit_pending_link(link_ref) {
					view.set_href(href_owned);
				} else {
					trace!("Superseded link patch to {:?} not committed.", href_owned)
				}
				if let Some(callback) = callback {
					callback(link_ref)
				}
			}
		});
		match push {
			Some(push) => {
				let (weak_view, socket) = (self.this.clone(), self.socket.clone());
				push.receive(
					ReplyKind::Timeout,
					Box::new(move |_| {
						match weak_view.upgrade() {
							Some(view) if !view.is_destroyed() => (),
							_ => return trace!("Link patch timeout for destroyed view ignored."),
						}
						if let Some(socket) = socket.upgrade() {
							let href = socket.browser().location().href;
							socket.redirect(&href, None)
						}
					}),
				);
			}
			None => warn!("Link patch to {:?} dropped.", href),
		}
	}
}
