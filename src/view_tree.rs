//! The forest of root views, keyed by id.

use crate::{
	constants::{PHX_ROOT_ID, PHX_VIEW_SELECTOR},
	socket::LiveSocket,
	view::View,
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{trace, warn};
use web_sys::Element;

#[derive(Debug, Default)]
pub struct ViewTree {
	roots: HashMap<String, Rc<View>>,
	main: Option<Rc<View>>,
}

impl ViewTree {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates and registers a root view for `el`. Does not join it.
	pub fn new_root_view(&mut self, socket: Weak<LiveSocket>, el: Element, flash: Option<String>) -> Rc<View> {
		let view = View::new_root(socket, el, flash);
		if let Some(replaced) = self.roots.insert(view.id().to_owned(), view.clone()) {
			warn!("Root view {:?} registered twice; the old instance is orphaned.", replaced.id());
		}
		view
	}

	#[must_use]
	pub fn get_root_by_id(&self, id: &str) -> Option<Rc<View>> {
		self.roots.get(id).cloned()
	}

	/// Resolves a view element through its stamped root id.
	#[must_use]
	pub fn get_view_by_el(&self, el: &Element) -> Option<Rc<View>> {
		let root_id = el.get_attribute(PHX_ROOT_ID)?;
		self.roots.get(&root_id)?.get_descendent_by_el(el)
	}

	/// The view owning `el`, which may be any element inside it.
	#[must_use]
	pub fn owner(&self, el: &Element) -> Option<Rc<View>> {
		let view_el = el.closest(PHX_VIEW_SELECTOR).ok().flatten()?;
		self.get_view_by_el(&view_el)
	}

	/// Unregisters all roots. The caller destroys them, outside of any borrow of this tree.
	#[must_use]
	pub fn take_all(&mut self) -> Vec<Rc<View>> {
		self.main = None;
		self.roots.drain().map(|(_, view)| view).collect()
	}

	/// Unregisters `el`'s view if it is a root. Returns the view to destroy.
	#[must_use]
	pub fn take_view_by_el(&mut self, el: &Element) -> Option<Rc<View>> {
		let view = self.get_view_by_el(el)?;
		if view.is_root() {
			self.roots.remove(view.id());
			if self.main.as_ref().map_or(false, |main| Rc::ptr_eq(main, &view)) {
				self.main = None
			}
		}
		Some(view)
	}

	pub fn remove_root(&mut self, id: &str) -> Option<Rc<View>> {
		trace!("Unregistering root {:?}.", id);
		self.roots.remove(id)
	}

	pub fn set_main(&mut self, view: Option<Rc<View>>) {
		self.main = view
	}

	#[must_use]
	pub fn main(&self) -> Option<Rc<View>> {
		self.main.clone()
	}

	#[must_use]
	pub fn is_main(&self, view: &View) -> bool {
		self.main.as_ref().map_or(false, |main| main.id() == view.id())
	}

	#[must_use]
	pub fn roots(&self) -> Vec<Rc<View>> {
		self.roots.values().cloned().collect()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.roots.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.roots.is_empty()
	}
}
