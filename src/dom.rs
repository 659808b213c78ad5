//! Small DOM conveniences.

use crate::js_socket::to_js;
use serde_json::Value;
use tracing::error;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, CustomEventInit, Document, Element, EventInit, EventTarget, HtmlInputElement, NodeList};

fn elements(nodes: &NodeList) -> Vec<Element> {
	(0..nodes.length())
		.filter_map(|i| nodes.get(i))
		.filter_map(|node| node.dyn_into::<Element>().ok())
		.collect()
}

#[must_use]
pub fn all(root: &Element, selector: &str) -> Vec<Element> {
	match root.query_selector_all(selector) {
		Ok(nodes) => elements(&nodes),
		Err(error) => {
			error!("Invalid selector {:?}: {:?}", selector, error);
			Vec::new()
		}
	}
}

#[must_use]
pub fn all_in_document(document: &Document, selector: &str) -> Vec<Element> {
	match document.query_selector_all(selector) {
		Ok(nodes) => elements(&nodes),
		Err(error) => {
			error!("Invalid selector {:?}: {:?}", selector, error);
			Vec::new()
		}
	}
}

#[must_use]
pub fn document() -> Option<Document> {
	web_sys::window().and_then(|window| window.document())
}

/// Quotes `value` for use inside a double-quoted CSS attribute selector.
#[must_use]
pub fn css_string(value: &str) -> String {
	let mut quoted = String::with_capacity(value.len() + 2);
	quoted.push('"');
	for c in value.chars() {
		if c == '"' || c == '\\' {
			quoted.push('\\');
		}
		quoted.push(c);
	}
	quoted.push('"');
	quoted
}

/// The element an event was dispatched to, or the parent element for text nodes.
#[must_use]
pub fn target_element(target: Option<EventTarget>) -> Option<Element> {
	let target = target?;
	match target.dyn_into::<Element>() {
		Ok(element) => Some(element),
		Err(target) => target.dyn_into::<web_sys::Node>().ok().and_then(|node| node.parent_element()),
	}
}

/// Nearest inclusive ancestor of the event target carrying `attribute`.
#[must_use]
pub fn closest_binding(target: Option<EventTarget>, attribute: &str) -> Option<Element> {
	target_element(target)?.closest(&format!("[{}]", attribute)).ok().flatten()
}

/// An empty copy of `element`: same tag and attributes, no children.
#[must_use]
pub fn clone_shallow(element: &Element) -> Option<Element> {
	element.clone_node_with_deep(false).ok().and_then(|node| node.dyn_into().ok())
}

#[must_use]
pub fn is_textual_input(element: &Element) -> bool {
	match element.dyn_ref::<HtmlInputElement>() {
		Some(input) => matches!(
			input.type_().as_str(),
			"text" | "textarea" | "number" | "email" | "password" | "search" | "tel" | "url" | "date" | "time" | "datetime-local" | "color" | "range"
		),
		None => element.tag_name().eq_ignore_ascii_case("textarea"),
	}
}

#[must_use]
pub fn is_upload_input(element: &Element) -> bool {
	element
		.dyn_ref::<HtmlInputElement>()
		.map_or(false, |input| input.type_() == "file")
}

pub fn dispatch_custom(target: &EventTarget, name: &str, detail: &Value, bubbles: bool) {
	let init = CustomEventInit::new();
	init.set_bubbles(bubbles);
	init.set_detail(&to_js(detail));
	match CustomEvent::new_with_event_init_dict(name, &init) {
		Ok(event) => {
			if let Err(error) = target.dispatch_event(&event) {
				error!("Failed to dispatch {:?}: {:?}", name, error)
			}
		}
		Err(error) => error!("Failed to create {:?}: {:?}", name, error),
	}
}

/// Dispatches a bubbling `input` event, which routes through the regular change binding.
pub fn dispatch_input(target: &EventTarget) {
	let init = EventInit::new();
	init.set_bubbles(true);
	match web_sys::Event::new_with_event_init_dict("input", &init) {
		Ok(event) => {
			if let Err(error) = target.dispatch_event(&event) {
				error!("Failed to dispatch synthetic input: {:?}", error)
			}
		}
		Err(error) => error!("Failed to create synthetic input: {:?}", error),
	}
}
