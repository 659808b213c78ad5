use gloo_timers::future::TimeoutFuture;
use js_sys::{Array, Object, Reflect};
use live_socket::{
	listeners::{ListenerOptions, Listeners},
	ReplyKind,
};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{
	CustomEvent, CustomEventInit, DataTransfer, DragEvent, DragEventInit, File, HtmlInputElement, KeyboardEvent, KeyboardEventInit, PageTransitionEvent,
	PageTransitionEventInit,
};

use web_mock_::{dispatch, Harness};

wasm_bindgen_test_configure!(run_in_browser);

const BOUND: &str = r##"
	<div id="main" data-phx-session="a" data-phx-main>
		<button id="inc" phx-click="inc" phx-value-id="7">+</button>
		<button id="throttled" phx-click="spam" phx-throttle="1000">!</button>
		<div data-phx-component="3"><span>component</span></div>
		<button id="targeted" phx-click="poke" phx-target="3">poke</button>
		<form id="form" phx-change="validate" phx-submit="save">
			<input id="name" name="user[name]" value="x">
		</form>
		<form id="upload-form" phx-change="files">
			<input id="upload" type="file" name="avatar">
		</form>
		<div id="dropzone" phx-drop-target="upload">drop here</div>
		<form id="lazy-form" phx-change="lazy">
			<input id="lazy" name="q" phx-debounce="50">
		</form>
		<form id="blur-form" phx-change="later">
			<input id="later" type="file" name="doc" phx-debounce="blur">
		</form>
		<div id="capture-wrapper"><button id="captured" phx-capture-click="grab">grab</button></div>
		<a id="hash-link" href="#" phx-click="toggle">toggle</a>
		<input id="search" phx-keyup="search" phx-key="Enter">
		<input id="focusable" phx-focus="focused">
		<div id="global-keys" phx-window-keyup="global"></div>
		<div id="global-focus" phx-window-focus="back"></div>
	</div>
"##;

fn key(target: &web_sys::EventTarget, event_type: &str, key: &str) {
	let init = KeyboardEventInit::new();
	init.set_bubbles(true);
	init.set_key(key);
	let event = KeyboardEvent::new_with_keyboard_event_init_dict(event_type, &init).unwrap();
	target.dispatch_event(&event).unwrap();
}

#[wasm_bindgen_test]
fn click_carries_values() {
	let harness = Harness::connected(BOUND);
	harness.fixture.html("inc").click();

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload, json!({ "type": "click", "event": "inc", "value": { "id": "7" } }));
}

#[wasm_bindgen_test]
fn numeric_target_addresses_component() {
	let harness = Harness::connected(BOUND);
	harness.fixture.html("targeted").click();

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["event"], "poke");
	assert_eq!(pushes[0].payload["cid"], 3);
}

#[wasm_bindgen_test]
fn throttle_drops_repeats() {
	let harness = Harness::connected(BOUND);
	harness.fixture.html("throttled").click();
	harness.fixture.html("throttled").click();
	harness.fixture.html("throttled").click();
	assert_eq!(harness.socket.channel_for("main").pushes_of("event").len(), 1);
}

#[wasm_bindgen_test]
fn input_and_change_for_one_edit_push_once() {
	let harness = Harness::connected(BOUND);
	let name = harness.fixture.get("name");
	dispatch(&name, "input");
	dispatch(&name, "change");

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["type"], "form");
	assert_eq!(pushes[0].payload["event"], "validate");
	assert_eq!(pushes[0].payload["_target"], "user[name]");
	assert!(pushes[0].payload["value"].as_str().unwrap().ends_with("=x"));

	// A later edit is a new one.
	dispatch(&name, "input");
	assert_eq!(harness.socket.channel_for("main").pushes_of("event").len(), 2);
}

#[wasm_bindgen_test]
fn submit_disables_form_until_reply() {
	let harness = Harness::connected(BOUND);
	let form = harness.fixture.get("form");
	assert!(!dispatch(&form, "submit"), "default not prevented");
	assert!(form.has_attribute("disabled"));

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["event"], "save");

	pushes[0].reply(ReplyKind::Ok, json!({}));
	assert!(!form.has_attribute("disabled"));
}

#[wasm_bindgen_test]
fn key_filter_is_case_insensitive() {
	let harness = Harness::connected(BOUND);
	let search = harness.fixture.get("search");
	key(&search, "keyup", "Escape");
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());

	key(&search, "keyup", "enter");
	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload, json!({ "type": "keyup", "event": "search", "value": { "key": "enter", "value": "" } }));
}

#[wasm_bindgen_test]
fn unbound_keys_reach_window_bindings() {
	let harness = Harness::connected(BOUND);
	key(&web_mock_::document().body().unwrap(), "keyup", "k");

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["event"], "global");
	assert_eq!(pushes[0].payload["value"]["key"], "k");
}

#[wasm_bindgen_test]
fn element_focus_is_forwarded_once() {
	let harness = Harness::connected(BOUND);
	let focusable = harness.fixture.get("focusable");
	dispatch(&focusable, "focusin");
	dispatch(&focusable, "focus");

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["type"], "focus");
	assert_eq!(pushes[0].payload["event"], "focused");
}

#[wasm_bindgen_test]
fn window_focus_reaches_window_bindings() {
	let harness = Harness::connected(BOUND);
	let window = web_sys::window().unwrap();
	window.dispatch_event(&web_sys::Event::new("focus").unwrap()).unwrap();

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["event"], "back");
}

#[wasm_bindgen_test]
fn silenced_events_are_dropped() {
	let harness = Harness::connected(BOUND);
	let name = harness.fixture.get("name");
	let search = harness.fixture.get("search");
	harness.live.silence_events(|| {
		dispatch(&name, "input");
		key(&search, "keyup", "Enter");
	});
	assert!(!harness.live.is_silenced());
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());
}

#[wasm_bindgen_test]
fn clicks_need_a_connection() {
	let harness = Harness::connected(BOUND);
	harness.live.disconnect(None);
	harness.fixture.html("inc").click();
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());
}

fn track_uploads(input: &web_sys::Element) {
	let files = Array::new();
	files.push(&web_sys::Blob::new().unwrap());
	let detail = Object::new();
	Reflect::set(&detail, &JsValue::from_str("files"), &files).unwrap();
	let init = CustomEventInit::new();
	init.set_bubbles(true);
	init.set_detail(&detail);
	input
		.dispatch_event(&CustomEvent::new_with_event_init_dict("track-uploads", &init).unwrap())
		.unwrap();
}

#[wasm_bindgen_test]
fn tracked_uploads_are_attached_and_announced() {
	let harness = Harness::connected(BOUND);
	let upload = harness.fixture.get("upload");
	track_uploads(&upload);

	assert_eq!(harness.live.tracked_files(&upload).len(), 1);
	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["event"], "files");
	assert_eq!(pushes[0].payload["_target"], "avatar");
}

#[wasm_bindgen_test]
fn capture_click_matches_a_bound_descendant() {
	let harness = Harness::connected(BOUND);
	dispatch(&harness.fixture.get("capture-wrapper"), "mousedown");

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["type"], "click");
	assert_eq!(pushes[0].payload["event"], "grab");
}

#[wasm_bindgen_test]
fn hash_links_do_not_navigate() {
	let harness = Harness::connected(BOUND);
	assert!(!dispatch(&harness.fixture.get("hash-link"), "click"), "default not prevented");
	assert!(dispatch(&harness.fixture.get("inc"), "click"));

	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 2);
	assert_eq!(pushes[0].payload["event"], "toggle");
}

#[wasm_bindgen_test]
fn dropped_files_are_tracked_on_the_drop_target() {
	let harness = Harness::connected(BOUND);
	let upload = harness.fixture.get("upload");

	let transfer = DataTransfer::new().unwrap();
	let file = File::new_with_str_sequence(&Array::of1(&JsValue::from_str("hello")), "hello.txt").unwrap();
	transfer.items().add_with_file(&file).unwrap();
	let init = DragEventInit::new();
	init.set_bubbles(true);
	init.set_cancelable(true);
	init.set_data_transfer(Some(&transfer));
	let event = DragEvent::new_with_event_init_dict("drop", &init).unwrap();
	assert!(!harness.fixture.get("dropzone").dispatch_event(&event).unwrap());

	assert_eq!(harness.live.tracked_files(&upload).len(), 1);
	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["event"], "files");
	assert_eq!(pushes[0].payload["_target"], "avatar");
}

#[wasm_bindgen_test]
fn drop_without_files_is_ignored() {
	let harness = Harness::connected(BOUND);
	let init = DragEventInit::new();
	init.set_bubbles(true);
	init.set_data_transfer(Some(&DataTransfer::new().unwrap()));
	let event = DragEvent::new_with_event_init_dict("drop", &init).unwrap();
	harness.fixture.get("dropzone").dispatch_event(&event).unwrap();

	assert!(harness.live.tracked_files(&harness.fixture.get("upload")).is_empty());
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());
}

#[wasm_bindgen_test]
fn page_restored_from_cache_reloads() {
	let harness = Harness::connected(BOUND);
	let window = web_sys::window().unwrap();
	let pageshow = |persisted: bool| {
		let init = PageTransitionEventInit::new();
		init.set_persisted(persisted);
		PageTransitionEvent::new_with_event_init_dict("pageshow", &init).unwrap()
	};

	window.dispatch_event(&pageshow(false)).unwrap();
	assert_eq!(harness.browser.reloads.get(), 0);
	assert!(harness.live.is_connected());

	window.dispatch_event(&pageshow(true)).unwrap();
	assert_eq!(harness.browser.reloads.get(), 1);
	assert_eq!(harness.socket.closes.get(), 1);
	assert!(!harness.live.is_connected());
}

#[wasm_bindgen_test]
async fn debounce_sends_only_the_trailing_edit() {
	let harness = Harness::connected(BOUND);
	let lazy: HtmlInputElement = harness.fixture.get("lazy").dyn_into().unwrap();

	lazy.set_value("a");
	dispatch(&lazy, "input");
	TimeoutFuture::new(20).await;
	lazy.set_value("ab");
	dispatch(&lazy, "input");
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());

	TimeoutFuture::new(150).await;
	let pushes = harness.socket.channel_for("main").pushes_of("event");
	assert_eq!(pushes.len(), 1);
	assert_eq!(pushes[0].payload["event"], "lazy");
	assert_eq!(pushes[0].payload["value"], "q=ab");
}

#[wasm_bindgen_test]
fn edited_inputs_are_marked_focused() {
	let harness = Harness::connected(BOUND);
	let name = harness.fixture.get("name");
	assert!(!harness.live.has_focused(&name));

	dispatch(&name, "input");
	assert!(harness.live.has_focused(&name));
	assert!(!harness.live.has_focused(&harness.fixture.get("search")));
}

#[wasm_bindgen_test]
async fn pruning_from_a_listener_of_the_pruned_element() {
	let harness = Harness::connected(BOUND);
	let later = harness.fixture.get("later");
	track_uploads(&later);
	assert_eq!(harness.live.tracked_files(&later).len(), 1);
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());

	harness.fixture.get("blur-form").remove();
	let seen = Rc::new(RefCell::new(Vec::new()));
	let mut listeners = Listeners::new();
	let (live, recorded, pruned) = (harness.live.clone(), seen.clone(), later.clone());
	listeners.add(&later, "blur", ListenerOptions::BUBBLE, move |_| {
		live.prune_detached();
		recorded.borrow_mut().push(live.tracked_files(&pruned).len());
	});

	dispatch(&later, "blur");
	TimeoutFuture::new(10).await;
	dispatch(&later, "blur");

	assert_eq!(*seen.borrow(), vec![0, 0]);
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());
}
