use live_socket::{ReplyKind, Storage};
use serde_json::json;
use std::{cell::Cell, rc::Rc};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

use web_mock_::Harness;

wasm_bindgen_test_configure!(run_in_browser);

const NESTED: &str = r#"
	<div id="main" data-phx-session="a" data-phx-main>
		<p id="in-main">main</p>
		<div id="child" data-phx-session="b" data-phx-parent-id="main">
			<span id="in-child">child</span>
			<div id="grandchild" data-phx-session="c" data-phx-parent-id="child">
				<span id="in-grandchild">grandchild</span>
			</div>
		</div>
		<div id="sibling" data-phx-session="d" data-phx-parent-id="main"></div>
	</div>
	<div id="other" data-phx-session="e"><b id="in-other">other</b></div>
"#;

#[wasm_bindgen_test]
fn lookup_matches_dom_ancestry() {
	let harness = Harness::connected(NESTED);
	let live = &harness.live;
	assert_eq!(live.root_views().len(), 2);

	for (inner, view_id) in [("in-main", "main"), ("in-child", "child"), ("in-grandchild", "grandchild"), ("in-other", "other")] {
		let owner = live.owner(&harness.fixture.get(inner)).unwrap();
		let by_el = live.get_view_by_el(&harness.fixture.get(view_id)).unwrap();
		assert_eq!(owner.id(), view_id);
		assert!(Rc::ptr_eq(&owner, &by_el));
	}

	let grandchild = live.get_view_by_el(&harness.fixture.get("grandchild")).unwrap();
	assert_eq!(grandchild.parent_id(), Some("child"));
	assert_eq!(grandchild.root().unwrap().id(), "main");
	assert!(grandchild.owns_element(&harness.fixture.get("in-grandchild")));
	assert!(!grandchild.owns_element(&harness.fixture.get("in-child")));
}

#[wasm_bindgen_test]
fn destroy_is_idempotent_and_silences_continuations() {
	let harness = Harness::connected(NESTED);
	let main = harness.live.main().unwrap();

	let replied = Rc::new(Cell::new(false));
	let flag = replied.clone();
	main.push_with_reply("event", json!({ "event": "x" }), move |_, _| flag.set(true)).unwrap();
	let pushed = harness.socket.channel_for("main").pushes_of("event").pop().unwrap();

	main.destroy();
	main.destroy();
	assert!(main.is_destroyed());
	assert!(harness.socket.channel_for("main").left.get());
	assert!(harness.socket.channel_for("grandchild").left.get());

	assert_eq!(pushed.reply(ReplyKind::Ok, json!({})), 1);
	assert_eq!(pushed.reply(ReplyKind::Timeout, json!({})), 1);
	assert!(!replied.get());
	assert_eq!(harness.browser.reloads.get(), 0);
	assert_eq!(harness.local.get_item("/-consecutive-reloads"), None);

	assert!(main.push_with_reply("event", json!({}), |_, _| ()).is_none());
}

#[wasm_bindgen_test]
fn destroying_a_descendant_keeps_siblings() {
	let harness = Harness::connected(NESTED);
	let main = harness.live.main().unwrap();
	assert_eq!(main.descendant_count(), 3);

	harness.live.destroy_view_by_el(&harness.fixture.get("child"));
	assert_eq!(main.descendant_count(), 1);
	assert!(!main.is_destroyed());
	assert!(harness.live.get_view_by_el(&harness.fixture.get("sibling")).is_some());
	assert!(harness.live.get_view_by_el(&harness.fixture.get("grandchild")).is_none());
	assert!(harness.socket.channel_for("child").left.get());
	assert!(!harness.socket.channel_for("sibling").left.get());
}

#[wasm_bindgen_test]
fn destroy_all_views_unregisters_roots() {
	let harness = Harness::connected(NESTED);
	let other = harness.live.get_root_by_id("other").unwrap();

	harness.live.destroy_all_views();
	assert!(harness.live.root_views().is_empty());
	assert!(harness.live.main().is_none());
	assert!(other.is_destroyed());
	assert!(harness.live.owner(&harness.fixture.get("in-other")).is_none());
}

#[wasm_bindgen_test]
fn destroyed_children_are_released_by_their_parent() {
	let harness = Harness::connected(NESTED);
	let main = harness.live.main().unwrap();
	let child = harness.live.get_view_by_el(&harness.fixture.get("child")).unwrap();
	let grandchild = harness.live.get_view_by_el(&harness.fixture.get("grandchild")).unwrap();
	assert_eq!(main.child_count(), 2);
	assert!(Rc::ptr_eq(&grandchild.parent().unwrap(), &child));
	assert!(Rc::ptr_eq(&child.parent().unwrap(), &main));
	assert!(main.parent().is_none());

	grandchild.destroy();
	assert_eq!(child.child_count(), 0);
	assert_eq!(Rc::strong_count(&grandchild), 1);

	harness.live.destroy_view_by_el(&harness.fixture.get("child"));
	assert_eq!(main.child_count(), 1);
	assert_eq!(Rc::strong_count(&child), 1);
	assert!(!main.is_destroyed());
}
