use gloo_timers::future::TimeoutFuture;
use live_socket::{Backoff, ReplyKind, Storage};
use serde_json::json;
use std::{cell::Cell, rc::Rc};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

use web_mock_::Harness;

wasm_bindgen_test_configure!(run_in_browser);

const MAIN: &str = r#"<div id="main" data-phx-session="a" data-phx-main></div>"#;

#[wasm_bindgen_test]
fn push_timeout_reloads() {
	let harness = Harness::connected(MAIN);
	let main = harness.live.main().unwrap();
	main.push_with_reply("event", json!({ "event": "slow" }), |_, _| ()).unwrap();

	let pushed = harness.socket.channel_for("main").pushes_of("event").pop().unwrap();
	assert_eq!(pushed.timeout, Some(30_000));
	assert_eq!(pushed.reply(ReplyKind::Timeout, json!({})), 1);

	assert!(main.is_destroyed());
	assert!(harness.socket.channel_for("main").left.get());
	assert_eq!(harness.socket.closes.get(), 1);
	assert_eq!(harness.local.get_item("/-consecutive-reloads").as_deref(), Some("1"));
}

#[wasm_bindgen_test]
fn timeout_after_rejoin_is_ignored() {
	let harness = Harness::connected(MAIN);
	let main = harness.live.main().unwrap();
	main.push_with_reply("event", json!({ "event": "slow" }), |_, _| ()).unwrap();
	let pushed = harness.socket.channel_for("main").pushes_of("event").pop().unwrap();

	// The transport rejoins and replies to the first join again.
	harness.socket.channel_for("main").last_join().reply(ReplyKind::Ok, json!({ "rendered": {} }));
	assert_eq!(main.join_count(), 2);

	pushed.reply(ReplyKind::Timeout, json!({}));
	assert!(!main.is_destroyed());
	assert_eq!(harness.socket.closes.get(), 0);
	assert_eq!(harness.local.get_item("/-consecutive-reloads"), None);
}

#[wasm_bindgen_test]
fn consecutive_reloads_enter_failsafe() {
	let harness = Harness::connected(MAIN);
	let main = harness.live.main().unwrap();

	for attempt in 1..=5 {
		let backoff = harness.live.reload_with_jitter(&main, None);
		assert!(!backoff.is_failsafe, "attempt {}", attempt);
		assert!((1000..=3000).contains(&backoff.delay_ms), "{:?}", backoff);
	}
	assert_eq!(
		harness.live.reload_with_jitter(&main, None),
		Backoff {
			delay_ms: 30_000,
			is_failsafe: true
		}
	);
	assert_eq!(harness.local.get_item("/-consecutive-reloads").as_deref(), Some("6"));
}

#[wasm_bindgen_test]
fn reload_counters_are_per_path() {
	let harness = Harness::connected(MAIN);
	let main = harness.live.main().unwrap();
	harness.local.set_item("/-consecutive-reloads", "9");
	harness.browser.go("http://localhost/fresh", Default::default());

	assert!(!harness.live.reload_with_jitter(&main, None).is_failsafe);
	assert_eq!(harness.local.get_item("/fresh-consecutive-reloads").as_deref(), Some("1"));
}

#[wasm_bindgen_test]
fn join_error_without_redirect_reloads() {
	let harness = Harness::new(MAIN);
	harness.live.connect();
	harness.socket.channel_for("main").last_join().reply(ReplyKind::Error, json!({ "reason": "boom" }));

	assert!(harness.live.main().unwrap().is_destroyed());
	assert_eq!(harness.local.get_item("/-consecutive-reloads").as_deref(), Some("1"));
	assert!(harness.browser.assigned.borrow().is_empty());
}

#[wasm_bindgen_test]
async fn simulated_latency_defers_pushes() {
	let harness = Harness::connected(MAIN);
	harness.live.enable_latency_sim(20);
	assert!(harness.live.is_debug_enabled());
	let main = harness.live.main().unwrap();

	let replied = Rc::new(Cell::new(false));
	let flag = replied.clone();
	main.push_with_reply("event", json!({ "event": "later" }), move |_, _| flag.set(true)).unwrap();
	assert!(harness.socket.channel_for("main").pushes_of("event").is_empty());

	TimeoutFuture::new(60).await;
	let pushed = harness.socket.channel_for("main").pushes_of("event").pop().unwrap();
	// No reply timeout guard while latency is simulated.
	assert_eq!(pushed.registered(ReplyKind::Timeout), 0);
	pushed.reply(ReplyKind::Ok, json!({}));
	assert!(replied.get());

	harness.live.disable_latency_sim();
	assert_eq!(harness.live.latency_sim(), None);
}

#[wasm_bindgen_test]
async fn simulated_latency_defers_server_messages() {
	let harness = Harness::connected(MAIN);
	harness.live.enable_latency_sim(20);
	harness.socket.channel_for("main").emit("live_patch", json!({ "to": "http://localhost/late", "kind": "push" }));
	assert!(harness.browser.pushed_urls().is_empty());

	TimeoutFuture::new(60).await;
	assert_eq!(harness.browser.pushed_urls(), vec!["http://localhost/late".to_owned()]);
	harness.live.disable_latency_sim();
}
