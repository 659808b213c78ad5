//! Attribute names, storage keys and timing constants shared with server-rendered markup.
//!
//! Unprefixed names (`data-phx-*`) are fixed. Binding suffixes are combined with the
//! configurable [`Options::binding_prefix`](`crate::Options::binding_prefix`) at runtime.

pub const BINDING_PREFIX: &str = "phx-";

pub const PHX_SESSION: &str = "data-phx-session";
pub const PHX_STATIC: &str = "data-phx-static";
pub const PHX_VIEW_SELECTOR: &str = "[data-phx-session]";
pub const PHX_PARENT_ID: &str = "data-phx-parent-id";
pub const PHX_ROOT_ID: &str = "data-phx-root-id";
pub const PHX_MAIN: &str = "data-phx-main";
pub const PHX_LIVE_LINK: &str = "data-phx-link";
pub const PHX_LINK_STATE: &str = "data-phx-link-state";
pub const PHX_COMPONENT: &str = "data-phx-component";

// Suffixes, used through `LiveSocket::binding`.
pub const PHX_CLICK: &str = "click";
pub const PHX_CAPTURE_CLICK: &str = "capture-click";
pub const PHX_CHANGE: &str = "change";
pub const PHX_SUBMIT: &str = "submit";
pub const PHX_TARGET: &str = "target";
pub const PHX_DEBOUNCE: &str = "debounce";
pub const PHX_THROTTLE: &str = "throttle";
pub const PHX_KEY: &str = "key";
pub const PHX_DROP_TARGET: &str = "drop-target";
pub const PHX_VALUE: &str = "value-";
pub const PHX_WINDOW: &str = "window-";

pub const PHX_TRACK_UPLOADS: &str = "track-uploads";

pub const PHX_LOADING_CLASS: &str = "phx-loading";
pub const PHX_CONNECTED_CLASS: &str = "phx-connected";

pub const PHX_LV_DEBUG: &str = "phx:live-socket:debug";
pub const PHX_LV_PROFILE: &str = "phx:live-socket:profiling";
pub const PHX_LV_LATENCY_SIM: &str = "phx:live-socket:latency-sim";
pub const PHX_FLASH: &str = "phx:flash";

pub const PAGE_LOADING_START: &str = "phx:page-loading-start";
pub const PAGE_LOADING_STOP: &str = "phx:page-loading-stop";

/// Local storage sub-key of the per-path reload counter.
pub const CONSECUTIVE_RELOADS: &str = "consecutive-reloads";
/// Counts strictly above this enter failsafe mode.
pub const MAX_RELOADS: u32 = 5;
/// Inclusive bounds, in milliseconds.
pub const RELOAD_JITTER: (u32, u32) = (1000, 3000);
pub const FAILSAFE_JITTER: u32 = 30_000;

pub const LOADER_TIMEOUT: u32 = 1;
pub const PUSH_TIMEOUT: u32 = 30_000;
pub const SCROLL_PERSIST_DELAY: u32 = 100;

pub const DEFAULT_DEBOUNCE: u32 = 300;
pub const DEFAULT_THROTTLE: u32 = 300;
