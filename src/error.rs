use wasm_bindgen::JsValue;

/// Failures surfaced to the code constructing or driving a [`LiveSocket`](`crate::LiveSocket`).
///
/// Recoverable runtime conditions (push timeouts, stale navigations, join crash loops) are not errors;
/// they degrade to a page reload or are dropped silently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(
		"a Phoenix-compatible socket constructor must be provided to connect to {endpoint:?}, \
		for example `JsSocket::new(&Socket, \"/live\", &opts)` with `import {{Socket}} from \"phoenix\"`"
	)]
	InvalidSocketConstructor { endpoint: String },

	#[error("the live socket endpoint must not be empty")]
	EmptyEndpoint,

	#[error("no global `window` is available")]
	NoWindow,

	#[error("{0} is unavailable and no replacement storage was configured")]
	StorageUnavailable(&'static str),

	#[error("expected {attribute} to be \"patch\" or \"redirect\", got: {value:?}")]
	InvalidLinkType { attribute: &'static str, value: String },

	#[error("JavaScript error: {0}")]
	Js(String),
}

impl From<JsValue> for Error {
	fn from(value: JsValue) -> Self {
		Self::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
	}
}
