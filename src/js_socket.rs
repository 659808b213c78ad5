//! [`Socket`] implementation backed by a Phoenix-compatible JavaScript socket.

use crate::{
	channel::{Channel, Push, ReplyCallback, ReplyKind, Socket},
	error::Error,
};
use js_sys::{Array, Function, Reflect};
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, instrument};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

pub(crate) fn to_js(value: &Value) -> JsValue {
	serde_json::to_string(value)
		.ok()
		.and_then(|json| js_sys::JSON::parse(&json).ok())
		.unwrap_or(JsValue::UNDEFINED)
}

pub(crate) fn from_js(value: &JsValue) -> Value {
	if value.is_undefined() {
		return Value::Null;
	}
	js_sys::JSON::stringify(value)
		.ok()
		.and_then(|json| json.as_string())
		.and_then(|json| serde_json::from_str(&json).ok())
		.unwrap_or(Value::Null)
}

fn call_method(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, Error> {
	let function: Function = Reflect::get(target, &JsValue::from_str(method))?
		.dyn_into()
		.map_err(|_| Error::Js(format!("`{}` is not a function", method)))?;
	Ok(function.apply(target, args)?)
}

fn call_logged(target: &JsValue, method: &str, args: &Array) -> JsValue {
	call_method(target, method, args).unwrap_or_else(|error| {
		error!("Socket call `{}` failed: {}", method, error);
		JsValue::UNDEFINED
	})
}

#[derive(Debug, Clone)]
pub struct JsSocket {
	socket: JsValue,
}

impl JsSocket {
	/// Constructs the JavaScript socket as `new constructor(endpoint, options)`.
	///
	/// # Errors
	///
	/// Fails without side effects if `endpoint` is empty, if `constructor` isn't callable
	/// (for example a plain options object passed by mistake), or if construction throws.
	#[instrument(skip(constructor, options))]
	pub fn new(constructor: &JsValue, endpoint: &str, options: &JsValue) -> Result<Self, Error> {
		if endpoint.is_empty() {
			return Err(Error::EmptyEndpoint);
		}
		let constructor = constructor.dyn_ref::<Function>().ok_or_else(|| Error::InvalidSocketConstructor {
			endpoint: endpoint.to_owned(),
		})?;
		let socket = Reflect::construct(constructor, &Array::of2(&JsValue::from_str(endpoint), options))?;
		Ok(Self { socket })
	}

	/// The underlying JavaScript socket.
	#[must_use]
	pub fn as_js(&self) -> &JsValue {
		&self.socket
	}
}

impl Socket for JsSocket {
	fn open(&self) {
		call_logged(&self.socket, "connect", &Array::new());
	}

	fn close(&self, on_close: Option<Box<dyn FnOnce()>>) {
		let args = match on_close {
			Some(on_close) => Array::of1(&Closure::once_into_js(move || on_close())),
			None => Array::new(),
		};
		call_logged(&self.socket, "disconnect", &args);
	}

	fn is_connected(&self) -> bool {
		call_logged(&self.socket, "isConnected", &Array::new()).is_truthy()
	}

	fn on_open(&self, callback: Box<dyn FnMut()>) {
		let callback = Closure::wrap(callback).into_js_value();
		call_logged(&self.socket, "onOpen", &Array::of1(&callback));
	}

	fn channel(&self, topic: &str, params: Value) -> Rc<dyn Channel> {
		let channel = call_logged(&self.socket, "channel", &Array::of2(&JsValue::from_str(topic), &to_js(&params)));
		Rc::new(JsChannel(channel))
	}
}

#[derive(Debug, Clone)]
struct JsChannel(JsValue);

impl Channel for JsChannel {
	fn join(&self) -> Box<dyn Push> {
		Box::new(JsPush(call_logged(&self.0, "join", &Array::new())))
	}

	fn leave(&self) {
		call_logged(&self.0, "leave", &Array::new());
	}

	fn push(&self, event: &str, payload: Value, timeout: Option<u32>) -> Box<dyn Push> {
		let timeout = timeout.map_or(JsValue::UNDEFINED, |timeout| JsValue::from_f64(f64::from(timeout)));
		let args = Array::of3(&JsValue::from_str(event), &to_js(&payload), &timeout);
		Box::new(JsPush(call_logged(&self.0, "push", &args)))
	}

	fn on(&self, event: &str, mut callback: Box<dyn FnMut(Value)>) {
		let callback = Closure::wrap(Box::new(move |message: JsValue| callback(from_js(&message))) as Box<dyn FnMut(JsValue)>).into_js_value();
		call_logged(&self.0, "on", &Array::of2(&JsValue::from_str(event), &callback));
	}
}

#[derive(Debug, Clone)]
struct JsPush(JsValue);

impl Push for JsPush {
	fn receive(self: Box<Self>, kind: ReplyKind, mut callback: ReplyCallback) -> Box<dyn Push> {
		let callback = Closure::wrap(Box::new(move |reply: JsValue| callback(from_js(&reply))) as Box<dyn FnMut(JsValue)>).into_js_value();
		let chained = call_logged(&self.0, "receive", &Array::of2(&JsValue::from_str(kind.as_str()), &callback));
		if chained.is_object() {
			Box::new(JsPush(chained))
		} else {
			self
		}
	}
}
