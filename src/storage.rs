//! Key/value storage capability, in two scopes: session and local (persistent).

use crate::constants::CONSECUTIVE_RELOADS;
use core::cell::RefCell;
use hashbrown::HashMap;
use tracing::error;

/// Mirrors the [***Storage***](https://developer.mozilla.org/en-US/docs/Web/API/Storage) interface.
///
/// Implement this for environments without access to the browser's storage,
/// for example cross-origin iframes.
pub trait Storage {
	fn get_item(&self, key: &str) -> Option<String>;
	fn set_item(&self, key: &str, value: &str);
	fn remove_item(&self, key: &str);
}

impl Storage for web_sys::Storage {
	fn get_item(&self, key: &str) -> Option<String> {
		web_sys::Storage::get_item(self, key).unwrap_or_else(|error| {
			error!("Failed to read storage key {:?}: {:?}", key, error);
			None
		})
	}

	fn set_item(&self, key: &str, value: &str) {
		if let Err(error) = web_sys::Storage::set_item(self, key, value) {
			error!("Failed to write storage key {:?}: {:?}", key, error)
		}
	}

	fn remove_item(&self, key: &str) {
		if let Err(error) = web_sys::Storage::remove_item(self, key) {
			error!("Failed to remove storage key {:?}: {:?}", key, error)
		}
	}
}

/// In-memory [`Storage`] that is lost on reload.
#[derive(Debug, Default)]
pub struct MemoryStorage(RefCell<HashMap<String, String>>);
impl MemoryStorage {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}
}
impl Storage for MemoryStorage {
	fn get_item(&self, key: &str) -> Option<String> {
		self.0.borrow().get(key).cloned()
	}

	fn set_item(&self, key: &str, value: &str) {
		self.0.borrow_mut().insert(key.to_owned(), value.to_owned());
	}

	fn remove_item(&self, key: &str) {
		self.0.borrow_mut().remove(key);
	}
}

#[must_use]
pub fn local_key(namespace: &str, sub_key: &str) -> String {
	format!("{}-{}", namespace, sub_key)
}

/// Reads, transforms and writes back a JSON-encoded value in one synchronous step.
///
/// A missing or undecodable value is replaced with `initial` before `update` is applied.
pub fn update_local<T, F>(storage: &dyn Storage, namespace: &str, sub_key: &str, initial: T, update: F) -> T
where
	T: serde::Serialize + serde::de::DeserializeOwned,
	F: FnOnce(T) -> T,
{
	let key = local_key(namespace, sub_key);
	let current = storage
		.get_item(&key)
		.and_then(|stored| serde_json::from_str(&stored).ok())
		.unwrap_or(initial);
	let next = update(current);
	match serde_json::to_string(&next) {
		Ok(encoded) => storage.set_item(&key, &encoded),
		Err(error) => error!("Failed to encode value for storage key {:?}: {}", key, error),
	}
	next
}

/// Increments the consecutive reload counter for `path` and returns the new count.
pub fn bump_consecutive_reloads(storage: &dyn Storage, path: &str) -> u32 {
	update_local(storage, path, CONSECUTIVE_RELOADS, 0_u32, |count| count.saturating_add(1))
}

/// Clears the consecutive reload counter for `path`.
///
/// Never called from within this crate: applications decide when a page counts as recovered.
pub fn reset_consecutive_reloads(storage: &dyn Storage, path: &str) {
	storage.remove_item(&local_key(path, CONSECUTIVE_RELOADS))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reload_counter_starts_from_zero_per_path() {
		let storage = MemoryStorage::new();
		assert_eq!(bump_consecutive_reloads(&storage, "/p"), 1);
		assert_eq!(bump_consecutive_reloads(&storage, "/p"), 2);
		assert_eq!(bump_consecutive_reloads(&storage, "/q"), 1);
		assert_eq!(storage.get_item("/p-consecutive-reloads").as_deref(), Some("2"));
	}

	#[test]
	fn garbage_counter_is_replaced() {
		let storage = MemoryStorage::new();
		storage.set_item("/p-consecutive-reloads", "not json");
		assert_eq!(bump_consecutive_reloads(&storage, "/p"), 1);
	}

	#[test]
	fn reset_removes_counter() {
		let storage = MemoryStorage::new();
		bump_consecutive_reloads(&storage, "/p");
		reset_consecutive_reloads(&storage, "/p");
		assert_eq!(storage.get_item("/p-consecutive-reloads"), None);
		assert_eq!(bump_consecutive_reloads(&storage, "/p"), 1);
	}
}
