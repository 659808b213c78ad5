//! Suppression of duplicate `input`/`change` pairs.
//!
//! Browsers disagree on which of the two they emit for one edit, and some emit both back to back.
//! Every form event advances one shared counter. An event is dropped when the same element saw the
//! other kind at the immediately preceding count.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
	Input,
	Change,
}

impl InputKind {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			InputKind::Input => "input",
			InputKind::Change => "change",
		}
	}

	#[must_use]
	pub fn from_event_type(event_type: &str) -> Option<Self> {
		match event_type {
			"input" => Some(InputKind::Input),
			"change" => Some(InputKind::Change),
			_ => None,
		}
	}
}

/// The last accepted form event of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iteration {
	pub at: u64,
	pub kind: InputKind,
}

#[derive(Debug, Default)]
pub struct InputIterations {
	next: u64,
}

impl InputIterations {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the counter and decides whether an event of `kind` is a new logical edit.
	///
	/// Returns the iteration to store for the element, or [`None`] if the event is a duplicate
	/// (in which case the stored iteration must be left as is).
	pub fn observe(&mut self, previous: Option<Iteration>, kind: InputKind) -> Option<Iteration> {
		let current = self.next;
		self.next += 1;
		match previous {
			Some(previous) if previous.at + 1 == current && previous.kind != kind => None,
			_ => Some(Iteration { at: current, kind }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn input_then_change_forwards_once() {
		let mut iterations = InputIterations::new();
		let first = iterations.observe(None, InputKind::Input);
		assert!(first.is_some());
		assert_eq!(iterations.observe(first, InputKind::Change), None);
	}

	#[test]
	fn change_then_input_forwards_once() {
		let mut iterations = InputIterations::new();
		let first = iterations.observe(None, InputKind::Change);
		assert_eq!(iterations.observe(first, InputKind::Input), None);
	}

	#[test]
	fn repeated_input_is_not_a_duplicate() {
		let mut iterations = InputIterations::new();
		let first = iterations.observe(None, InputKind::Input);
		let second = iterations.observe(first, InputKind::Input);
		assert_eq!(second, Some(Iteration { at: 1, kind: InputKind::Input }));
	}

	#[test]
	fn other_elements_break_adjacency() {
		let mut iterations = InputIterations::new();
		let a = iterations.observe(None, InputKind::Input);
		let _b = iterations.observe(None, InputKind::Input);
		assert_eq!(iterations.observe(a, InputKind::Change), Some(Iteration { at: 2, kind: InputKind::Change }));
	}

	#[test]
	fn suppressed_event_keeps_previous_iteration() {
		let mut iterations = InputIterations::new();
		let first = iterations.observe(None, InputKind::Input);
		assert_eq!(iterations.observe(first, InputKind::Change), None);
		// The caller keeps `first`; the next edit is accepted again.
		assert!(iterations.observe(first, InputKind::Input).is_some());
	}
}
