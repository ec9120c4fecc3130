use std::collections::BTreeMap;
use std::sync::Arc;

use derive_more::Deref;

use crate::engine::Value;

/// Variable bindings shared by every line of a document.
///
/// Cloning is cheap: the map is only copied when a clone is written to, so
/// each line can work on its own snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deref)]
pub struct Scope(Arc<BTreeMap<String, Value>>);

impl Scope {
	pub fn insert(&mut self, name: impl Into<String>, value: Value) {
		Arc::make_mut(&mut self.0).insert(name.into(), value);
	}

	pub fn remove(&mut self, name: &str) -> Option<Value> {
		if !self.0.contains_key(name) {
			return None;
		}

		Arc::make_mut(&mut self.0).remove(name)
	}

	/// A copy of this scope where `name` is bound to `value` unless the scope
	/// already binds it.
	#[must_use]
	pub fn seeded_with(&self, name: &str, value: Value) -> Self {
		let mut seeded = self.clone();
		if !seeded.contains_key(name) {
			seeded.insert(name, value);
		}

		seeded
	}

	/// Copy every binding of `other` into this scope. Nothing is removed.
	pub fn merge(&mut self, other: &Scope) {
		if Arc::ptr_eq(&self.0, &other.0) {
			return;
		}

		let bindings = Arc::make_mut(&mut self.0);
		for (name, value) in other.iter() {
			bindings.insert(name.clone(), value.clone());
		}
	}
}
