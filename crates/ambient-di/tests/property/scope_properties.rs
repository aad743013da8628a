//! Property-based tests for scope stacks and resolution
//!
//! Uses proptest to verify invariants of the scope system:
//! 1. Override and restore - the effective context at every depth is the
//!    right-biased merge of the open layers, and closing restores it exactly
//! 2. Resolution succeeds iff every declared name is visible
//! 3. Resolution idempotency - resolving twice yields the same values
//! 4. Depth bookkeeping - guard depth matches the number of open scopes

use ambient_di::{
	Bindings, ScopeLayer, Target, current_context, enter_scope, resolve_current, scope, scope_depth,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const NAMES: &[&str] = &["logger", "db", "cache", "config", "clock"];

/// One layer: a small map from name index to value.
fn layer_strategy() -> impl Strategy<Value = BTreeMap<usize, u32>> {
	prop::collection::btree_map(0..NAMES.len(), any::<u32>(), 0..=NAMES.len())
}

fn to_bindings(layer: &BTreeMap<usize, u32>) -> Bindings {
	layer
		.iter()
		.fold(Bindings::new(), |bindings, (&idx, &value)| bindings.bind(NAMES[idx], value))
}

fn snapshot(context: &ScopeLayer) -> BTreeMap<String, u32> {
	context
		.names()
		.into_iter()
		.filter_map(|name| {
			context
				.get_as::<u32>(name.as_str())
				.map(|value| (name.to_string(), *value))
		})
		.collect()
}

fn expected_merge(layers: &[BTreeMap<usize, u32>]) -> BTreeMap<String, u32> {
	let mut merged = BTreeMap::new();
	for layer in layers {
		for (&idx, &value) in layer {
			merged.insert(NAMES[idx].to_string(), value);
		}
	}
	merged
}

#[test]
fn prop_nested_override_and_restore() {
	proptest!(|(layers in prop::collection::vec(layer_strategy(), 1..6))| {
		let mut guards = Vec::new();
		let mut seen_on_entry = Vec::new();

		for layer in &layers {
			guards.push(enter_scope(to_bindings(layer)));
			seen_on_entry.push(snapshot(&current_context().unwrap()));
		}

		for (depth, seen) in seen_on_entry.iter().enumerate() {
			prop_assert_eq!(seen, &expected_merge(&layers[..=depth]));
		}

		// Close innermost first and check every intermediate context
		while let Some(guard) = guards.pop() {
			drop(guard);
			let restored = snapshot(&current_context().unwrap());
			prop_assert_eq!(restored, expected_merge(&layers[..guards.len()]));
			prop_assert_eq!(scope_depth().unwrap(), guards.len());
		}
	});
}

#[test]
fn prop_resolution_succeeds_iff_all_names_visible() {
	proptest!(|(
		layers in prop::collection::vec(layer_strategy(), 0..4),
		declared in prop::collection::vec(0..NAMES.len(), 0..4),
	)| {
		let guards: Vec<_> = layers.iter().map(|layer| enter_scope(to_bindings(layer))).collect();
		let visible: BTreeSet<usize> = layers.iter().flat_map(|layer| layer.keys().copied()).collect();

		let target = declared
			.iter()
			.fold(Target::new("prop_target"), |target, &idx| target.depends_on(NAMES[idx]));
		let result = resolve_current(&target);

		match declared.iter().find(|idx| !visible.contains(*idx)) {
			None => {
				let resolved = result.unwrap();
				let merged = expected_merge(&layers);
				for &idx in &declared {
					prop_assert_eq!(resolved.get::<u32>(NAMES[idx]).unwrap(), merged[NAMES[idx]]);
				}
			}
			Some(&first_missing) => {
				let err = result.unwrap_err();
				let not_found = err.as_not_found().unwrap();
				prop_assert_eq!(not_found.name().as_str(), NAMES[first_missing]);
				prop_assert_eq!(not_found.available().len(), visible.len());
			}
		}

		// innermost first
		guards.into_iter().rev().for_each(drop);
		prop_assert_eq!(scope_depth().unwrap(), 0);
	});
}

#[test]
fn prop_resolution_idempotency() {
	proptest!(|(layer in layer_strategy(), attempts in 2usize..6)| {
		let target = layer
			.keys()
			.fold(Target::new("prop_target"), |target, &idx| target.depends_on(NAMES[idx]));

		let values: Vec<Vec<u32>> = scope(to_bindings(&layer), || {
			(0..attempts)
				.map(|_| {
					let resolved = resolve_current(&target).unwrap();
					layer
						.keys()
						.map(|&idx| resolved.get::<u32>(NAMES[idx]).unwrap())
						.collect()
				})
				.collect()
		});

		prop_assert!(values.windows(2).all(|pair| pair[0] == pair[1]));
	});
}

proptest! {
	#[test]
	fn prop_guard_depth_tracks_open_scopes(count in 1usize..8) {
		let guards: Vec<_> = (0..count).map(|_| enter_scope(Bindings::new())).collect();

		for (i, guard) in guards.iter().enumerate() {
			prop_assert_eq!(guard.depth(), i + 1);
		}
		prop_assert_eq!(scope_depth().unwrap(), count);

		// innermost first
		guards.into_iter().rev().for_each(drop);
		prop_assert_eq!(scope_depth().unwrap(), 0);
	}
}
