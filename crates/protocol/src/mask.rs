//! Target masks for partial (re)dispatch.

use serde::{Deserialize, Serialize};

/// The subset of a request's targets selected for processing.
///
/// One bit per target index. A dispatch with a partial mask leaves the
/// unmasked result slots at their prior values, which is how callers retry
/// only the targets that failed previously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
	bits: Vec<bool>,
}

impl Mask {
	/// Mask with every one of `len` targets selected.
	pub fn all(len: usize) -> Self {
		Self { bits: vec![true; len] }
	}

	/// Mask with none of `len` targets selected.
	pub fn none(len: usize) -> Self {
		Self { bits: vec![false; len] }
	}

	/// Mask of `len` targets with exactly `indices` selected.
	///
	/// Indices outside `0..len` are ignored.
	pub fn from_indices(len: usize, indices: &[usize]) -> Self {
		let mut mask = Self::none(len);
		for &index in indices {
			mask.set(index);
		}
		mask
	}

	/// Selects the target at `index`. Out-of-range indices are ignored.
	pub fn set(&mut self, index: usize) {
		if let Some(bit) = self.bits.get_mut(index) {
			*bit = true;
		}
	}

	/// Deselects the target at `index`. Out-of-range indices are ignored.
	pub fn clear(&mut self, index: usize) {
		if let Some(bit) = self.bits.get_mut(index) {
			*bit = false;
		}
	}

	/// Returns `true` when the target at `index` is selected.
	///
	/// Out-of-range indices answer `false`.
	pub fn is_set(&self, index: usize) -> bool {
		self.bits.get(index).copied().unwrap_or(false)
	}

	/// Number of targets the mask covers.
	pub fn len(&self) -> usize {
		self.bits.len()
	}

	/// Returns `true` when the mask covers zero targets.
	pub fn is_empty(&self) -> bool {
		self.bits.is_empty()
	}

	/// Number of selected targets.
	pub fn count_set(&self) -> usize {
		self.bits.iter().filter(|&&bit| bit).count()
	}
}
