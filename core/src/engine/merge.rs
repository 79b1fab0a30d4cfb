//! Image slot reconciliation.

use ds_catalog_api::MediaId;

/// Places `new` into the existing image list.
///
/// The element at `slot` is replaced when the list is long enough; otherwise (or without a slot)
/// the asset is appended, never padded. No other element is ever dropped. If `new` is still not
/// in the list afterwards it is appended.
pub fn merge_images(existing: &[MediaId], slot: Option<usize>, new: MediaId) -> Vec<MediaId> {
	let mut images = existing.to_vec();

	match slot.and_then(|slot| images.get_mut(slot)) {
		Some(current) => *current = new,
		None => images.push(new),
	}

	if !images.contains(&new) {
		images.push(new);
	}

	images
}
