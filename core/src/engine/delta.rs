//! Selection of the manifest rows a run has to push.

use crate::{manifest::ManifestRow, watermark::Watermark};

/// A row is eligible when every required cell is filled in and it is flagged as having an image.
pub fn is_eligible(row: &ManifestRow) -> bool {
	[
		&row.category1,
		&row.category2,
		&row.country,
		&row.filepath,
		&row.updated_at,
	]
	.iter()
	.all(|value| !value.is_empty())
		&& row.has_image()
}

/// Keeps the eligible rows updated strictly after `watermark`, preserving manifest order.
pub fn select(rows: Vec<ManifestRow>, watermark: &Watermark) -> Vec<ManifestRow> {
	rows.into_iter()
		.filter(|row| is_eligible(row) && watermark.is_before(&row.updated_at))
		.collect()
}
