pub mod error;

/// Returns the trimmed value when it holds anything other than whitespace.
///
/// Manifest cells and remote string fields both use "empty means absent", so this is the single
/// place that rule lives.
pub fn non_blank(value: &str) -> Option<&str> {
	let trimmed = value.trim();
	(!trimmed.is_empty()).then_some(trimmed)
}

/// Same as [`non_blank`], for optional owned strings coming out of deserialization.
pub fn non_blank_owned(value: Option<String>) -> Option<String> {
	value.and_then(|v| non_blank(&v).map(ToString::to_string))
}
