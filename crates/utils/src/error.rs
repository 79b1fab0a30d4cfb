use std::{
	fmt::Display,
	io::{self, ErrorKind},
	path::Path,
};

use thiserror::Error;
use tracing::error;

/// Report an error with tracing
pub fn report_error<T>(res: &Result<T, impl Display>, context: &str) {
	if let Err(e) = res {
		error!(%context, "{e:#}");
	}
}

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: io::Error,
	pub maybe_context: Option<&'static str>,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "file I/O error")?;
		if let Some(ctx) = self.maybe_context {
			write!(f, " ({ctx})")?;
		}
		write!(f, ": {}; path: '{}'", self.source, self.path.display())
	}
}

impl FileIOError {
	pub fn from_std_io_err(path: impl AsRef<Path>, source: io::Error) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: None,
		}
	}

	pub fn with_context(
		path: impl AsRef<Path>,
		source: io::Error,
		context: &'static str,
	) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
			maybe_context: Some(context),
		}
	}

	#[must_use]
	pub fn is_not_found(&self) -> bool {
		self.source.kind() == ErrorKind::NotFound
	}
}
