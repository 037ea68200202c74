use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Reads a text file and returns its full contents as a `String`.
///
/// - Reads the entire file into memory
/// - Keeps line endings as-is; tokenizers decide how to split
pub(crate) fn read_text<P: AsRef<Path>>(filename: P) -> Result<String> {
	let mut contents = String::new();
	File::open(filename)?.read_to_string(&mut contents)?;
	Ok(contents)
}
