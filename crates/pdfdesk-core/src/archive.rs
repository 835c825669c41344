//! ZIP container writer, shared by the slide deck builder and multi-file
//! result bundling.

use crate::error::PdfDeskError;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write `entries` (path, contents) into a ZIP archive, in order.
pub fn bundle<N, C>(entries: impl IntoIterator<Item = (N, C)>) -> Result<Vec<u8>, PdfDeskError>
where
    N: AsRef<str>,
    C: AsRef<[u8]>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, contents) in entries {
        writer
            .start_file(name.as_ref(), options)
            .map_err(|e| PdfDeskError::EncodeError(format!("{}: {}", name.as_ref(), e)))?;
        writer
            .write_all(contents.as_ref())
            .map_err(|e| PdfDeskError::EncodeError(format!("{}: {}", name.as_ref(), e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| PdfDeskError::EncodeError(e.to_string()))?;
    Ok(cursor.into_inner())
}
