//! Release archive extraction

use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use tracing::debug;

use crate::runtime::error::CacheError;
use crate::runtime::platform::ArchiveFormat;

/// Extract archive bytes into `dest`, keeping the archive's top-level directory
pub fn extract(
    archive_name: &str,
    format: ArchiveFormat,
    bytes: &[u8],
    dest: &Path,
) -> Result<(), CacheError> {
    fs::create_dir_all(dest)?;
    debug!("Extracting {} into {:?}", archive_name, dest);

    let extract_error = |e: &dyn std::fmt::Display| CacheError::Extract {
        archive: archive_name.to_string(),
        reason: e.to_string(),
    };

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(bytes, dest).map_err(|e| extract_error(&e)),
        ArchiveFormat::Zip => extract_zip(bytes, dest).map_err(|e| extract_error(&e)),
    }
}

fn extract_tar_gz(bytes: &[u8], dest: &Path) -> io::Result<()> {
    let gz_decoder = flate2::read::GzDecoder::new(Cursor::new(bytes));
    let mut archive = tar::Archive::new(gz_decoder);
    archive.set_preserve_permissions(true);
    archive.unpack(dest)
}

fn extract_zip(bytes: &[u8], dest: &Path) -> zip::result::ZipResult<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        // Entries escaping the destination are skipped
        let Some(relative) = file.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let out_path = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = fs::File::create(&out_path)?;
            io::copy(&mut file, &mut out_file)?;
        }
    }

    Ok(())
}
