//! Release archives laid out like the ones on the dist site

use std::io::{Cursor, Write};

use node_build::runtime::platform::{ArchiveFormat, PlatformTag};

/// Archive for `version` on `platform`, with `files` under the install directory
pub fn release_archive(version: &str, platform: &PlatformTag, files: &[(&str, &str)]) -> Vec<u8> {
    let root = platform.install_dir_name(version);
    let entries = files
        .iter()
        .map(|(path, content)| (format!("{}/{}", root, path), content.as_bytes()));

    match platform.archive_format() {
        ArchiveFormat::TarGz => {
            let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
            let mut builder = tar::Builder::new(encoder);
            for (path, content) in entries {
                let mut header = tar::Header::new_gnu();
                header.set_size(content.len() as u64);
                header.set_mode(0o755);
                builder.append_data(&mut header, path, content).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap()
        }
        ArchiveFormat::Zip => {
            let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
            for (path, content) in entries {
                writer.start_file(path, Default::default()).unwrap();
                writer.write_all(content).unwrap();
            }
            writer.finish().unwrap().into_inner()
        }
    }
}
