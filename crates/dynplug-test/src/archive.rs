//! Gzip tarball builders.

use std::io::Write;

/// Gzip-compress `data`.
#[must_use]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Build a well-formed gzipped tarball of regular files.
///
/// Paths go through `tar`'s own validation, so only safe paths are accepted
/// here. Use [`raw_tarball`] for hostile archives.
#[must_use]
pub fn npm_tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for &(path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).expect("valid tar path");
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, data).expect("append tar entry");
    }
    gzip(&builder.into_inner().expect("finish tar"))
}

/// A hand-assembled tar entry that bypasses `tar`'s path validation.
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// Raw bytes written into the 100-byte name field.
    pub path: Vec<u8>,
    /// Payload written after the header.
    pub data: Vec<u8>,
    /// Size written into the header; defaults to `data.len()`.
    pub declared_size: u64,
    /// Typeflag byte (`b'0'` regular, `b'2'` symlink, `b'5'` directory...).
    pub typeflag: u8,
    /// Link target for link entries.
    pub link_name: Vec<u8>,
    /// Write the `ustar` magic. The reader only honours PAX headers that
    /// carry it.
    pub ustar: bool,
}

impl RawEntry {
    /// A regular file whose declared size matches its payload.
    #[must_use]
    pub fn file(path: &str, data: &[u8]) -> Self {
        Self {
            path: path.as_bytes().to_vec(),
            data: data.to_vec(),
            declared_size: data.len() as u64,
            typeflag: b'0',
            link_name: Vec::new(),
            ustar: false,
        }
    }

    /// A directory entry.
    #[must_use]
    pub fn dir(path: &str) -> Self {
        Self {
            typeflag: b'5',
            ..Self::file(path, b"")
        }
    }

    /// A symbolic link pointing at `target`.
    #[must_use]
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            typeflag: b'2',
            link_name: target.as_bytes().to_vec(),
            ..Self::file(path, b"")
        }
    }

    /// A PAX extended header (`x`) applying `records` to the next entry.
    #[must_use]
    pub fn pax(records: &[(&str, &str)]) -> Self {
        let mut data = Vec::new();
        for &(key, value) in records {
            data.extend_from_slice(&pax_record(key, value));
        }
        Self {
            typeflag: b'x',
            ustar: true,
            ..Self::file("PaxHeader/entry", &data)
        }
    }

    /// Override the size written into the header.
    #[must_use]
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }

    fn header(&self) -> [u8; 512] {
        let mut header = [0u8; 512];

        let len = self.path.len().min(100);
        header[..len].copy_from_slice(&self.path[..len]);
        header[100..108].copy_from_slice(b"0000644\0");

        let size = format!("{:011o}\0", self.declared_size);
        header[124..136].copy_from_slice(size.as_bytes());
        header[156] = self.typeflag;
        if self.ustar {
            header[257..263].copy_from_slice(b"ustar\0");
            header[263..265].copy_from_slice(b"00");
        }

        let link_len = self.link_name.len().min(100);
        header[157..157 + link_len].copy_from_slice(&self.link_name[..link_len]);

        // Checksum is computed with its own field treated as spaces.
        header[148..156].copy_from_slice(b"        ");
        let cksum: u32 = header.iter().map(|&b| u32::from(b)).sum();
        header[148..156].copy_from_slice(format!("{cksum:06o}\0 ").as_bytes());
        header
    }
}

/// One `"<len> <key>=<value>\n"` record; `<len>` counts its own digits.
fn pax_record(key: &str, value: &str) -> Vec<u8> {
    let body = format!(" {key}={value}\n");
    let mut len = body.len();
    while len.to_string().len() + body.len() != len {
        len = len.to_string().len() + body.len();
    }
    format!("{len}{body}").into_bytes()
}

/// Assemble a gzipped tarball from raw entries.
#[must_use]
pub fn raw_tarball(entries: &[RawEntry]) -> Vec<u8> {
    let mut tar_data = Vec::new();
    for entry in entries {
        tar_data.extend_from_slice(&entry.header());
        tar_data.extend_from_slice(&entry.data);
        let padding = (512 - (entry.data.len() % 512)) % 512;
        tar_data.extend(std::iter::repeat_n(0u8, padding));
    }
    // End-of-archive marker: two zero blocks.
    tar_data.extend(std::iter::repeat_n(0u8, 1024));
    gzip(&tar_data)
}
