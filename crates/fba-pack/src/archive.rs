//! # Archive Structural Validation
//!
//! An artifact is a ZIP archive. Before any entry is extracted, the whole
//! container is walked and checked against its own declarations:
//!
//! - local file header signature at offset 0;
//! - an end-of-central-directory (EOCD) record whose comment length reaches
//!   exactly to the end of the buffer, with no second EOCD signature inside
//!   that comment;
//! - central directory offset + size landing exactly on the EOCD record;
//! - declared entry count matching the records present;
//! - every local header in bounds, signed, and with its data ending before
//!   the central directory;
//! - unique, UTF-8 entry names;
//! - configured size and count limits.
//!
//! Multi-disk, zip64, and encrypted archives are rejected. Extraction
//! (decompression and CRC-32 verification) is delegated to the `zip` crate
//! once the layout is known to be consistent, and every entry the reader
//! hands back is checked against the validated record before use.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};

use zip::result::ZipError;
use zip::ZipArchive;

use crate::decoder::DecodeLimits;
use crate::error::{DecodeError, DecodeResult};

/// Signature of a local file header (`PK\x03\x04`).
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
/// Signature of a central directory file header (`PK\x01\x02`).
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
/// Signature of the end-of-central-directory record (`PK\x05\x06`).
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;

const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_HEADER_LEN: usize = 46;
const EOCD_LEN: usize = 22;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

const FLAG_ENCRYPTED: u16 = 0x0001;
const ZIP64_U16: u16 = u16::MAX;
const ZIP64_U32: u32 = u32::MAX;

/// A validated central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Entry path inside the archive.
    pub name: String,
    /// Offset of the central directory record describing this entry.
    pub record_offset: u64,
    /// Offset of the entry's local file header.
    pub local_header_offset: u64,
    /// Declared compressed size.
    pub compressed_size: u64,
    /// Declared uncompressed size.
    pub uncompressed_size: u64,
    /// Declared CRC-32 of the uncompressed contents.
    pub crc32: u32,
}

/// The validated layout of a ZIP archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    entries: Vec<EntryRecord>,
    central_directory_offset: u64,
    eocd_offset: u64,
}

impl ArchiveLayout {
    /// Walk and validate the archive structure of `bytes`.
    ///
    /// Reads nothing but headers; entry contents are not decompressed.
    pub fn inspect(bytes: &[u8], limits: &DecodeLimits) -> DecodeResult<Self> {
        let len = bytes.len() as u64;
        if len > limits.max_artifact_bytes {
            return Err(DecodeError::LimitExceeded {
                limit_name: "artifact size",
                limit: limits.max_artifact_bytes,
                actual: len,
            });
        }

        expect_signature(bytes, 0, LOCAL_HEADER_SIGNATURE, "local file header")?;
        if bytes.len() < LOCAL_HEADER_LEN + EOCD_LEN {
            return Err(DecodeError::Truncated {
                needed: (LOCAL_HEADER_LEN + EOCD_LEN) as u64,
                actual: len,
            });
        }

        let eocd = find_eocd(bytes).ok_or(DecodeError::MissingDirectory)?;

        let disk = read_u16(bytes, eocd + 4)?;
        let directory_disk = read_u16(bytes, eocd + 6)?;
        if disk != 0 || directory_disk != 0 {
            return Err(DecodeError::Unsupported {
                offset: (eocd + 4) as u64,
                feature: "multi-disk archive",
            });
        }

        let entries_on_disk = read_u16(bytes, eocd + 8)?;
        let total_entries = read_u16(bytes, eocd + 10)?;
        let directory_size = read_u32(bytes, eocd + 12)?;
        let directory_offset = read_u32(bytes, eocd + 16)?;
        let comment_len = read_u16(bytes, eocd + 20)?;

        if total_entries == ZIP64_U16 || directory_size == ZIP64_U32 || directory_offset == ZIP64_U32
        {
            return Err(DecodeError::Unsupported {
                offset: eocd as u64,
                feature: "zip64",
            });
        }

        let trailing = bytes.len() - eocd - EOCD_LEN;
        if usize::from(comment_len) != trailing {
            return Err(DecodeError::LengthMismatch {
                offset: (eocd + 20) as u64,
                field: "archive comment length",
                declared: u64::from(comment_len),
                actual: trailing as u64,
            });
        }

        // The `zip` reader takes the last signature it finds, so a second
        // one in the comment would make it read a different directory.
        if let Some(shadow) = shadowing_eocd(bytes, eocd) {
            return Err(DecodeError::Unsupported {
                offset: shadow as u64,
                feature: "end of central directory signature inside archive comment",
            });
        }

        if entries_on_disk != total_entries {
            return Err(DecodeError::LengthMismatch {
                offset: (eocd + 8) as u64,
                field: "entries on this disk",
                declared: u64::from(entries_on_disk),
                actual: u64::from(total_entries),
            });
        }

        if usize::from(total_entries) > limits.max_entries {
            return Err(DecodeError::LimitExceeded {
                limit_name: "entry count",
                limit: limits.max_entries as u64,
                actual: u64::from(total_entries),
            });
        }

        let directory_offset = directory_offset as usize;
        if directory_offset > eocd {
            return Err(DecodeError::LengthMismatch {
                offset: (eocd + 16) as u64,
                field: "central directory offset",
                declared: directory_offset as u64,
                actual: eocd as u64,
            });
        }
        if directory_offset.checked_add(directory_size as usize) != Some(eocd) {
            return Err(DecodeError::LengthMismatch {
                offset: (eocd + 12) as u64,
                field: "central directory size",
                declared: u64::from(directory_size),
                actual: (eocd - directory_offset) as u64,
            });
        }

        let mut names = BTreeSet::new();
        let mut entries = Vec::with_capacity(usize::from(total_entries));
        let mut pos = directory_offset;
        for _ in 0..total_entries {
            if pos + CENTRAL_HEADER_LEN > eocd {
                return Err(DecodeError::LengthMismatch {
                    offset: (eocd + 10) as u64,
                    field: "total entry count",
                    declared: u64::from(total_entries),
                    actual: entries.len() as u64,
                });
            }
            let (record, next) = read_central_record(bytes, pos, directory_offset, eocd, limits)?;
            if !names.insert(record.name.clone()) {
                return Err(DecodeError::DuplicateEntry {
                    name: record.name,
                    offset: pos as u64,
                });
            }
            entries.push(record);
            pos = next;
        }

        if pos != eocd {
            return Err(DecodeError::LengthMismatch {
                offset: (eocd + 12) as u64,
                field: "central directory size",
                declared: u64::from(directory_size),
                actual: (pos - directory_offset) as u64,
            });
        }

        Ok(Self {
            entries,
            central_directory_offset: directory_offset as u64,
            eocd_offset: eocd as u64,
        })
    }

    /// All entries in central directory order.
    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    /// Look up an entry by exact path.
    pub fn entry(&self, name: &str) -> Option<&EntryRecord> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Offset of the first central directory record.
    pub fn central_directory_offset(&self) -> u64 {
        self.central_directory_offset
    }

    /// Offset of the end-of-central-directory record.
    pub fn eocd_offset(&self) -> u64 {
        self.eocd_offset
    }
}

/// A structurally validated archive open for extraction.
pub(crate) struct Archive<'a> {
    layout: ArchiveLayout,
    reader: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Archive<'a> {
    /// Validate `bytes` and open them for entry extraction.
    pub(crate) fn open(bytes: &'a [u8], limits: &DecodeLimits) -> DecodeResult<Self> {
        let layout = ArchiveLayout::inspect(bytes, limits)?;
        let reader = ZipArchive::new(Cursor::new(bytes)).map_err(|e| DecodeError::Archive {
            reason: e.to_string(),
        })?;
        if reader.len() != layout.entries().len() {
            return Err(DecodeError::Archive {
                reason: format!(
                    "reader sees {} entries, central directory declares {}",
                    reader.len(),
                    layout.entries().len()
                ),
            });
        }
        Ok(Self { layout, reader })
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.layout.entry(name).is_some()
    }

    /// Extract one entry, verifying its CRC-32 and declared size.
    pub(crate) fn read_entry(&mut self, name: &str) -> DecodeResult<Vec<u8>> {
        let record = self
            .layout
            .entry(name)
            .cloned()
            .ok_or_else(|| DecodeError::MissingEntry {
                name: name.to_string(),
            })?;

        let corrupt = |reason: String| DecodeError::CorruptEntry {
            entry: record.name.clone(),
            offset: record.local_header_offset,
            reason,
        };

        let file = self.reader.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => DecodeError::MissingEntry {
                name: name.to_string(),
            },
            other => corrupt(other.to_string()),
        })?;

        if file.header_start() != record.local_header_offset
            || file.crc32() != record.crc32
            || file.compressed_size() != record.compressed_size
            || file.size() != record.uncompressed_size
        {
            return Err(corrupt(
                "archive reader disagrees with the validated central directory".to_string(),
            ));
        }

        // One byte past the declared size so an overlong stream is detected.
        let mut contents = Vec::new();
        file.take(record.uncompressed_size + 1)
            .read_to_end(&mut contents)
            .map_err(|e| corrupt(e.to_string()))?;

        if contents.len() as u64 != record.uncompressed_size {
            return Err(DecodeError::LengthMismatch {
                offset: record.record_offset + 24,
                field: "uncompressed size",
                declared: record.uncompressed_size,
                actual: contents.len() as u64,
            });
        }
        Ok(contents)
    }
}

/// Parse and validate the central directory record at `pos`.
///
/// Returns the record and the offset of the next one.
fn read_central_record(
    bytes: &[u8],
    pos: usize,
    directory_offset: usize,
    eocd: usize,
    limits: &DecodeLimits,
) -> DecodeResult<(EntryRecord, usize)> {
    expect_signature(bytes, pos, CENTRAL_HEADER_SIGNATURE, "central directory header")?;

    let flags = read_u16(bytes, pos + 8)?;
    if flags & FLAG_ENCRYPTED != 0 {
        return Err(DecodeError::Unsupported {
            offset: pos as u64,
            feature: "encrypted entry",
        });
    }

    let crc32 = read_u32(bytes, pos + 16)?;
    let compressed_size = read_u32(bytes, pos + 20)?;
    let uncompressed_size = read_u32(bytes, pos + 24)?;
    let name_len = usize::from(read_u16(bytes, pos + 28)?);
    let extra_len = usize::from(read_u16(bytes, pos + 30)?);
    let comment_len = usize::from(read_u16(bytes, pos + 32)?);
    let local_offset = read_u32(bytes, pos + 42)?;

    if compressed_size == ZIP64_U32 || uncompressed_size == ZIP64_U32 || local_offset == ZIP64_U32 {
        return Err(DecodeError::Unsupported {
            offset: pos as u64,
            feature: "zip64",
        });
    }

    let record_len = CENTRAL_HEADER_LEN + name_len + extra_len + comment_len;
    if pos + record_len > eocd {
        return Err(DecodeError::LengthMismatch {
            offset: (pos + 28) as u64,
            field: "central directory record length",
            declared: record_len as u64,
            actual: (eocd - pos) as u64,
        });
    }

    let name_start = pos + CENTRAL_HEADER_LEN;
    let name = std::str::from_utf8(&bytes[name_start..name_start + name_len])
        .map_err(|_| DecodeError::InvalidEntryName {
            offset: name_start as u64,
        })?
        .to_string();

    if u64::from(uncompressed_size) > limits.max_entry_bytes {
        return Err(DecodeError::LimitExceeded {
            limit_name: "entry size",
            limit: limits.max_entry_bytes,
            actual: u64::from(uncompressed_size),
        });
    }

    let local = local_offset as usize;
    if local + LOCAL_HEADER_LEN > directory_offset {
        return Err(DecodeError::LengthMismatch {
            offset: (pos + 42) as u64,
            field: "local header offset",
            declared: u64::from(local_offset),
            actual: directory_offset as u64,
        });
    }
    expect_signature(bytes, local, LOCAL_HEADER_SIGNATURE, "local file header")?;

    let local_name_len = usize::from(read_u16(bytes, local + 26)?);
    let local_extra_len = usize::from(read_u16(bytes, local + 28)?);
    let data_start = local + LOCAL_HEADER_LEN + local_name_len + local_extra_len;
    let available = directory_offset.saturating_sub(data_start);
    if data_start > directory_offset || compressed_size as usize > available {
        return Err(DecodeError::LengthMismatch {
            offset: (pos + 20) as u64,
            field: "compressed size",
            declared: u64::from(compressed_size),
            actual: available as u64,
        });
    }

    let record = EntryRecord {
        name,
        record_offset: pos as u64,
        local_header_offset: u64::from(local_offset),
        compressed_size: u64::from(compressed_size),
        uncompressed_size: u64::from(uncompressed_size),
        crc32,
    };
    Ok((record, pos + record_len))
}

/// Locate the EOCD record, scanning backwards over the comment window.
///
/// Prefers a candidate whose comment length reaches the end of the buffer;
/// any signature inside that comment is rejected later by the caller. Falls
/// back to the last signature seen so the comment length mismatch is
/// reported.
fn find_eocd(bytes: &[u8]) -> Option<usize> {
    let last = bytes.len().checked_sub(EOCD_LEN)?;
    let first = last.saturating_sub(MAX_COMMENT_LEN);
    let signature = EOCD_SIGNATURE.to_le_bytes();

    let mut fallback = None;
    for pos in (first..=last).rev() {
        if bytes[pos..pos + 4] != signature {
            continue;
        }
        let comment_len = usize::from(u16::from_le_bytes([bytes[pos + 20], bytes[pos + 21]]));
        if pos + EOCD_LEN + comment_len == bytes.len() {
            return Some(pos);
        }
        fallback.get_or_insert(pos);
    }
    fallback
}

/// Offset of the last EOCD signature after `eocd` that a backward scan
/// from the end of the buffer would reach first.
fn shadowing_eocd(bytes: &[u8], eocd: usize) -> Option<usize> {
    let last = bytes.len().checked_sub(EOCD_LEN)?;
    let signature = EOCD_SIGNATURE.to_le_bytes();
    ((eocd + 1)..=last)
        .rev()
        .find(|&pos| bytes[pos..pos + 4] == signature)
}

fn expect_signature(bytes: &[u8], offset: usize, expected: u32, record: &'static str) -> DecodeResult<()> {
    let found = read_u32(bytes, offset)?;
    if found != expected {
        return Err(DecodeError::BadMagic {
            record,
            offset: offset as u64,
            expected,
            found,
        });
    }
    Ok(())
}

fn field<const N: usize>(bytes: &[u8], offset: usize) -> DecodeResult<[u8; N]> {
    offset
        .checked_add(N)
        .and_then(|end| bytes.get(offset..end))
        .and_then(|slice| <[u8; N]>::try_from(slice).ok())
        .ok_or(DecodeError::Truncated {
            needed: offset.saturating_add(N) as u64,
            actual: bytes.len() as u64,
        })
}

fn read_u16(bytes: &[u8], offset: usize) -> DecodeResult<u16> {
    field::<2>(bytes, offset).map(u16::from_le_bytes)
}

fn read_u32(bytes: &[u8], offset: usize) -> DecodeResult<u32> {
    field::<4>(bytes, offset).map(u32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{bundle, ArtifactBuilder};

    fn limits() -> DecodeLimits {
        DecodeLimits::default()
    }

    fn put_u16(bytes: &mut [u8], offset: usize, value: u16) {
        bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32(bytes: &mut [u8], offset: usize, value: u32) {
        bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn eocd_of(bytes: &[u8]) -> usize {
        find_eocd(bytes).unwrap()
    }

    #[test]
    fn empty_buffer_is_truncated() {
        let err = ArchiveLayout::inspect(&[], &limits()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                needed: 4,
                actual: 0
            }
        );
        assert_eq!(err.offset(), Some(0));
    }

    #[test]
    fn short_buffer_with_magic_is_truncated() {
        let err = ArchiveLayout::inspect(b"PK\x03\x04", &limits()).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { actual: 4, .. }));
    }

    #[test]
    fn wrong_magic_is_rejected_at_offset_zero() {
        let err = ArchiveLayout::inspect(b"\x7fELF\x02\x01\x01", &limits()).unwrap_err();
        match err {
            DecodeError::BadMagic { offset, expected, .. } => {
                assert_eq!(offset, 0);
                assert_eq!(expected, LOCAL_HEADER_SIGNATURE);
            }
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn valid_bundle_layout_lists_entries() {
        let bytes = bundle(&[
            ("app/index.js", &b"console.log(1)"[..]),
            ("resources/icon.png", &b"png"[..]),
        ]).unwrap();
        let layout = ArchiveLayout::inspect(&bytes, &limits()).unwrap();
        let names: Vec<&str> = layout.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["app/index.js", "resources/icon.png"]);
        assert_eq!(layout.entry("app/index.js").unwrap().uncompressed_size, 14);
        assert_eq!(layout.eocd_offset() as usize, bytes.len() - EOCD_LEN);
    }

    #[test]
    fn missing_eocd_is_reported() {
        let bytes = bundle(&[("a", b"1")]).unwrap();
        let cut = &bytes[..bytes.len() - 1];
        assert_eq!(
            ArchiveLayout::inspect(cut, &limits()).unwrap_err(),
            DecodeError::MissingDirectory
        );
    }

    #[test]
    fn trailing_garbage_is_a_comment_length_mismatch() {
        let mut bytes = bundle(&[("a", b"1")]).unwrap();
        let eocd = eocd_of(&bytes);
        bytes.extend_from_slice(b"junk");
        let err = ArchiveLayout::inspect(&bytes, &limits()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch {
                offset: (eocd + 20) as u64,
                field: "archive comment length",
                declared: 0,
                actual: 4,
            }
        );
    }

    #[test]
    fn eocd_signature_inside_comment_is_rejected() {
        let mut bytes = ArtifactBuilder::new().build().unwrap();
        let eocd = eocd_of(&bytes);
        let mut comment = EOCD_SIGNATURE.to_le_bytes().to_vec();
        comment.extend_from_slice(&[0u8; 24]);
        put_u16(&mut bytes, eocd + 20, comment.len() as u16);
        bytes.extend_from_slice(&comment);

        let expected = DecodeError::Unsupported {
            offset: (eocd + EOCD_LEN) as u64,
            feature: "end of central directory signature inside archive comment",
        };
        assert_eq!(ArchiveLayout::inspect(&bytes, &limits()).unwrap_err(), expected);
        assert_eq!(crate::decoder::decode(&bytes).unwrap_err(), expected);
    }

    /// Shift every offset in `bytes` by `base` so the archive can be embedded
    /// `base` bytes into another buffer.
    fn relocate(bytes: &[u8], base: usize) -> Vec<u8> {
        let mut moved = bytes.to_vec();
        let layout = ArchiveLayout::inspect(bytes, &limits()).unwrap();
        for record in layout.entries() {
            let at = record.record_offset as usize + 42;
            put_u32(&mut moved, at, (record.local_header_offset as usize + base) as u32);
        }
        let eocd = layout.eocd_offset() as usize;
        put_u32(
            &mut moved,
            eocd + 16,
            (layout.central_directory_offset() as usize + base) as u32,
        );
        moved
    }

    #[test]
    fn second_directory_hidden_in_comment_is_rejected() {
        let mut outer = ArtifactBuilder::new().build().unwrap();
        let inner = ArtifactBuilder::new()
            .app_id("7f000000-0000-4000-8000-000000000001")
            .build()
            .unwrap();
        let outer_eocd = eocd_of(&outer);
        let inner_eocd = outer.len() + eocd_of(&inner);

        // The hidden archive plus one pad byte, so only the outer EOCD has a
        // comment length reaching the end of the buffer.
        let mut comment = relocate(&inner, outer.len());
        comment.push(0);
        put_u16(&mut outer, outer_eocd + 20, comment.len() as u16);
        outer.extend_from_slice(&comment);

        assert_eq!(find_eocd(&outer), Some(outer_eocd));
        let expected = DecodeError::Unsupported {
            offset: inner_eocd as u64,
            feature: "end of central directory signature inside archive comment",
        };
        assert_eq!(ArchiveLayout::inspect(&outer, &limits()).unwrap_err(), expected);
        assert_eq!(crate::decoder::decode(&outer).unwrap_err(), expected);
        assert!(Archive::open(&outer, &limits()).is_err());
    }

    #[test]
    fn read_entry_matches_validated_record() {
        let bytes = bundle(&[("a", &b"first"[..]), ("b", &b"second"[..])]).unwrap();
        let mut archive = Archive::open(&bytes, &limits()).unwrap();
        let record = archive.layout.entry("b").cloned().unwrap();
        assert_eq!(archive.read_entry("b").unwrap(), b"second");

        // A record the reader cannot agree with is refused before extraction.
        let stale = archive
            .layout
            .entries
            .iter_mut()
            .find(|e| e.name == "b")
            .unwrap();
        stale.crc32 ^= 1;
        assert_eq!(
            archive.read_entry("b").unwrap_err(),
            DecodeError::CorruptEntry {
                entry: "b".to_string(),
                offset: record.local_header_offset,
                reason: "archive reader disagrees with the validated central directory"
                    .to_string(),
            }
        );
    }

    #[test]
    fn directory_size_must_reach_eocd() {
        let mut bytes = bundle(&[("a", b"1")]).unwrap();
        let eocd = eocd_of(&bytes);
        let size = u32::from_le_bytes(bytes[eocd + 12..eocd + 16].try_into().unwrap());
        put_u32(&mut bytes, eocd + 12, size - 1);
        let err = ArchiveLayout::inspect(&bytes, &limits()).unwrap_err();
        assert!(
            matches!(err, DecodeError::LengthMismatch { field: "central directory size", .. }),
            "{err:?}"
        );
        assert_eq!(err.offset(), Some((eocd + 12) as u64));
    }

    #[test]
    fn directory_offset_past_eocd_is_rejected() {
        let mut bytes = bundle(&[("a", b"1")]).unwrap();
        let eocd = eocd_of(&bytes);
        put_u32(&mut bytes, eocd + 16, (eocd + 1) as u32);
        let err = ArchiveLayout::inspect(&bytes, &limits()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LengthMismatch {
                field: "central directory offset",
                ..
            }
        ));
    }

    #[test]
    fn entry_count_disagreement_is_rejected() {
        let mut bytes = bundle(&[("a", b"1"), ("b", b"2")]).unwrap();
        let eocd = eocd_of(&bytes);
        put_u16(&mut bytes, eocd + 8, 1);
        put_u16(&mut bytes, eocd + 10, 1);
        let err = ArchiveLayout::inspect(&bytes, &limits()).unwrap_err();
        // One record is parsed and the walk stops short of the EOCD.
        assert!(matches!(
            err,
            DecodeError::LengthMismatch {
                field: "central directory size",
                ..
            }
        ));
    }

    #[test]
    fn multi_disk_archive_is_unsupported() {
        let mut bytes = bundle(&[("a", b"1")]).unwrap();
        let eocd = eocd_of(&bytes);
        put_u16(&mut bytes, eocd + 4, 1);
        assert!(matches!(
            ArchiveLayout::inspect(&bytes, &limits()).unwrap_err(),
            DecodeError::Unsupported {
                feature: "multi-disk archive",
                ..
            }
        ));
    }

    #[test]
    fn encrypted_entry_is_unsupported() {
        let mut bytes = bundle(&[("a", b"1")]).unwrap();
        let layout = ArchiveLayout::inspect(&bytes, &limits()).unwrap();
        let record = layout.central_directory_offset() as usize;
        put_u16(&mut bytes, record + 8, FLAG_ENCRYPTED);
        assert_eq!(
            ArchiveLayout::inspect(&bytes, &limits()).unwrap_err(),
            DecodeError::Unsupported {
                offset: record as u64,
                feature: "encrypted entry",
            }
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let bytes = bundle(&[("same", b"1"), ("same", b"2")]);
        // The writer may refuse duplicates itself; only check when it did not.
        if let Ok(bytes) = bytes {
            assert!(matches!(
                ArchiveLayout::inspect(&bytes, &limits()).unwrap_err(),
                DecodeError::DuplicateEntry { .. }
            ));
        }
    }

    #[test]
    fn local_header_signature_is_checked() {
        let mut bytes = bundle(&[("a", b"1"), ("b", b"2")]).unwrap();
        let layout = ArchiveLayout::inspect(&bytes, &limits()).unwrap();
        let second = layout.entry("b").unwrap().local_header_offset as usize;
        put_u32(&mut bytes, second, 0xdead_beef);
        assert_eq!(
            ArchiveLayout::inspect(&bytes, &limits()).unwrap_err(),
            DecodeError::BadMagic {
                record: "local file header",
                offset: second as u64,
                expected: LOCAL_HEADER_SIGNATURE,
                found: 0xdead_beef,
            }
        );
    }

    #[test]
    fn oversized_compressed_size_is_rejected() {
        let mut bytes = bundle(&[("a", b"1")]).unwrap();
        let layout = ArchiveLayout::inspect(&bytes, &limits()).unwrap();
        let record = layout.central_directory_offset() as usize;
        put_u32(&mut bytes, record + 20, 10_000);
        let err = ArchiveLayout::inspect(&bytes, &limits()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LengthMismatch {
                field: "compressed size",
                ..
            }
        ));
        assert_eq!(err.offset(), Some((record + 20) as u64));
    }

    #[test]
    fn limits_are_enforced() {
        let bytes = ArtifactBuilder::new().build().unwrap();
        let tight = DecodeLimits {
            max_artifact_bytes: 16,
            ..DecodeLimits::default()
        };
        assert!(matches!(
            ArchiveLayout::inspect(&bytes, &tight).unwrap_err(),
            DecodeError::LimitExceeded {
                limit_name: "artifact size",
                ..
            }
        ));

        let few = DecodeLimits {
            max_entries: 1,
            ..DecodeLimits::default()
        };
        assert!(matches!(
            ArchiveLayout::inspect(&bytes, &few).unwrap_err(),
            DecodeError::LimitExceeded {
                limit_name: "entry count",
                ..
            }
        ));

        let small = DecodeLimits {
            max_entry_bytes: 4,
            ..DecodeLimits::default()
        };
        assert!(matches!(
            ArchiveLayout::inspect(&bytes, &small).unwrap_err(),
            DecodeError::LimitExceeded {
                limit_name: "entry size",
                ..
            }
        ));
    }

    #[test]
    fn every_truncation_of_a_valid_artifact_fails() {
        let bytes = ArtifactBuilder::new().build().unwrap();
        for len in 0..bytes.len() {
            assert!(
                ArchiveLayout::inspect(&bytes[..len], &limits()).is_err(),
                "truncation to {len} bytes was accepted"
            );
        }
    }

    #[test]
    fn read_entry_detects_crc_mismatch() {
        let mut bytes = bundle(&[("data.txt", b"hello world")]).unwrap();
        let at = bytes
            .windows(11)
            .position(|w| w == b"hello world")
            .unwrap();
        bytes[at] = b'j';
        let mut archive = Archive::open(&bytes, &limits()).unwrap();
        let err = archive.read_entry("data.txt").unwrap_err();
        match err {
            DecodeError::CorruptEntry { entry, offset, .. } => {
                assert_eq!(entry, "data.txt");
                assert_eq!(offset, 0);
            }
            other => panic!("expected CorruptEntry, got {other:?}"),
        }
    }

    #[test]
    fn read_entry_returns_contents() {
        let bytes = bundle(&[("data.txt", b"hello world")]).unwrap();
        let mut archive = Archive::open(&bytes, &limits()).unwrap();
        assert!(archive.contains("data.txt"));
        assert_eq!(archive.read_entry("data.txt").unwrap(), b"hello world");
        assert_eq!(
            archive.read_entry("other.txt").unwrap_err(),
            DecodeError::MissingEntry {
                name: "other.txt".to_string()
            }
        );
    }
}
