//! Reconciliation of zipped uploads from legacy clients.
//!
//! Old CnCNet clients upload maps as a zip and later download them by the
//! SHA-1 of the *merged* member contents. An [`ArchiveReconciliationService`]
//! is configured with the [`ExpectedFile`] descriptors of one game; it checks
//! that an archive has the right members, runs each member's validator, and
//! hands back a [`ValidatedArchive`] that can compute that hash and repackage
//! the upload the way the clients expect to find it.
//!
//! Descriptor order matters: it is the order members are concatenated in
//! before hashing, and changing it changes every hash.
//!
//! # Example
//!
//! ```
//! use std::io::{Cursor, Write};
//!
//! use cnc_map_core::archive::{ArchiveReconciliationService, ExpectedFile};
//! use cnc_map_core::config::Limits;
//! use cnc_map_core::legacy::validate_text_member;
//! use zip::write::SimpleFileOptions;
//!
//! let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
//! writer.start_file("arena.map", SimpleFileOptions::default()).unwrap();
//! writer.write_all(b"[Basic]\nName=Arena\n").unwrap();
//! let upload = writer.finish().unwrap().into_inner();
//!
//! let descriptors = [ExpectedFile {
//!     extensions: &[".map"],
//!     validator: validate_text_member,
//!     required: true,
//! }];
//! let service = ArchiveReconciliationService::new(&descriptors, &Limits::default());
//! let archive = service.validate(&upload).unwrap();
//!
//! assert_eq!(archive.merged_content(), b"[Basic]\nName=Arena\n");
//! assert_eq!(archive.extract_map_name(&[".map"]).unwrap(), "Arena");
//! ```

use std::io::{Cursor, Read, Write};
use std::path::Path;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::Limits;
use crate::digest::sha1_hex;
use crate::error::{MapError, Result};
use crate::ini::IniDocument;
use crate::legacy::MemberValidator;
use crate::map::map_name_or;

/// Prefix of the name given to legacy uploads whose INI has no `Basic.Name`.
pub const FALLBACK_NAME_PREFIX: &str = "legacy_client_upload_";

/// One kind of file a legacy upload may contain.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedFile {
    /// Lower-case extensions, with the leading dot.
    pub extensions: &'static [&'static str],
    /// Validator run on the member's bytes.
    pub validator: MemberValidator,
    /// Whether the upload is rejected without this file.
    pub required: bool,
}

impl ExpectedFile {
    /// Case-insensitive extension match; `extension` includes the dot.
    #[must_use]
    pub fn accepts(&self, extension: &str) -> bool {
        extension_in(extension, self.extensions)
    }
}

/// One decompressed archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Name as stored in the archive.
    pub name: String,
    /// Extension with its leading dot, original case, or empty.
    pub extension: String,
    /// Decompressed content.
    pub bytes: Vec<u8>,
}

/// Validates uploads against one game's descriptors.
#[derive(Debug, Clone)]
pub struct ArchiveReconciliationService<'a> {
    descriptors: &'a [ExpectedFile],
    limits: Limits,
}

impl<'a> ArchiveReconciliationService<'a> {
    /// Creates a service for `descriptors`, in merge order.
    #[must_use]
    pub fn new(descriptors: &'a [ExpectedFile], limits: &Limits) -> Self {
        ArchiveReconciliationService {
            descriptors,
            limits: *limits,
        }
    }

    /// The descriptors this service checks against.
    #[must_use]
    pub fn descriptors(&self) -> &'a [ExpectedFile] {
        self.descriptors
    }

    /// Opens the archive and validates its members.
    ///
    /// # Errors
    ///
    /// - `MapError::InvalidArchive` if `bytes` is not a readable zip
    /// - `MapError::BadArchiveStructure` for a wrong member count, a missing
    ///   or repeated member type, or (single-file games) a wrong first member
    /// - `MapError::UnexpectedFileType` for a member no descriptor accepts
    /// - `MapError::FileTooLarge` for a member that decompresses past the
    ///   configured ceiling
    /// - any error raised by a member's validator
    pub fn validate(&self, bytes: &[u8]) -> Result<ValidatedArchive> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| MapError::InvalidArchive {
                reason: e.to_string(),
            })?;

        if self.descriptors.len() == 1 {
            self.validate_single(&mut archive)
        } else {
            self.validate_multi(&mut archive)
        }
    }

    /// Only the first entry is read; later entries are ignored and are not
    /// repackaged.
    fn validate_single(&self, archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<ValidatedArchive> {
        if archive.is_empty() {
            return Err(MapError::bad_archive("Archive is empty"));
        }

        let descriptor = &self.descriptors[0];
        let first = self.read_member(archive, 0)?;
        if !descriptor.accepts(&first.extension) {
            return Err(MapError::bad_archive("Map file was not the first Zip entry."));
        }

        (descriptor.validator)(&first.bytes, &self.limits)?;
        Ok(ValidatedArchive {
            members: vec![first],
            merge_order: vec![0],
        })
    }

    fn validate_multi(&self, archive: &mut ZipArchive<Cursor<&[u8]>>) -> Result<ValidatedArchive> {
        let required = self.descriptors.iter().filter(|d| d.required).count();
        let all = self.descriptors.len();
        let count = archive.len();
        // Checked from the central directory, before anything is inflated.
        if count < required || count > all {
            return Err(MapError::bad_archive(format!(
                "Incorrect file count: found {count}, expected {required} to {all}"
            )));
        }

        let mut members = Vec::with_capacity(count);
        let mut merge_order: Vec<Option<usize>> = vec![None; all];
        for index in 0..count {
            let member = self.read_member(archive, index)?;
            let slot = self
                .descriptors
                .iter()
                .position(|d| d.accepts(&member.extension))
                .ok_or_else(|| MapError::UnexpectedFileType {
                    extension: member.extension.clone(),
                    expected: self.all_extensions(),
                })?;

            if merge_order[slot].is_some() {
                return Err(MapError::bad_archive(format!(
                    "More than one {} file: {}",
                    self.descriptors[slot].extensions.join(" or "),
                    member.name
                )));
            }

            debug!(member = %member.name, slot, "validating archive member");
            (self.descriptors[slot].validator)(&member.bytes, &self.limits)?;
            merge_order[slot] = Some(index);
            members.push(member);
        }

        if let Some(missing) = self
            .descriptors
            .iter()
            .zip(&merge_order)
            .find(|(d, matched)| d.required && matched.is_none())
        {
            return Err(MapError::bad_archive(format!(
                "Missing required file: {}",
                missing.0.extensions.join(" or ")
            )));
        }

        Ok(ValidatedArchive {
            members,
            merge_order: merge_order.into_iter().flatten().collect(),
        })
    }

    fn read_member(
        &self,
        archive: &mut ZipArchive<Cursor<&[u8]>>,
        index: usize,
    ) -> Result<ArchiveMember> {
        let ceiling = self.member_ceiling();
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        if file.size() > ceiling as u64 {
            return Err(MapError::FileTooLarge {
                size: usize::try_from(file.size()).unwrap_or(usize::MAX),
                max: ceiling,
            });
        }

        // The declared size can lie; never read past the ceiling.
        let mut content = Vec::new();
        file.by_ref()
            .take(ceiling as u64 + 1)
            .read_to_end(&mut content)?;
        if content.len() > ceiling {
            return Err(MapError::FileTooLarge {
                size: content.len(),
                max: ceiling,
            });
        }

        Ok(ArchiveMember {
            extension: extension_of(&name),
            name,
            bytes: content,
        })
    }

    /// Largest member any validator could accept.
    fn member_ceiling(&self) -> usize {
        self.limits
            .max_map_bytes
            .max(self.limits.max_paired_member_bytes)
    }

    fn all_extensions(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .flat_map(|d| d.extensions.iter().map(|e| (*e).to_string()))
            .collect()
    }
}

/// An archive whose members all passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedArchive {
    members: Vec<ArchiveMember>,
    /// Member index per matched descriptor, in descriptor order.
    merge_order: Vec<usize>,
}

impl ValidatedArchive {
    /// Every validated member, in archive order.
    #[must_use]
    pub fn members(&self) -> &[ArchiveMember] {
        &self.members
    }

    /// Member contents concatenated in descriptor order.
    ///
    /// Optional descriptors with no member are skipped.
    #[must_use]
    pub fn merged_content(&self) -> Vec<u8> {
        let mut merged = Vec::new();
        for &index in &self.merge_order {
            merged.extend_from_slice(&self.members[index].bytes);
        }
        merged
    }

    /// SHA-1 hex of [`merged_content`](Self::merged_content).
    #[must_use]
    pub fn content_digest(&self) -> String {
        sha1_hex(&self.merged_content())
    }

    /// Re-zips every member as `<content_digest><extension>`, deflated.
    ///
    /// # Errors
    ///
    /// Returns `MapError::IoError` or `MapError::InvalidArchive` if the
    /// archive cannot be written.
    pub fn repackage(&self) -> Result<Vec<u8>> {
        let digest = self.content_digest();
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for member in &self.members {
            writer.start_file(format!("{digest}{}", member.extension), options)?;
            writer.write_all(&member.bytes)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// `Basic.Name` from the first member with an INI extension.
    ///
    /// Falls back to `legacy_client_upload_<content_digest>` when the
    /// document has no name.
    ///
    /// # Errors
    ///
    /// - `MapError::NoMatchingFile` if no member has one of `ini_extensions`
    /// - `MapError::MalformedDocument` if that member is not INI text
    pub fn extract_map_name(&self, ini_extensions: &[&str]) -> Result<String> {
        let member = self
            .members
            .iter()
            .find(|m| extension_in(&m.extension, ini_extensions))
            .ok_or_else(|| MapError::NoMatchingFile {
                expected: ini_extensions.iter().map(|e| (*e).to_string()).collect(),
            })?;

        let ini = IniDocument::parse(&member.bytes)?;
        let fallback = format!("{FALLBACK_NAME_PREFIX}{}", self.content_digest());
        Ok(map_name_or(&ini, &fallback).to_string())
    }

    /// Checks that the archive is named after the SHA-1 of its content.
    ///
    /// # Errors
    ///
    /// Returns `MapError::ChecksumMismatch` if the file stem of
    /// `archive_filename` differs from [`content_digest`](Self::content_digest).
    pub fn verify_declared_digest(&self, archive_filename: &str) -> Result<()> {
        let declared = Path::new(archive_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let actual = self.content_digest();

        if declared.eq_ignore_ascii_case(&actual) {
            Ok(())
        } else {
            Err(MapError::ChecksumMismatch { declared, actual })
        }
    }
}

/// `.ext` of a member name, original case; empty if it has none.
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

fn extension_in(extension: &str, set: &[&str]) -> bool {
    set.iter().any(|e| e.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::{validate_paired_ini, validate_terrain, validate_text_member};

    fn zip_of(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const SINGLE: [ExpectedFile; 1] = [ExpectedFile {
        extensions: &[".map", ".yro", ".yrm"],
        validator: validate_text_member,
        required: true,
    }];

    const PAIRED: [ExpectedFile; 2] = [
        ExpectedFile {
            extensions: &[".ini"],
            validator: validate_paired_ini,
            required: true,
        },
        ExpectedFile {
            extensions: &[".bin"],
            validator: validate_terrain,
            required: true,
        },
    ];

    fn reject_all(_: &[u8], _: &Limits) -> Result<()> {
        Err(MapError::bad_archive("never"))
    }

    fn accept_all(_: &[u8], _: &Limits) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("maps/arena.MAP"), ".MAP");
        assert_eq!(extension_of("arena"), "");
        assert_eq!(extension_of("arena.tar.gz"), ".gz");
    }

    #[test]
    fn test_not_a_zip() {
        let service = ArchiveReconciliationService::new(&SINGLE, &Limits::default());
        let err = service.validate(b"[Basic]\nName=x\n").unwrap_err();
        assert!(matches!(err, MapError::InvalidArchive { .. }));
    }

    #[test]
    fn test_single_file_upload() {
        let upload = zip_of(&[("ARENA.YRM", b"[Basic]\nName=Arena\n")]);
        let service = ArchiveReconciliationService::new(&SINGLE, &Limits::default());
        let archive = service.validate(&upload).unwrap();
        assert_eq!(archive.members().len(), 1);
        assert_eq!(archive.content_digest(), sha1_hex(b"[Basic]\nName=Arena\n"));
    }

    #[test]
    fn test_single_file_wrong_first_member() {
        let upload = zip_of(&[("readme.txt", b"hi"), ("arena.map", b"[Basic]\n")]);
        let service = ArchiveReconciliationService::new(&SINGLE, &Limits::default());
        assert!(matches!(
            service.validate(&upload),
            Err(MapError::BadArchiveStructure { .. })
        ));
    }

    #[test]
    fn test_single_file_empty_archive() {
        let service = ArchiveReconciliationService::new(&SINGLE, &Limits::default());
        assert!(matches!(
            service.validate(&zip_of(&[])),
            Err(MapError::BadArchiveStructure { .. })
        ));
    }

    #[test]
    fn test_paired_upload_merges_in_descriptor_order() {
        let terrain = vec![7u8; 8192];
        let upload = zip_of(&[("scg01ea.bin", &terrain), ("scg01ea.ini", b"[Basic]\n")]);
        let service = ArchiveReconciliationService::new(&PAIRED, &Limits::default());
        let archive = service.validate(&upload).unwrap();

        let mut expected = b"[Basic]\n".to_vec();
        expected.extend_from_slice(&terrain);
        assert_eq!(archive.merged_content(), expected);
    }

    #[test]
    fn test_unexpected_member_type() {
        let upload = zip_of(&[("a.ini", b"[Basic]\n"), ("a.exe", b"MZ")]);
        let service = ArchiveReconciliationService::new(&PAIRED, &Limits::default());
        let err = service.validate(&upload).unwrap_err();
        match err {
            MapError::UnexpectedFileType { extension, expected } => {
                assert_eq!(extension, ".exe");
                assert_eq!(expected, vec![".ini", ".bin"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_member_count_bounds() {
        let service = ArchiveReconciliationService::new(&PAIRED, &Limits::default());
        let one = zip_of(&[("a.ini", b"[Basic]\n")]);
        assert!(matches!(
            service.validate(&one),
            Err(MapError::BadArchiveStructure { .. })
        ));

        let terrain = vec![0u8; 8192];
        let three = zip_of(&[("a.ini", b"x"), ("a.bin", &terrain), ("b.bin", &terrain)]);
        assert!(matches!(
            service.validate(&three),
            Err(MapError::BadArchiveStructure { .. })
        ));
    }

    #[test]
    fn test_required_descriptor_must_be_matched() {
        let descriptors = [
            ExpectedFile {
                extensions: &[".map"],
                validator: accept_all,
                required: true,
            },
            ExpectedFile {
                extensions: &[".ini"],
                validator: accept_all,
                required: true,
            },
            ExpectedFile {
                extensions: &[".mis"],
                validator: accept_all,
                required: false,
            },
        ];
        let upload = zip_of(&[("a.map", b"grid"), ("a.mis", b"mission")]);
        let service = ArchiveReconciliationService::new(&descriptors, &Limits::default());
        let err = service.validate(&upload).unwrap_err();
        assert!(matches!(err, MapError::BadArchiveStructure { .. }));
        assert!(err.to_string().contains("Missing required file: .ini"));
    }

    #[test]
    fn test_repeated_member_type_rejected() {
        let terrain = vec![0u8; 8192];
        let upload = zip_of(&[("a.bin", &terrain), ("b.bin", &terrain)]);
        let service = ArchiveReconciliationService::new(&PAIRED, &Limits::default());
        let err = service.validate(&upload).unwrap_err();
        assert!(matches!(err, MapError::BadArchiveStructure { .. }));
        assert!(err.to_string().contains("More than one .bin file: b.bin"));
    }

    #[test]
    fn test_count_checked_before_members_are_read() {
        // Every member is over the ceiling; only the count check may fire.
        let limits = Limits {
            max_map_bytes: 4,
            max_paired_member_bytes: 4,
        };
        let big = vec![b'x'; 64];
        let upload = zip_of(&[("a.ini", &big), ("a.bin", &big), ("b.bin", &big)]);
        let service = ArchiveReconciliationService::new(&PAIRED, &limits);
        let err = service.validate(&upload).unwrap_err();
        assert!(err.to_string().contains("Incorrect file count: found 3"));
    }

    #[test]
    fn test_single_file_reads_only_first_member() {
        let limits = Limits {
            max_map_bytes: 64,
            max_paired_member_bytes: 64,
        };
        let huge = vec![b'x'; 1024];
        let upload = zip_of(&[
            ("arena.map", b"[Basic]\nName=Arena\n"),
            ("other.map", b"[Basic]\nName=Other\n"),
            ("junk.map", &huge),
        ]);
        let service = ArchiveReconciliationService::new(&SINGLE, &limits);
        let archive = service.validate(&upload).unwrap();
        assert_eq!(archive.members().len(), 1);
        assert_eq!(archive.members()[0].name, "arena.map");

        let repacked = archive.repackage().unwrap();
        assert_eq!(ZipArchive::new(Cursor::new(repacked)).unwrap().len(), 1);
    }

    #[test]
    fn test_member_validator_failure_propagates() {
        let descriptors = [
            ExpectedFile {
                extensions: &[".ini"],
                validator: accept_all,
                required: true,
            },
            ExpectedFile {
                extensions: &[".bin"],
                validator: reject_all,
                required: false,
            },
        ];
        let service = ArchiveReconciliationService::new(&descriptors, &Limits::default());
        assert!(service.validate(&zip_of(&[("a.ini", b"x")])).is_ok());
        assert!(service
            .validate(&zip_of(&[("a.ini", b"x"), ("a.bin", b"y")]))
            .is_err());
    }

    #[test]
    fn test_member_over_ceiling() {
        let limits = Limits {
            max_map_bytes: 8,
            max_paired_member_bytes: 8,
        };
        let upload = zip_of(&[("a.map", b"0123456789")]);
        let service = ArchiveReconciliationService::new(&SINGLE, &limits);
        assert!(matches!(
            service.validate(&upload),
            Err(MapError::FileTooLarge { max: 8, .. })
        ));
    }

    #[test]
    fn test_map_name_and_fallback() {
        let service = ArchiveReconciliationService::new(&SINGLE, &Limits::default());

        let named = service
            .validate(&zip_of(&[("x.map", b"[Basic]\nName=Tour of Egypt\n")]))
            .unwrap();
        assert_eq!(named.extract_map_name(&[".map"]).unwrap(), "Tour of Egypt");

        let unnamed = service
            .validate(&zip_of(&[("x.map", b"[Basic]\nPlayer=1\n")]))
            .unwrap();
        let name = unnamed.extract_map_name(&[".map"]).unwrap();
        assert_eq!(name, format!("legacy_client_upload_{}", unnamed.content_digest()));

        assert!(matches!(
            unnamed.extract_map_name(&[".ini"]),
            Err(MapError::NoMatchingFile { .. })
        ));
    }

    #[test]
    fn test_repackage_renames_members() {
        let terrain = vec![1u8; 8192];
        let upload = zip_of(&[("My Map.INI", b"[Basic]\n"), ("My Map.bin", &terrain)]);
        let service = ArchiveReconciliationService::new(&PAIRED, &Limits::default());
        let archive = service.validate(&upload).unwrap();
        let digest = archive.content_digest();

        let repacked = archive.repackage().unwrap();
        let mut zip = ZipArchive::new(Cursor::new(repacked)).unwrap();
        assert_eq!(zip.len(), 2);
        let names: Vec<String> = zip.file_names().map(str::to_string).collect();
        assert!(names.contains(&format!("{digest}.INI")));
        assert!(names.contains(&format!("{digest}.bin")));

        let entry = zip.by_name(&format!("{digest}.bin")).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
    }

    #[test]
    fn test_verify_declared_digest() {
        let body: &[u8] = b"[Basic]\nName=x\n";
        let upload = zip_of(&[("x.map", body)]);
        let service = ArchiveReconciliationService::new(&SINGLE, &Limits::default());
        let archive = service.validate(&upload).unwrap();

        let good = format!("{}.zip", sha1_hex(body));
        assert!(archive.verify_declared_digest(&good).is_ok());

        let err = archive.verify_declared_digest("upload.zip").unwrap_err();
        match err {
            MapError::ChecksumMismatch { declared, actual } => {
                assert_eq!(declared, "upload");
                assert_eq!(actual, sha1_hex(body));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
