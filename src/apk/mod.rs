//! Top-level APK orchestration.
//!
//! [`ApkFile`] loads an archive, decodes the resource table and manifest,
//! locates the signature block and indexes every dex entry. Artifacts
//! degrade independently: each one carries its own `Result`, so a missing
//! manifest does not prevent resource decoding and one corrupt dex unit
//! does not block analysis of the others.

pub mod certificate;
pub mod zip;

use log::warn;

use crate::analysis::{BytecodeUnit, InstructionDecoder};
use crate::dex::container::looks_like_dex;
use crate::manifest::AndroidManifest;
use crate::res::{DecodeError, ResourceTableChunk};

pub use certificate::{is_certificate_entry, CertificateParser, Signer};
pub use zip::{ApkArchive, ArchiveError};

pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";
pub const RESOURCES_ENTRY: &str = "resources.arsc";

/// Per-artifact parse failures.
#[derive(Debug)]
pub enum ApkError {
    Archive(ArchiveError),
    MissingResources,
    MissingManifest,
    MissingCertificate,
    Resources(DecodeError),
    Manifest(DecodeError),
    Certificate(String),
}

impl std::fmt::Display for ApkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApkError::Archive(err) => write!(f, "failed to read archive: {err}"),
            ApkError::MissingResources => write!(f, "no {RESOURCES_ENTRY} entry"),
            ApkError::MissingManifest => write!(f, "no {MANIFEST_ENTRY} entry"),
            ApkError::MissingCertificate => write!(f, "no signature entry under META-INF"),
            ApkError::Resources(err) => write!(f, "failed to decode resource table: {err}"),
            ApkError::Manifest(err) => write!(f, "failed to decode manifest: {err}"),
            ApkError::Certificate(msg) => write!(f, "failed to parse certificate: {msg}"),
        }
    }
}

impl std::error::Error for ApkError {}

impl From<ArchiveError> for ApkError {
    fn from(value: ArchiveError) -> Self {
        ApkError::Archive(value)
    }
}

/// A parsed APK: archive entries plus the decoded artifacts.
pub struct ApkFile {
    archive: ApkArchive,
    resources: Result<ResourceTableChunk, ApkError>,
    manifest: Result<AndroidManifest, ApkError>,
    signers: Result<Vec<Signer>, ApkError>,
    units: Vec<BytecodeUnit>,
    failed_units: u32,
}

impl ApkFile {
    pub fn from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ApkError> {
        Ok(Self::parse_with(ApkArchive::from_path(path)?, None))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ApkError> {
        Ok(Self::parse_with(ApkArchive::from_bytes(bytes)?, None))
    }

    /// Decodes every artifact the archive carries. Dex entries are found
    /// by sniffing the magic prefix of each entry at least one header
    /// long, regardless of name; an unreadable unit is logged and skipped.
    pub fn parse_with(
        archive: ApkArchive,
        certificate_parser: Option<&dyn CertificateParser>,
    ) -> Self {
        let resources = match archive.get(RESOURCES_ENTRY) {
            Some(bytes) => crate::decode_resource_table(bytes).map_err(ApkError::Resources),
            None => Err(ApkError::MissingResources),
        };

        let manifest = match archive.get(MANIFEST_ENTRY) {
            Some(bytes) => crate::decode_binary_xml(bytes, resources.as_ref().ok())
                .and_then(|tree| AndroidManifest::parse(&tree))
                .map_err(ApkError::Manifest),
            None => Err(ApkError::MissingManifest),
        };

        let signature_entry = archive
            .entries()
            .find(|(name, _)| is_certificate_entry(name));
        let signers = match (signature_entry, certificate_parser) {
            (Some((_, block)), Some(parser)) => {
                parser.parse(block).map_err(ApkError::Certificate)
            }
            (Some(_), None) => Ok(Vec::new()),
            (None, _) => Err(ApkError::MissingCertificate),
        };

        let mut units = Vec::new();
        let mut failed_units = 0;
        for (name, bytes) in archive.entries() {
            if !looks_like_dex(bytes) {
                continue;
            }
            match BytecodeUnit::index(name, bytes) {
                Ok(unit) => units.push(unit),
                Err(err) => {
                    warn!("Failed to read dex unit {name}: {err}; skipping");
                    failed_units += 1;
                }
            }
        }

        ApkFile {
            archive,
            resources,
            manifest,
            signers,
            units,
            failed_units,
        }
    }

    /// Runs bytecode analysis over every indexed unit: per-method metrics,
    /// the interprocedural complexity pass, then pruning and roll-ups.
    pub fn analyze_bytecode(&mut self, decoder: &dyn InstructionDecoder) {
        crate::analysis::analyze_units(&mut self.units, decoder);
    }

    pub fn archive(&self) -> &ApkArchive {
        &self.archive
    }

    pub fn resources(&self) -> Result<&ResourceTableChunk, &ApkError> {
        self.resources.as_ref()
    }

    pub fn manifest(&self) -> Result<&AndroidManifest, &ApkError> {
        self.manifest.as_ref()
    }

    pub fn signers(&self) -> Result<&[Signer], &ApkError> {
        self.signers.as_deref()
    }

    pub fn units(&self) -> &[BytecodeUnit] {
        &self.units
    }

    /// Units whose dex header or id tables could not be read.
    pub fn failed_units(&self) -> u32 {
        self.failed_units
    }
}
