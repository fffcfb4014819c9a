//! Archive header decoding.
//!
//! A `.gpk` archive is one outermost message.  Top-level fields:
//!
//! | Field | Wire type | Meaning |
//! |-------|-----------|---------|
//! | 1 | varint | format version (supported: 2) |
//! | 2 | varint | creation timestamp, unix seconds |
//! | 3 | fixed32-length-delimited | map section (repeatable) |
//! | 32 | varint | version confirmation — must equal field 1 |
//!
//! The version confirmation sits at the end of the stream; a missing or
//! mismatched value means the archive was never completely written and the
//! whole file is structurally unreadable.
//!
//! Map section body:
//!
//! | Field | Wire type | Meaning |
//! |-------|-----------|---------|
//! | 1 | length-delimited | section name, UTF-8 |
//! | 2..=5 | varint | bounding box: left, right, top, bottom |
//! | 6, 7 | varint | minimum / maximum zoom covered |
//! | 8 | length-delimited | tag dictionary (string table) |
//! | 15 | fixed32-length-delimited | spatial index blob |
//!
//! The spatial index blob is *not* traversed here; only its extent is
//! recorded, for the section reader to walk on demand.

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::feature::{Area31, ModelError, ZoomLevel};
use crate::strings::read_string_table;
use crate::wire::{field_number, DecodeError, WireReader};

pub const SUPPORTED_VERSION: u32 = 2;

const F_VERSION:         u32 = 1;
const F_CREATED:         u32 = 2;
const F_SECTION:         u32 = 3;
const F_VERSION_CONFIRM: u32 = 32;

const F_SECTION_NAME:  u32 = 1;
const F_BBOX_LEFT:     u32 = 2;
const F_BBOX_RIGHT:    u32 = 3;
const F_BBOX_TOP:      u32 = 4;
const F_BBOX_BOTTOM:   u32 = 5;
const F_MIN_ZOOM:      u32 = 6;
const F_MAX_ZOOM:      u32 = 7;
const F_TAG_DICTIONARY: u32 = 8;
const F_SPATIAL_INDEX: u32 = 15;

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("wire decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("archive header declares no version")]
    MissingVersion,
    #[error("unsupported archive version {0}")]
    UnsupportedVersion(u32),
    #[error("archive header ended before the version confirmation")]
    MissingConfirmation,
    #[error("version confirmation {confirmed} does not match declared version {declared}")]
    VersionMismatch { declared: u32, confirmed: u32 },
    #[error("archive declares no map sections")]
    NoSections,
    #[error("malformed section {name:?}: {source}")]
    MalformedSection { name: String, source: ModelError },
}

// ── Descriptors ──────────────────────────────────────────────────────────────

/// Parsed per-section header.
#[derive(Debug, Clone, Serialize)]
pub struct MapSectionInfo {
    pub name:           String,
    pub bbox:           Area31,
    pub min_zoom:       ZoomLevel,
    pub max_zoom:       ZoomLevel,
    /// Tag vocabulary referenced positionally by the section's objects.
    pub tag_dictionary: Vec<String>,
    /// Extent of the untraversed spatial index blob within the archive.
    pub blob_offset:    usize,
    pub blob_length:    usize,
}

impl MapSectionInfo {
    /// Low-detail fallback sections are marked by name.
    pub fn is_basemap(&self) -> bool {
        self.name.to_ascii_lowercase().contains("basemap")
    }
}

/// Parsed archive descriptor: everything the header declares, no feature
/// data.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveInfo {
    pub version:  u32,
    /// Creation time, unix seconds.
    pub created:  i64,
    pub sections: Vec<MapSectionInfo>,
}

impl ArchiveInfo {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }

    pub fn has_basemap(&self) -> bool {
        self.sections.iter().any(MapSectionInfo::is_basemap)
    }

    /// Parse the archive header from a fresh decode session over the whole
    /// image.
    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, ArchiveError> {
        let mut version:   Option<u32> = None;
        let mut created:   i64 = 0;
        let mut confirmed: Option<u32> = None;
        let mut sections = Vec::new();

        loop {
            let tag = reader.read_tag()?;
            if field_number(tag) == 0 {
                break;
            }
            match field_number(tag) {
                F_VERSION => version = Some(reader.read_varint32()?),
                F_CREATED => created = reader.read_varint64()? as i64,
                F_SECTION => {
                    let len = reader.read_fixed32_be()? as usize;
                    let prev = reader.push_limit(len);
                    sections.push(read_section(reader)?);
                    reader.ensure_all_data_was_read();
                    reader.pop_limit(prev);
                }
                F_VERSION_CONFIRM => confirmed = Some(reader.read_varint32()?),
                _ => reader.skip_unknown_field(tag)?,
            }
        }

        let declared = version.ok_or(ArchiveError::MissingVersion)?;
        if declared != SUPPORTED_VERSION {
            return Err(ArchiveError::UnsupportedVersion(declared));
        }
        let confirmed = confirmed.ok_or(ArchiveError::MissingConfirmation)?;
        if confirmed != declared {
            return Err(ArchiveError::VersionMismatch { declared, confirmed });
        }
        if sections.is_empty() {
            return Err(ArchiveError::NoSections);
        }

        Ok(Self { version: declared, created, sections })
    }
}

fn read_section(reader: &mut WireReader<'_>) -> Result<MapSectionInfo, ArchiveError> {
    let mut name = String::new();
    // Missing bounds default to whole-world coverage.
    let mut left:   i32 = i32::MIN;
    let mut right:  i32 = i32::MAX;
    let mut top:    i32 = i32::MIN;
    let mut bottom: i32 = i32::MAX;
    let mut min_zoom: u8 = ZoomLevel::MIN.get();
    let mut max_zoom: u8 = ZoomLevel::MAX.get();
    let mut tag_dictionary = Vec::new();
    let mut blob_offset = 0usize;
    let mut blob_length = 0usize;

    loop {
        let tag = reader.read_tag()?;
        if field_number(tag) == 0 {
            break;
        }
        match field_number(tag) {
            F_SECTION_NAME => name = reader.read_string()?,
            F_BBOX_LEFT    => left = reader.read_varint32()? as i32,
            F_BBOX_RIGHT   => right = reader.read_varint32()? as i32,
            F_BBOX_TOP     => top = reader.read_varint32()? as i32,
            F_BBOX_BOTTOM  => bottom = reader.read_varint32()? as i32,
            F_MIN_ZOOM     => min_zoom = reader.read_varint32()? as u8,
            F_MAX_ZOOM     => max_zoom = reader.read_varint32()? as u8,
            F_TAG_DICTIONARY => {
                let len = reader.read_length()?;
                let prev = reader.push_limit(len);
                tag_dictionary = read_string_table(reader)?;
                reader.pop_limit(prev);
            }
            F_SPATIAL_INDEX => {
                blob_length = reader.read_fixed32_be()? as usize;
                blob_offset = reader.position();
                reader.skip(blob_length)?;
            }
            _ => reader.skip_unknown_field(tag)?,
        }
    }

    let malformed = |source| ArchiveError::MalformedSection { name: name.clone(), source };
    let bbox = Area31::from_bounds(left, top, right, bottom).map_err(malformed)?;
    let min_zoom = ZoomLevel::new(min_zoom).map_err(malformed)?;
    let max_zoom = ZoomLevel::new(max_zoom).map_err(malformed)?;
    if min_zoom > max_zoom {
        return Err(malformed(ModelError::InvertedZoomRange));
    }

    Ok(MapSectionInfo {
        name,
        bbox,
        min_zoom,
        max_zoom,
        tag_dictionary,
        blob_offset,
        blob_length,
    })
}
