//! The seam to the per-archive spatial index walker.
//!
//! Walking a section's on-disk block tree is the surrounding system's
//! business; the catalog only consumes the result.  Implementations decode
//! the section blobs recorded in
//! [`MapSectionInfo`](crate::header::MapSectionInfo) with their own
//! [`WireReader`](crate::wire::WireReader) sessions.

use std::collections::HashSet;
use std::sync::Arc;

use crate::archive::Archive;
use crate::cache::{DataBlockId, SharedBlocksCache};
use crate::feature::{Area31, Foundation, MapObject, ZoomLevel};
use crate::header::ArchiveError;
use crate::query::{LoadMapObjectsMetric, QueryController};

/// Everything one archive contributed to a query.
#[derive(Debug, Default)]
pub struct SectionExtract {
    /// Candidate objects matching area and zoom, in section order.
    pub objects:           Vec<Arc<MapObject>>,
    /// The archive's land/sea signal for the queried area.
    pub foundation:        Foundation,
    /// Cache blocks this extraction touched, for retention bookkeeping.
    pub referenced_blocks: HashSet<DataBlockId>,
}

/// Per-archive spatial extraction.
///
/// Implementations must honor `controller` between index blocks and fill
/// `metric` as they read; both flow through from the catalog untouched.
pub trait SectionReader: Send + Sync {
    fn extract(
        &self,
        archive:    &Archive,
        area:       &Area31,
        zoom:       ZoomLevel,
        cache:      Option<&SharedBlocksCache>,
        controller: Option<&dyn QueryController>,
        metric:     Option<&mut LoadMapObjectsMetric>,
    ) -> Result<SectionExtract, ArchiveError>;
}
