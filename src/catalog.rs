//! Multi-archive data catalog.
//!
//! A [`Catalog`] aggregates spatially and zoom-filtered map objects from a
//! fixed, ordered list of archives into one logical query result.  It
//! holds no archive state beyond the list it was given: archives are
//! shared in, the section reader is injected, and every query carries its
//! own cancellation token, cache handle and metric aggregate.
//!
//! Iteration order is the contract: objects accumulate in archive list
//! order with no reordering and no implicit cross-archive deduplication.
//! Identity policy is the caller's, injected as a plain predicate, so
//! dedup state can live across repeated queries (incremental panning).
//!
//! All calls are synchronous and blocking; long scans belong on a
//! caller-managed worker.  Cancellation is polled between archives and a
//! cancelled query returns whatever it had accumulated, flagged
//! `completed = false`.  The same flag covers malformed archives, which
//! are skipped best-effort; logs distinguish the two so cancellation
//! noise never masks real corruption.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::archive::Archive;
use crate::cache::{DataBlockId, SharedBlocksCache};
use crate::feature::{Area31, Foundation, MapObject, ZoomLevel};
use crate::header::ArchiveInfo;
use crate::query::{LoadMapObjectsMetric, QueryController};
use crate::section::SectionReader;

/// Caller-owned acceptance predicate over object identifiers.
pub type IdFilter<'a> = &'a dyn Fn(u64) -> bool;

/// Result of [`Catalog::load_map_objects`].  Always well-formed, even
/// when the scan stopped early.
#[derive(Debug)]
pub struct MapObjectsLoad {
    /// Accepted objects, in archive-iteration order.
    pub objects:           Vec<Arc<MapObject>>,
    /// Merged land/sea classification of the queried area.
    pub foundation:        Foundation,
    /// Union of cache blocks the scan referenced.
    pub referenced_blocks: HashSet<DataBlockId>,
    /// True iff every archive was processed without cancellation.
    pub completed:         bool,
}

pub struct Catalog {
    archives:       Vec<Arc<Archive>>,
    section_reader: Arc<dyn SectionReader>,
}

impl Catalog {
    /// Build a catalog over already-open archives.  The list is fixed for
    /// the catalog's lifetime; its order defines query priority.
    pub fn new(archives: Vec<Arc<Archive>>, section_reader: Arc<dyn SectionReader>) -> Self {
        Self { archives, section_reader }
    }

    pub fn archives(&self) -> &[Arc<Archive>] {
        &self.archives
    }

    /// Validate and collect every archive's descriptor, in list order.
    ///
    /// An unreadable header is fatal for that archive only: it is logged
    /// and the scan continues best-effort.  The returned flag is true only
    /// if every archive parsed and no cancellation fired.
    pub fn load_archive_infos(
        &self,
        controller: Option<&dyn QueryController>,
    ) -> (Vec<Arc<ArchiveInfo>>, bool) {
        let mut infos = Vec::with_capacity(self.archives.len());
        let mut complete = true;

        for (index, archive) in self.archives.iter().enumerate() {
            if is_cancelled(controller) {
                log::warn!(
                    "archive descriptor scan cancelled after {index} of {} archive(s)",
                    self.archives.len(),
                );
                return (infos, false);
            }
            match archive.info() {
                Ok(info) => infos.push(info),
                Err(e) => {
                    log::error!(
                        "unreadable archive header in {}: {e}",
                        archive.path().display(),
                    );
                    complete = false;
                }
            }
        }
        (infos, complete)
    }

    /// Scan archive metadata for a basemap (low-detail fallback) section,
    /// stopping at the first positive match.  Feature data is never
    /// touched.
    pub fn detect_basemap(&self, controller: Option<&dyn QueryController>) -> (bool, bool) {
        let mut complete = true;

        for (index, archive) in self.archives.iter().enumerate() {
            if is_cancelled(controller) {
                log::warn!(
                    "basemap scan cancelled after {index} of {} archive(s)",
                    self.archives.len(),
                );
                return (false, false);
            }
            match archive.info() {
                Ok(info) if info.has_basemap() => return (true, complete),
                Ok(_) => {}
                Err(e) => {
                    log::error!(
                        "unreadable archive header in {}: {e}",
                        archive.path().display(),
                    );
                    complete = false;
                }
            }
        }
        (false, complete)
    }

    /// Extract the map objects intersecting `area` at `zoom` from every
    /// archive, in list order.
    ///
    /// Each candidate passes through `filter_by_id` (when supplied) before
    /// it is accumulated; a rejected object is excluded from this result
    /// only — the catalog keeps no dedup state of its own.  No lock is
    /// held across the predicate call.  The metric aggregate accumulates
    /// regardless of how the scan ends.
    pub fn load_map_objects(
        &self,
        area:         &Area31,
        zoom:         ZoomLevel,
        filter_by_id: Option<IdFilter<'_>>,
        cache:        Option<&SharedBlocksCache>,
        controller:   Option<&dyn QueryController>,
        mut metric:   Option<&mut LoadMapObjectsMetric>,
    ) -> MapObjectsLoad {
        let started = Instant::now();
        let mut load = MapObjectsLoad {
            objects:           Vec::new(),
            foundation:        Foundation::Undefined,
            referenced_blocks: HashSet::new(),
            completed:         true,
        };

        for (index, archive) in self.archives.iter().enumerate() {
            if is_cancelled(controller) {
                log::warn!(
                    "map object query cancelled after {index} of {} archive(s)",
                    self.archives.len(),
                );
                load.completed = false;
                break;
            }

            let extract = match self.section_reader.extract(
                archive,
                area,
                zoom,
                cache,
                controller,
                reborrow(&mut metric),
            ) {
                Ok(extract) => extract,
                Err(e) => {
                    log::error!(
                        "failed to extract map objects from {}: {e}",
                        archive.path().display(),
                    );
                    load.completed = false;
                    continue;
                }
            };

            if let Some(m) = reborrow(&mut metric) {
                m.archives_visited += 1;
            }

            for object in extract.objects {
                if let Some(m) = reborrow(&mut metric) {
                    m.objects_visited += 1;
                }
                if let Some(filter) = filter_by_id {
                    if !filter(object.id) {
                        if let Some(m) = reborrow(&mut metric) {
                            m.objects_rejected += 1;
                        }
                        continue;
                    }
                }
                if let Some(m) = reborrow(&mut metric) {
                    m.objects_accepted += 1;
                }
                load.objects.push(object);
            }

            load.foundation = load.foundation.merge(extract.foundation);
            load.referenced_blocks.extend(extract.referenced_blocks);
        }

        if let Some(m) = metric {
            m.elapsed += started.elapsed();
        }
        load
    }
}

fn is_cancelled(controller: Option<&dyn QueryController>) -> bool {
    controller.map_or(false, QueryController::is_cancelled)
}

/// Reborrow an optional exclusive metric handle for one more callee.
fn reborrow<'a>(
    metric: &'a mut Option<&mut LoadMapObjectsMetric>,
) -> Option<&'a mut LoadMapObjectsMetric> {
    metric.as_mut().map(|m| &mut **m)
}
