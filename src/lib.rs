pub mod archive;
pub mod cache;
pub mod catalog;
pub mod feature;
pub mod header;
pub mod ids;
pub mod query;
pub mod section;
pub mod strings;
pub mod wire;

pub use archive::Archive;
pub use cache::{DataBlock, DataBlockId, SharedBlocksCache};
pub use catalog::{Catalog, IdFilter, MapObjectsLoad};
pub use feature::{Area31, Foundation, MapObject, Point31, ZoomLevel};
pub use header::{ArchiveError, ArchiveInfo, MapSectionInfo};
pub use ids::IdToken;
pub use query::{CancellationFlag, LoadMapObjectsMetric, QueryController};
pub use section::{SectionExtract, SectionReader};
pub use wire::{DecodeError, WireReader};
