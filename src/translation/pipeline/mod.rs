//! 提取管道
//!
//! 分类、语言路由、分句与寻址、文档改写、去重与回填

pub mod addressing;
pub mod batch;
pub mod collector;
pub mod dedup;
pub mod filters;
pub mod language;
pub mod patterns;
pub mod remap;
pub mod segmenter;

// 重新导出主要类型
pub use addressing::{parse_unit_id, BlockCounter, BlockId, SentenceId, UnitId, WordId};
pub use batch::{Batch, BatchManager, BatchManagerConfig};
pub use collector::{extract_document, CollectionStats, CollectorConfig, Extraction, TextCollector};
pub use dedup::{dedupe, DedupResult};
pub use filters::{classify, is_translatable, ClassifierStats, Decision, TextUnit, UnitOrigin};
pub use remap::{
    apply_to_record, apply_to_summary, remap_by_representative, remap_by_text, segment_export,
    IdTranslationMap,
};
pub use segmenter::{ProfileRegistry, RuleBasedProfile, SegmentationProfile, SegmentedBlock};
