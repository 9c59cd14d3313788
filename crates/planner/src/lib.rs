//! 测试分片规划
//!
//! 根据历史耗时为每个测试估算权重，用最长处理时间优先（LPT）的贪心装箱把测试分到
//! 各个分片，并生成可持久化的清单。

pub mod manifest;
pub mod planner;
pub mod timing;

pub use manifest::{read_manifest, write_manifest, write_shard_lists, ManifestFile, ManifestOverview};
pub use planner::ShardPlanner;
pub use timing::{timing_key, TimingEntry, TimingFile, TimingTable};
