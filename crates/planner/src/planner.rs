use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use pipeline_core::{
    config::PlannerConfig, Bin, Manifest, PipelineError, PipelineResult, TestItem,
};

use crate::timing::{median, TimingTable};

/// 分片规划器
///
/// 贪心的 LPT 装箱：按权重从大到小依次放进当前总权重最小的分片。
/// 结果不是最优解，但对相同输入完全确定。
pub struct ShardPlanner {
    config: PlannerConfig,
    timings: TimingTable,
}

impl ShardPlanner {
    pub fn new(config: PlannerConfig, timings: TimingTable) -> Self {
        Self { config, timings }
    }

    /// 为每个测试名解析权重
    ///
    /// 没有历史数据的测试使用本次已知权重的中位数；本次一个都不知道时退回整张耗时表的
    /// 中位数，耗时表为空时使用固定的兜底值。重复和空白的名字会被忽略。
    pub fn resolve_items(&self, names: &[String]) -> Vec<TestItem> {
        let mut seen = BTreeSet::new();
        let unique: Vec<&str> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .filter(|name| {
                let fresh = seen.insert(name.to_string());
                if !fresh {
                    debug!("忽略重复的测试名: {name}");
                }
                fresh
            })
            .collect();

        let known: Vec<Option<f64>> = unique
            .iter()
            .map(|name| self.timings.weight_for(name))
            .collect();

        let default_weight = median(known.iter().flatten().copied().collect())
            .or_else(|| self.timings.median())
            .unwrap_or(self.config.fallback_weight);

        let unknown = known.iter().filter(|w| w.is_none()).count();
        if unknown > 0 {
            info!(
                "{} 个测试没有历史耗时，使用默认权重 {:.2}s",
                unknown, default_weight
            );
        }

        unique
            .into_iter()
            .zip(known)
            .map(|(name, weight)| TestItem::new(name, weight.unwrap_or(default_weight)))
            .collect()
    }

    /// LPT 装箱
    ///
    /// 先按权重降序、名字升序排序，再逐个放进总权重最小的分片，平局取索引最小者。
    pub fn pack(mut items: Vec<TestItem>, shards: usize) -> Vec<Bin> {
        let mut bins: Vec<Bin> = (0..shards).map(Bin::empty).collect();
        if bins.is_empty() {
            return bins;
        }

        items.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then_with(|| a.name.cmp(&b.name))
        });

        for item in items {
            let mut target = 0;
            for (index, bin) in bins.iter().enumerate().skip(1) {
                if bin.total < bins[target].total {
                    target = index;
                }
            }
            bins[target].push(item);
        }

        bins
    }

    /// 生成分片清单
    pub fn plan(&self, names: &[String], shards: usize, index: usize) -> PipelineResult<Manifest> {
        if shards == 0 {
            return Err(PipelineError::Configuration(
                "分片数量必须大于 0".to_string(),
            ));
        }

        let selected_index = if index < shards {
            index
        } else if self.config.clamp_out_of_range_index {
            warn!(
                "分片索引 {} 超出范围 [0, {})，按配置钳制为 0，请检查 CI 矩阵定义",
                index, shards
            );
            0
        } else {
            return Err(PipelineError::ShardIndexOutOfRange { index, shards });
        };

        let items = self.resolve_items(names);
        let item_count = items.len();
        let bins = Self::pack(items, shards);

        let manifest = Manifest {
            shard_count: shards,
            selected_index,
            bins,
        };

        if let Some(bin) = manifest.selected_bin() {
            info!(
                "分片规划完成: {} 个测试分到 {} 个分片，当前分片 {} 包含 {} 个测试，预计 {:.1}s",
                item_count,
                shards,
                selected_index,
                bin.items.len(),
                bin.total
            );
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::TimingFile;
    use crate::TimingEntry;

    fn table(entries: &[(&str, f64)]) -> TimingTable {
        TimingTable::from_file(&TimingFile {
            files: entries
                .iter()
                .map(|(file, avg)| TimingEntry {
                    file: file.to_string(),
                    avg: Some(*avg),
                    total: None,
                    count: None,
                })
                .collect(),
        })
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fallback_weight_without_timings() {
        let planner = ShardPlanner::new(PlannerConfig::default(), TimingTable::empty());
        let items = planner.resolve_items(&names(&["unseen.e2e.ts"]));
        assert_eq!(items, vec![TestItem::new("unseen.e2e.ts", 15.0)]);
    }

    #[test]
    fn test_unknown_uses_median_of_known_items() {
        let planner = ShardPlanner::new(
            PlannerConfig::default(),
            table(&[("a", 10.0), ("b", 20.0), ("c", 60.0), ("z", 1000.0)]),
        );
        let items = planner.resolve_items(&names(&["a", "b", "c", "new"]));
        assert_eq!(items[3], TestItem::new("new", 20.0));
    }

    #[test]
    fn test_unknown_uses_table_median_when_nothing_matches() {
        let planner = ShardPlanner::new(
            PlannerConfig::default(),
            table(&[("x", 8.0), ("y", 12.0)]),
        );
        let items = planner.resolve_items(&names(&["new"]));
        assert_eq!(items[0].weight, 10.0);
    }

    #[test]
    fn test_duplicates_and_blank_lines_ignored() {
        let planner = ShardPlanner::new(PlannerConfig::default(), TimingTable::empty());
        let items = planner.resolve_items(&names(&["a", "", "  ", "a", "b"]));
        let got: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(got, vec!["a", "b"]);
    }

    #[test]
    fn test_pack_tie_goes_to_lowest_index() {
        let bins = ShardPlanner::pack(
            vec![TestItem::new("b", 5.0), TestItem::new("a", 5.0)],
            3,
        );
        assert_eq!(bins[0].names(), vec!["a".to_string()]);
        assert_eq!(bins[1].names(), vec!["b".to_string()]);
        assert!(bins[2].items.is_empty());
    }

    #[test]
    fn test_zero_shards_rejected() {
        let planner = ShardPlanner::new(PlannerConfig::default(), TimingTable::empty());
        let err = planner.plan(&names(&["a"]), 0, 0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_out_of_range_index_rejected_by_default() {
        let planner = ShardPlanner::new(PlannerConfig::default(), TimingTable::empty());
        let err = planner.plan(&names(&["a"]), 2, 5).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ShardIndexOutOfRange { index: 5, shards: 2 }
        ));
    }

    #[test]
    fn test_out_of_range_index_clamped_when_enabled() {
        let config = PlannerConfig {
            clamp_out_of_range_index: true,
            ..PlannerConfig::default()
        };
        let planner = ShardPlanner::new(config, TimingTable::empty());
        let manifest = planner.plan(&names(&["a", "b"]), 2, 9).unwrap();
        assert_eq!(manifest.selected_index, 0);
    }
}
