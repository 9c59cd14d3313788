use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use pipeline_core::{Bin, Manifest, PipelineError, PipelineResult, TestItem};

/// 清单文件中的单个分片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestBin {
    pub total: f64,
    pub items: Vec<TestItem>,
}

/// 清单文件格式 `{ shards, index, totals, bins }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub shards: usize,
    pub index: usize,
    pub totals: Vec<f64>,
    pub bins: Vec<ManifestBin>,
}

impl From<&Manifest> for ManifestFile {
    fn from(manifest: &Manifest) -> Self {
        Self {
            shards: manifest.shard_count,
            index: manifest.selected_index,
            totals: manifest.totals(),
            bins: manifest
                .bins
                .iter()
                .map(|bin| ManifestBin {
                    total: bin.total,
                    items: bin.items.clone(),
                })
                .collect(),
        }
    }
}

impl TryFrom<ManifestFile> for Manifest {
    type Error = PipelineError;

    fn try_from(file: ManifestFile) -> Result<Self, Self::Error> {
        if file.bins.len() != file.shards {
            return Err(PipelineError::Configuration(format!(
                "清单分片数不一致: shards={}, bins={}",
                file.shards,
                file.bins.len()
            )));
        }
        if file.index >= file.shards {
            return Err(PipelineError::Configuration(format!(
                "清单分片索引越界: index={}, shards={}",
                file.index, file.shards
            )));
        }
        let bins = file
            .bins
            .into_iter()
            .enumerate()
            .map(|(index, bin)| {
                let mut rebuilt = Bin::empty(index);
                bin.items.into_iter().for_each(|item| rebuilt.push(item));
                rebuilt
            })
            .collect();
        Ok(Manifest {
            shard_count: file.shards,
            selected_index: file.index,
            bins,
        })
    }
}

/// 写入清单文件，父目录不存在时自动创建
pub fn write_manifest(path: &Path, manifest: &Manifest) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(&ManifestFile::from(manifest))?;
    json.push('\n');
    std::fs::write(path, json)?;
    info!("清单已写入: {}", path.display());
    Ok(())
}

/// 读取清单文件；无法读取或格式错误都视为配置错误
pub fn read_manifest(path: &Path) -> PipelineResult<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Configuration(format!("无法读取清单 {}: {e}", path.display()))
    })?;
    let file: ManifestFile = serde_json::from_str(&content).map_err(|e| {
        PipelineError::Configuration(format!("清单格式错误 {}: {e}", path.display()))
    })?;
    Manifest::try_from(file)
}

/// 为每个分片写出 `shard-<i>.txt`，每行一个测试名
pub fn write_shard_lists(dir: &Path, manifest: &Manifest) -> PipelineResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(manifest.bins.len());
    for bin in &manifest.bins {
        let path = dir.join(format!("shard-{}.txt", bin.index));
        let mut content = bin.names().join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        std::fs::write(&path, content)?;
        written.push(path);
    }
    info!("已写出 {} 个分片列表到 {}", written.len(), dir.display());
    Ok(written)
}

/// 单个分片的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardStats {
    pub index: usize,
    pub items: usize,
    pub total: f64,
}

/// 从清单重新计算的概览统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestOverview {
    pub shards: usize,
    pub items: usize,
    pub max_total: f64,
    pub min_total: f64,
    pub mean_total: f64,
    /// 最重与最轻分片的差值
    pub spread: f64,
    pub max_item_weight: f64,
    pub per_shard: Vec<ShardStats>,
}

impl ManifestOverview {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let totals = manifest.totals();
        let max_total = totals.iter().copied().fold(0.0_f64, f64::max);
        let min_total = if totals.is_empty() {
            0.0
        } else {
            totals.iter().copied().fold(f64::INFINITY, f64::min)
        };
        let mean_total = if totals.is_empty() {
            0.0
        } else {
            totals.iter().sum::<f64>() / totals.len() as f64
        };
        let max_item_weight = manifest
            .bins
            .iter()
            .flat_map(|bin| bin.items.iter().map(|item| item.weight))
            .fold(0.0_f64, f64::max);

        Self {
            shards: manifest.shard_count,
            items: manifest.item_count(),
            max_total,
            min_total,
            mean_total,
            spread: max_total - min_total,
            max_item_weight,
            per_shard: manifest
                .bins
                .iter()
                .map(|bin| ShardStats {
                    index: bin.index,
                    items: bin.items.len(),
                    total: bin.total,
                })
                .collect(),
        }
    }
}

impl fmt::Display for ManifestOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "shards: {}  tests: {}", self.shards, self.items)?;
        writeln!(
            f,
            "max: {:.1}s  min: {:.1}s  mean: {:.1}s  spread: {:.1}s  heaviest test: {:.1}s",
            self.max_total, self.min_total, self.mean_total, self.spread, self.max_item_weight
        )?;
        for shard in &self.per_shard {
            writeln!(
                f,
                "  shard {:>3}: {:>4} tests  {:>8.1}s",
                shard.index, shard.items, shard.total
            )?;
        }
        Ok(())
    }
}
