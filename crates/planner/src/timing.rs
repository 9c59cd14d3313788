use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pipeline_core::{PipelineError, PipelineResult};

/// 历史耗时文件中的一条记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEntry {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl TimingEntry {
    /// 优先使用预先计算好的平均值，否则用 total / count
    pub fn average(&self) -> Option<f64> {
        if let Some(avg) = self.avg.filter(|v| v.is_finite() && *v >= 0.0) {
            return Some(avg);
        }
        match (self.total, self.count) {
            (Some(total), Some(count)) if count > 0 && total.is_finite() && total >= 0.0 => {
                Some(total / count as f64)
            }
            _ => None,
        }
    }
}

/// 历史耗时文件 `{ files: [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingFile {
    #[serde(default)]
    pub files: Vec<TimingEntry>,
}

/// 作为测试文件扩展名剥离的后缀
const TEST_SUFFIXES: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "e2e", "spec", "test"];

/// 测试的耗时键：去掉目录，再从尾部逐个剥离已知的测试扩展名。
///
/// 名字中间的 `.` 保留，`_group<N>` 之类的后缀也是名字的一部分，不会被合并。
pub fn timing_key(name: &str) -> String {
    let mut key = name
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    while let Some((stem, ext)) = key.rsplit_once('.') {
        let known = TEST_SUFFIXES.iter().any(|s| s.eq_ignore_ascii_case(ext));
        if stem.is_empty() || !known {
            break;
        }
        key = stem;
    }
    key.to_string()
}

/// 按耗时键索引的平均耗时表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingTable {
    weights: BTreeMap<String, f64>,
}

impl TimingTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(file: &TimingFile) -> Self {
        let mut weights = BTreeMap::new();
        for entry in &file.files {
            let Some(avg) = entry.average() else {
                debug!("耗时记录 {} 没有可用的平均值，忽略", entry.file);
                continue;
            };
            let key = timing_key(&entry.file);
            if key.is_empty() {
                continue;
            }
            if weights.contains_key(&key) {
                debug!("耗时记录 {} 重复，保留第一条", key);
                continue;
            }
            weights.insert(key, avg);
        }
        Self { weights }
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let file: TimingFile = serde_json::from_str(json)?;
        Ok(Self::from_file(&file))
    }

    /// 读取耗时文件；文件不存在时返回空表
    pub fn load(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            warn!("耗时文件不存在: {}，使用默认权重", path.display());
            return Ok(Self::empty());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| {
            PipelineError::Configuration(format!("耗时文件格式错误 {}: {e}", path.display()))
        })
    }

    pub fn weight_for(&self, name: &str) -> Option<f64> {
        self.weights.get(&timing_key(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn median(&self) -> Option<f64> {
        median(self.weights.values().copied().collect())
    }
}

pub(crate) fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_key() {
        assert_eq!(timing_key("a.test"), "a");
        assert_eq!(timing_key("e2e/test/channels/create_channel.e2e.ts"), "create_channel");
        assert_eq!(timing_key("search_group2.e2e.ts"), "search_group2");
        assert_eq!(timing_key("plain"), "plain");
        assert_eq!(timing_key(".hidden"), ".hidden");
        assert_eq!(timing_key(r"win\path\x.spec.js"), "x");
        assert_eq!(timing_key("LOGIN.E2E.TS"), "LOGIN");
    }

    #[test]
    fn test_timing_key_keeps_inner_dots() {
        let dotted = timing_key("e2e/foo.bar_group1.e2e.ts");
        assert_eq!(dotted, "foo.bar_group1");
        assert_ne!(dotted, timing_key("e2e/foo.e2e.ts"));

        let table = TimingTable::from_json(
            r#"{"files":[{"file":"foo.e2e.ts","avg":5},{"file":"foo.bar.e2e.ts","avg":40}]}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_entry_average_precedence() {
        let entry = TimingEntry {
            file: "a".into(),
            avg: Some(12.0),
            total: Some(100.0),
            count: Some(4),
        };
        assert_eq!(entry.average(), Some(12.0));

        let entry = TimingEntry {
            avg: None,
            ..entry
        };
        assert_eq!(entry.average(), Some(25.0));

        let entry = TimingEntry {
            file: "b".into(),
            avg: None,
            total: Some(10.0),
            count: Some(0),
        };
        assert_eq!(entry.average(), None);
    }

    #[test]
    fn test_table_from_json() {
        let table = TimingTable::from_json(
            r#"{"files":[
                {"file":"e2e/a.e2e.ts","avg":30},
                {"file":"b.e2e.ts","total":40,"count":4},
                {"file":"c.e2e.ts"},
                {"file":"a.e2e.ts","avg":99}
            ]}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.weight_for("a.test"), Some(30.0));
        assert_eq!(table.weight_for("b"), Some(10.0));
        assert_eq!(table.weight_for("c"), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(vec![]), None);
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let table = TimingTable::load(Path::new("/nonexistent/timings.json")).unwrap();
        assert!(table.is_empty());
    }
}
