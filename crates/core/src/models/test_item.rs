use serde::{Deserialize, Serialize};

/// 待分片的测试项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestItem {
    pub name: String,
    /// 预估执行耗时（秒）
    pub weight: f64,
}

impl TestItem {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// 单个分片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub index: usize,
    pub items: Vec<TestItem>,
    pub total: f64,
}

impl Bin {
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            items: Vec::new(),
            total: 0.0,
        }
    }

    /// 放入测试项并累加总权重
    pub fn push(&mut self, item: TestItem) {
        self.total += item.weight;
        self.items.push(item);
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.name.clone()).collect()
    }
}

/// 一次分片规划的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub shard_count: usize,
    pub selected_index: usize,
    pub bins: Vec<Bin>,
}

impl Manifest {
    pub fn selected_bin(&self) -> Option<&Bin> {
        self.bins.get(self.selected_index)
    }

    pub fn totals(&self) -> Vec<f64> {
        self.bins.iter().map(|bin| bin.total).collect()
    }

    pub fn item_count(&self) -> usize {
        self.bins.iter().map(|bin| bin.items.len()).sum()
    }
}
