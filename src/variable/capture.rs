use std::collections::BTreeMap;
use std::ops::Range;

/// 一次正则匹配的结果快照
///
/// 纯数据，不持有正则引擎的任何状态。第 0 组为完整匹配，
/// 第 1 组起为各子组；未参与匹配的子组为 `None`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    groups: Vec<Option<String>>,
    range: Range<usize>,
}

impl Capture {
    pub fn from_captures(caps: &regex::Captures<'_>) -> Self {
        let range = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let groups = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        Self { groups, range }
    }

    /// 由完整匹配和子组直接构造
    pub fn from_parts(
        matched: impl Into<String>,
        subgroups: impl IntoIterator<Item = Option<String>>,
    ) -> Self {
        let matched = matched.into();
        let range = 0..matched.len();
        let groups = std::iter::once(Some(matched)).chain(subgroups).collect();
        Self { groups, range }
    }

    /// 按组号取值，0 为完整匹配
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// 完整匹配文本
    pub fn as_str(&self) -> &str {
        self.group(0).unwrap_or_default()
    }

    /// 子组数量（不含完整匹配）
    pub fn len(&self) -> usize {
        self.groups.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 完整匹配在响应体中的字节偏移
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

/// 阶段序号 -> 捕获
///
/// 只追加：同一序号写入后不再改变。
#[derive(Debug, Clone, Default)]
pub struct CaptureStore {
    entries: BTreeMap<usize, Capture>,
}

impl CaptureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入某阶段的捕获；该阶段已有记录时保持原值并返回 false
    pub fn insert(&mut self, stage: usize, capture: Capture) -> bool {
        if self.entries.contains_key(&stage) {
            return false;
        }
        self.entries.insert(stage, capture);
        true
    }

    pub fn get(&self, stage: usize) -> Option<&Capture> {
        self.entries.get(&stage)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
