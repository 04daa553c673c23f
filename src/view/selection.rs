//! 选择辅助
//!
//! 只保存选中集合和范围选择的锚点，不接触渲染节点。
//! 每个操作返回实际发生的变化，由调用方同步条目状态并发出事件。

use super::ViewId;
use crate::event::Modifiers;
use indexmap::IndexSet;

/// 可选中能力
pub trait Selectable {
    fn is_selected(&self) -> bool;
    fn set_selected(&mut self, selected: bool);
}

/// 一次选择变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added(ViewId),
    Removed(ViewId),
}

impl SelectionChange {
    pub fn item(&self) -> ViewId {
        match self {
            SelectionChange::Added(id) | SelectionChange::Removed(id) => *id,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, SelectionChange::Added(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionHelper {
    enabled: bool,
    ctrl_forces_selection: bool,
    selected: IndexSet<ViewId>,
    /// 最近一次点击切换的条目，作为 Shift 范围选择的锚点
    last_toggled: Option<ViewId>,
}

impl SelectionHelper {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, ..Default::default() }
    }

    pub fn with_ctrl_forces_selection(mut self, on: bool) -> Self {
        self.ctrl_forces_selection = on;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ctrl_forces_selection(&self) -> bool {
        self.ctrl_forces_selection
    }

    /// 关闭选择会清空当前选中
    pub fn set_enabled(&mut self, enabled: bool) -> Vec<SelectionChange> {
        let changes = if enabled { Vec::new() } else { self.clear() };
        self.enabled = enabled;
        changes
    }

    pub fn is_selected(&self, item: ViewId) -> bool {
        self.selected.contains(&item)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn last_toggled(&self) -> Option<ViewId> {
        self.last_toggled
    }

    /// 按选中先后顺序
    pub fn selected(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.selected.iter().copied()
    }

    /// 按列表顺序
    pub fn selected_in_order(&self, items: &[ViewId]) -> Vec<ViewId> {
        items.iter().copied().filter(|i| self.selected.contains(i)).collect()
    }

    /// 切换或强制设置单个条目；选择关闭时不会新增选中
    pub fn toggle_item_selection(&mut self, item: ViewId, force: Option<bool>) -> Option<SelectionChange> {
        let current = self.is_selected(item);
        let wanted = force.unwrap_or(!current);
        if wanted == current {
            return None;
        }
        if wanted {
            if !self.enabled {
                return None;
            }
            self.selected.insert(item);
            Some(SelectionChange::Added(item))
        } else {
            self.selected.shift_remove(&item);
            Some(SelectionChange::Removed(item))
        }
    }

    /// 处理条目点击。返回 (是否处理, 变化列表)。
    ///
    /// - 普通点击 / Ctrl 点击：切换该条目
    /// - Shift 点击：锚点到该条目之间（不含锚点）全部设为锚点当前的选中状态
    pub fn handle_item_clicked(
        &mut self,
        item: ViewId,
        items: &[ViewId],
        modifiers: Modifiers,
    ) -> (bool, Vec<SelectionChange>) {
        if !self.enabled {
            if self.ctrl_forces_selection && modifiers.ctrl_or_meta() {
                self.enabled = true;
            } else {
                return (false, Vec::new());
            }
        }

        let mut changes = Vec::new();
        let range = if modifiers.shift {
            self.last_toggled
                .filter(|anchor| *anchor != item)
                .and_then(|anchor| {
                    let from = items.iter().position(|i| *i == anchor)?;
                    let to = items.iter().position(|i| *i == item)?;
                    Some((anchor, from.min(to), from.max(to)))
                })
        } else {
            None
        };

        match range {
            Some((anchor, lo, hi)) => {
                let target = self.is_selected(anchor);
                for &other in &items[lo..=hi] {
                    if other == anchor {
                        continue;
                    }
                    changes.extend(self.toggle_item_selection(other, Some(target)));
                }
            }
            None => changes.extend(self.toggle_item_selection(item, None)),
        }

        self.last_toggled = Some(item);
        (true, changes)
    }

    pub fn select_all(&mut self, items: &[ViewId]) -> Vec<SelectionChange> {
        if !self.enabled {
            return Vec::new();
        }
        items
            .iter()
            .filter_map(|&i| self.toggle_item_selection(i, Some(true)))
            .collect()
    }

    pub fn clear(&mut self) -> Vec<SelectionChange> {
        self.last_toggled = None;
        self.selected.drain(..).map(SelectionChange::Removed).collect()
    }

    /// 条目离开列表
    pub fn forget(&mut self, item: ViewId) -> Option<SelectionChange> {
        if self.last_toggled == Some(item) {
            self.last_toggled = None;
        }
        self.toggle_item_selection(item, Some(false))
    }
}
