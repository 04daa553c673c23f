//! 容器视图 - 有序子视图序列
//!
//! 子视图的 `position` 与它在父容器序列中的下标始终一致。
//! 容器已物化时，插入的子视图会立即物化并放到正确位置。

use super::{ViewId, ViewTree};
use crate::error::{Result, ViewError};
use crate::render::RenderTarget;

/// 有序容器能力
pub trait OrderedContainer {
    fn items(&self) -> &[ViewId];

    fn len(&self) -> usize {
        self.items().len()
    }

    fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn index_of(&self, view: ViewId) -> Option<usize> {
        self.items().iter().position(|v| *v == view)
    }

    fn get(&self, index: usize) -> Option<ViewId> {
        self.items().get(index).copied()
    }
}

/// 子视图序列
#[derive(Debug, Clone, Default)]
pub struct ChildList {
    items: Vec<ViewId>,
}

impl ChildList {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, index: usize, view: ViewId) {
        self.items.insert(index.min(self.items.len()), view);
    }

    pub(crate) fn take(&mut self, index: usize) -> Option<ViewId> {
        remove_at(&mut self.items, index)
    }
}

impl OrderedContainer for ChildList {
    fn items(&self) -> &[ViewId] {
        &self.items
    }
}

/// 按下标移除，越界返回 None
pub fn remove_at<T>(seq: &mut Vec<T>, index: usize) -> Option<T> {
    if index < seq.len() {
        Some(seq.remove(index))
    } else {
        None
    }
}

impl<T: RenderTarget> ViewTree<T> {
    /// 插入子视图，`position` 缺省或越界时追加到末尾。返回实际位置。
    pub fn insert(&mut self, container: ViewId, child: ViewId, position: Option<usize>) -> Result<usize> {
        if let Some(owner) = self.view_ref(child)?.parent {
            return Err(ViewError::AlreadyOwned(owner));
        }
        if self.is_ancestor_or_self(child, container) {
            return Err(ViewError::InvalidState(format!(
                "view {:?} cannot be inserted into its own descendant {:?}",
                child, container
            )));
        }

        let index = {
            let parent = self.view_mut(container)?;
            let list = parent.role.children_mut().ok_or(ViewError::NotAContainer(container))?;
            let index = position.unwrap_or(list.len()).min(list.len());
            list.insert(index, child);
            index
        };
        {
            let view = self.view_mut(child)?;
            view.parent = Some(container);
            view.position = Some(index);
        }
        self.reindex(container, index + 1);

        if self.live_node(container).is_some() {
            if self.live_node(child).is_some() {
                self.place_child(container, child)?;
            } else {
                self.ensure_live(child)?;
            }
        }
        self.sync_empty_flag(container)?;
        log::trace!("inserted {:?} into {:?} at {}", child, container, index);
        Ok(index)
    }

    /// 移除子视图（不销毁）；不是成员时报错
    pub fn remove(&mut self, container: ViewId, child: ViewId) -> Result<()> {
        let index = self
            .view_ref(container)?
            .role
            .container()
            .ok_or(ViewError::NotAContainer(container))?
            .index_of(child)
            .ok_or(ViewError::NotAMember { container, child })?;
        self.detach_child(container, index, true)?;
        Ok(())
    }

    /// 按下标移除，返回被移除的子视图
    pub fn remove_index(&mut self, container: ViewId, index: usize) -> Result<ViewId> {
        self.detach_child(container, index, true)
    }

    /// 从尾到头移除全部子视图
    pub fn remove_all(&mut self, container: ViewId) -> Result<()> {
        let len = self
            .view_ref(container)?
            .role
            .container()
            .ok_or(ViewError::NotAContainer(container))?
            .len();
        for index in (0..len).rev() {
            self.detach_child(container, index, true)?;
        }
        Ok(())
    }

    pub fn items(&self, container: ViewId) -> Result<&[ViewId]> {
        Ok(self
            .view_ref(container)?
            .role
            .container()
            .ok_or(ViewError::NotAContainer(container))?
            .items())
    }

    pub fn position(&self, view: ViewId) -> Option<usize> {
        self.views.get(&view).and_then(|v| v.position)
    }

    pub fn parent(&self, view: ViewId) -> Option<ViewId> {
        self.views.get(&view).and_then(|v| v.parent)
    }

    /// `deselect` 为 false 时保留列表选择（重排时使用）
    pub(crate) fn detach_child(&mut self, container: ViewId, index: usize, deselect: bool) -> Result<ViewId> {
        let child = {
            let parent = self.view_mut(container)?;
            let list = parent.role.children_mut().ok_or(ViewError::NotAContainer(container))?;
            list.take(index).ok_or(ViewError::IndexOutOfRange { container, index })?
        };
        if let Some(view) = self.views.get_mut(&child) {
            view.parent = None;
            view.position = None;
        }
        self.reindex(container, index);

        self.clear_drag_feedback(child);
        if let Some(node) = self.live_node(child) {
            self.target.detach(node);
        }
        if deselect {
            self.forget_in_list(container, child);
        }
        self.sync_empty_flag(container)?;
        log::trace!("removed {:?} from {:?} at {}", child, container, index);
        Ok(child)
    }

    /// 从 `from` 开始重新同步子视图的位置
    fn reindex(&mut self, container: ViewId, from: usize) {
        let tail: Vec<ViewId> = match self.views.get(&container).and_then(|v| v.role.container()) {
            Some(list) => list.items().get(from..).unwrap_or(&[]).to_vec(),
            None => return,
        };
        for (offset, id) in tail.into_iter().enumerate() {
            if let Some(view) = self.views.get_mut(&id) {
                view.position = Some(from + offset);
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ViewId, view: ViewId) -> bool {
        let mut cur = Some(view);
        while let Some(v) = cur {
            if v == ancestor {
                return true;
            }
            cur = self.parent(v);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_at_bounds() {
        let mut v = vec![1, 2, 3];
        assert_eq!(remove_at(&mut v, 1), Some(2));
        assert_eq!(remove_at(&mut v, 5), None);
        assert_eq!(v, vec![1, 3]);
    }

    #[test]
    fn test_child_list_insert_clamps() {
        let mut list = ChildList::new();
        list.insert(0, ViewId(1));
        list.insert(9, ViewId(2));
        list.insert(0, ViewId(3));
        assert_eq!(list.items(), &[ViewId(3), ViewId(1), ViewId(2)]);
        assert_eq!(list.index_of(ViewId(2)), Some(2));
    }
}
