//! 渲染目标 - 视图系统对底层渲染树的最小要求
//!
//! 核心只依赖这里的树操作，不关心具体的绘制技术。
//! `RenderTree` 是内置的内存实现，带 taffy 布局。

mod tree;

pub use tree::{LiveNode, NodeContent, RenderTree};

use crate::error::Result;
use crate::event::{Event, EventKind, Listener, ListenerId};
use crate::geometry::Rect;
use serde_json::Value as JsonValue;

/// 渲染节点 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// 树形可渲染表面
pub trait RenderTarget {
    /// 按种类创建元素节点
    fn create_node(&mut self, kind: &str) -> Result<NodeId>;

    /// 创建文本叶子节点
    fn create_text(&mut self, text: &str) -> Result<NodeId>;

    /// 追加子节点（子节点会先从原父节点上摘下）
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()>;

    /// 插入到 `reference` 之前，`None` 表示追加到末尾
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()>;

    /// 从父节点上摘下，节点本身保留
    fn detach(&mut self, node: NodeId);

    /// 销毁节点及其整棵子树
    fn discard(&mut self, node: NodeId);

    fn set_attribute(&mut self, node: NodeId, name: &str, value: JsonValue);
    fn remove_attribute(&mut self, node: NodeId, name: &str);
    fn attribute(&self, node: NodeId, name: &str) -> Option<JsonValue>;

    fn set_text(&mut self, node: NodeId, text: &str);
    fn text(&self, node: NodeId) -> Option<String>;

    fn set_hidden(&mut self, node: NodeId, hidden: bool);
    fn is_hidden(&self, node: NodeId) -> bool;

    fn add_listener(&mut self, node: NodeId, kind: EventKind, listener: Listener) -> ListenerId;
    fn remove_listener(&mut self, node: NodeId, id: ListenerId);

    /// 在节点上触发事件并向祖先冒泡，返回是否被消费
    fn fire(&self, node: NodeId, event: &Event) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// 节点的绝对布局矩形（未挂到根上的节点没有布局）
    fn bounds(&mut self, node: NodeId) -> Option<Rect>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let idx = siblings.iter().position(|n| *n == node)?;
        siblings.get(idx + 1).copied()
    }

    /// 是否在 `ancestor` 的子树中（含自身）
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }
}
