//! 内存渲染树
//!
//! 每个节点对应一个 taffy 节点，结构变化时同步到 taffy 树，
//! 查询 `bounds` 时按需重新计算布局。

use super::{NodeId, RenderTarget};
use crate::error::{Result, ViewError};
use crate::event::{Event, EventKind, Listener, ListenerId, ListenerSet};
use crate::geometry::Rect;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use taffy::prelude::{
    auto, length, AvailableSpace, Display, FlexDirection, NodeId as LayoutId, Size, Style, TaffyTree,
};

/// 文本行高（逻辑像素）
const TEXT_LINE_HEIGHT: f32 = 18.0;
/// 估算的平均字宽
const TEXT_CHAR_WIDTH: f32 = 7.0;

/// 节点内容
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Element(String),
    Text(String),
}

/// 渲染树中的一个活节点
pub struct LiveNode {
    pub content: NodeContent,
    pub attrs: BTreeMap<String, JsonValue>,
    pub hidden: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// 元素文本所在的子节点
    text_child: Option<NodeId>,
    listeners: ListenerSet,
    layout: LayoutId,
}

impl LiveNode {
    pub fn kind(&self) -> &str {
        match &self.content {
            NodeContent::Element(kind) => kind,
            NodeContent::Text(_) => "#text",
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// 内存渲染树
pub struct RenderTree {
    nodes: HashMap<NodeId, LiveNode>,
    taffy: TaffyTree,
    root: NodeId,
    next_id: u64,
    next_listener: u64,
    viewport_width: f32,
    layout_dirty: bool,
}

impl RenderTree {
    pub fn new(viewport_width: f32) -> Self {
        let mut taffy: TaffyTree = TaffyTree::new();
        // 根节点固定宽度，高度随内容增长。
        // 空树上 new_leaf 只分配一个槽位，taffy 0.4 中不会返回错误
        let root_layout = taffy
            .new_leaf(Style {
                display: Display::Flex,
                flex_direction: FlexDirection::Column,
                size: Size { width: length(viewport_width), height: auto() },
                ..Default::default()
            })
            .expect("taffy leaf creation on an empty tree");
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, LiveNode {
            content: NodeContent::Element("root".into()),
            attrs: BTreeMap::new(),
            hidden: false,
            parent: None,
            children: Vec::new(),
            text_child: None,
            listeners: ListenerSet::new(),
            layout: root_layout,
        });

        Self {
            nodes,
            taffy,
            root,
            next_id: 1,
            next_listener: 1,
            viewport_width,
            layout_dirty: true,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&LiveNode> {
        self.nodes.get(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.kind())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// 子树中可见文本的拼接，主要给测试和调试输出用
    pub fn text_content(&self, id: NodeId) -> String {
        let mut s = String::new();
        self.collect_text(id, &mut s);
        s
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else { return };
        if node.hidden {
            return;
        }
        match &node.content {
            NodeContent::Text(t) => out.push_str(t),
            NodeContent::Element(_) => {
                for c in &node.children {
                    self.collect_text(*c, out);
                }
            }
        }
    }

    /// 以缩进文本形式输出子树
    pub fn dump(&self, id: NodeId) -> String {
        let mut s = String::new();
        self.dump_into(id, 0, &mut s);
        s
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else { return };
        let indent = "  ".repeat(depth);
        match &node.content {
            NodeContent::Text(t) => out.push_str(&format!("{}\"{}\"", indent, t)),
            NodeContent::Element(kind) => {
                out.push_str(&format!("{}<{}", indent, kind));
                for (k, v) in &node.attrs {
                    out.push_str(&format!(" {}={}", k, v));
                }
                out.push('>');
            }
        }
        if node.hidden {
            out.push_str(" (hidden)");
        }
        out.push('\n');
        for c in &node.children {
            self.dump_into(*c, depth + 1, out);
        }
    }

    fn alloc(&mut self, content: NodeContent, style: Style) -> Result<NodeId> {
        let layout = self.taffy.new_leaf(style).map_err(|e| ViewError::Layout(e.to_string()))?;
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, LiveNode {
            content,
            attrs: BTreeMap::new(),
            hidden: false,
            parent: None,
            children: Vec::new(),
            text_child: None,
            listeners: ListenerSet::new(),
            layout,
        });
        Ok(id)
    }

    fn text_style(text: &str) -> Style {
        let width = text.chars().count() as f32 * TEXT_CHAR_WIDTH;
        Style {
            size: Size { width: length(width), height: length(TEXT_LINE_HEIGHT) },
            ..Default::default()
        }
    }

    fn layout_of(&self, id: NodeId) -> Result<LayoutId> {
        self.nodes.get(&id).map(|n| n.layout).ok_or(ViewError::UnknownNode(id))
    }

    fn update_style(&mut self, id: NodeId, f: impl FnOnce(&mut Style)) {
        let Some(node) = self.nodes.get(&id) else { return };
        let layout = node.layout;
        let mut style = match self.taffy.style(layout) {
            Ok(s) => s.clone(),
            Err(e) => {
                log::warn!("style lookup failed for {:?}: {}", id, e);
                return;
            }
        };
        f(&mut style);
        if let Err(e) = self.taffy.set_style(layout, style) {
            log::warn!("set_style failed for {:?}: {}", id, e);
        }
        self.layout_dirty = true;
    }

    fn compute_layout(&mut self) -> Result<()> {
        if !self.layout_dirty {
            return Ok(());
        }
        let root_layout = self.layout_of(self.root)?;
        self.taffy
            .compute_layout(
                root_layout,
                Size { width: AvailableSpace::Definite(self.viewport_width), height: AvailableSpace::MaxContent },
            )
            .map_err(|e| ViewError::Layout(e.to_string()))?;
        self.layout_dirty = false;
        Ok(())
    }

    /// `ancestor` 是否为 `node` 的祖先或自身，用于防止把节点插到自己的子树里
    fn creates_cycle(&self, parent: NodeId, child: NodeId) -> bool {
        self.is_within(parent, child)
    }
}

impl RenderTarget for RenderTree {
    fn create_node(&mut self, kind: &str) -> Result<NodeId> {
        let style = Style {
            display: Display::Flex,
            flex_direction: FlexDirection::Column,
            ..Default::default()
        };
        self.alloc(NodeContent::Element(kind.to_string()), style)
    }

    fn create_text(&mut self, text: &str) -> Result<NodeId> {
        self.alloc(NodeContent::Text(text.to_string()), Self::text_style(text))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        let parent_layout = self.layout_of(parent)?;
        let child_layout = self.layout_of(child)?;
        if self.creates_cycle(parent, child) {
            return Err(ViewError::InvalidDescriptor(format!(
                "cannot insert {:?} into its own subtree",
                child
            )));
        }

        self.detach(child);

        let index = {
            let p = self.nodes.get(&parent).ok_or(ViewError::UnknownNode(parent))?;
            reference
                .and_then(|r| p.children.iter().position(|c| *c == r))
                .unwrap_or(p.children.len())
        };

        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.insert(index, child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        self.taffy
            .insert_child_at_index(parent_layout, index, child_layout)
            .map_err(|e| ViewError::Layout(e.to_string()))?;
        self.layout_dirty = true;
        Ok(())
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get(&node).and_then(|n| n.parent) else { return };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != node);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = None;
        }
        if let (Ok(pl), Ok(cl)) = (self.layout_of(parent), self.layout_of(node)) {
            if let Err(e) = self.taffy.remove_child(pl, cl) {
                log::warn!("taffy remove_child failed: {}", e);
            }
        }
        self.layout_dirty = true;
    }

    fn discard(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.remove(&id) {
                stack.extend(n.children.iter().copied());
                if let Err(e) = self.taffy.remove(n.layout) {
                    log::warn!("taffy remove failed: {}", e);
                }
            }
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: JsonValue) {
        // 数值型 width/height 同步到布局
        match name {
            "width" | "height" => {
                if let Some(v) = value.as_f64() {
                    let v = v as f32;
                    let is_width = name == "width";
                    self.update_style(node, |s| {
                        if is_width { s.size.width = length(v) } else { s.size.height = length(v) }
                    });
                }
            }
            _ => {}
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.attrs.insert(name.to_string(), value);
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.attrs.remove(name);
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<JsonValue> {
        self.nodes.get(&node)?.attrs.get(name).cloned()
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(n) = self.nodes.get_mut(&node) else { return };
        if let NodeContent::Text(t) = &mut n.content {
            if t.as_str() != text {
                *t = text.to_string();
                let style = Self::text_style(text);
                self.update_style(node, |s| s.size = style.size);
            }
            return;
        }

        // 元素文本放在专用的首个文本子节点里，其余子节点（例如子视图）不受影响
        let current = n.text_child.filter(|t| self.nodes.get(t).and_then(|c| c.parent) == Some(node));
        if let Some(t) = current {
            self.set_text(t, text);
            return;
        }
        let first = self.nodes.get(&node).and_then(|n| n.children.first().copied());
        match self.create_text(text) {
            Ok(t) => match self.insert_before(node, t, first) {
                Ok(()) => {
                    if let Some(n) = self.nodes.get_mut(&node) {
                        n.text_child = Some(t);
                    }
                }
                Err(e) => log::warn!("set_text insert failed: {}", e),
            },
            Err(e) => log::warn!("set_text failed: {}", e),
        }
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.nodes.get(&node)?.content {
            NodeContent::Text(t) => Some(t.clone()),
            NodeContent::Element(_) => Some(self.text_content(node)),
        }
    }

    fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        let Some(n) = self.nodes.get_mut(&node) else { return };
        if n.hidden == hidden {
            return;
        }
        n.hidden = hidden;
        self.update_style(node, |s| {
            s.display = if hidden { Display::None } else { Display::Flex };
        });
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes.get(&node).map(|n| n.hidden).unwrap_or(false)
    }

    fn add_listener(&mut self, node: NodeId, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        if let Some(n) = self.nodes.get_mut(&node) {
            n.listeners.add(id, kind, listener);
        }
        id
    }

    fn remove_listener(&mut self, node: NodeId, id: ListenerId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.listeners.remove(id);
        }
    }

    fn fire(&self, node: NodeId, event: &Event) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            let Some(n) = self.nodes.get(&id) else { break };
            if n.listeners.dispatch(event) {
                return true;
            }
            cur = n.parent;
        }
        false
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes.get(&node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn bounds(&mut self, node: NodeId) -> Option<Rect> {
        if !self.is_within(node, self.root) {
            return None;
        }
        if let Err(e) = self.compute_layout() {
            log::warn!("{}", e);
            return None;
        }
        let mut x = 0.0;
        let mut y = 0.0;
        let mut size = None;
        let mut cur = Some(node);
        while let Some(id) = cur {
            let n = self.nodes.get(&id)?;
            let layout = self.taffy.layout(n.layout).ok()?;
            if size.is_none() {
                size = Some(layout.size);
            }
            x += layout.location.x;
            y += layout.location.y;
            cur = n.parent;
        }
        let size = size?;
        Some(Rect::new(x, y, size.width, size.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_before_and_detach() {
        let mut tree = RenderTree::new(320.0);
        let list = tree.create_node("ul").unwrap();
        let a = tree.create_text("a").unwrap();
        let b = tree.create_text("b").unwrap();
        tree.append_child(list, b).unwrap();
        tree.insert_before(list, a, Some(b)).unwrap();
        assert_eq!(tree.children(list), vec![a, b]);
        assert_eq!(tree.next_sibling(a), Some(b));

        tree.detach(a);
        assert_eq!(tree.children(list), vec![b]);
        assert_eq!(tree.parent(a), None);
    }

    #[test]
    fn test_cannot_insert_into_own_subtree() {
        let mut tree = RenderTree::new(320.0);
        let outer = tree.create_node("div").unwrap();
        let inner = tree.create_node("div").unwrap();
        tree.append_child(outer, inner).unwrap();
        assert!(tree.append_child(inner, outer).is_err());
    }

    #[test]
    fn test_bounds_stack_vertically() {
        let mut tree = RenderTree::new(320.0);
        let root = tree.root();
        let first = tree.create_node("li").unwrap();
        let second = tree.create_node("li").unwrap();
        tree.set_attribute(first, "height", JsonValue::from(30));
        tree.set_attribute(second, "height", JsonValue::from(30));
        tree.append_child(root, first).unwrap();
        tree.append_child(root, second).unwrap();

        let b1 = tree.bounds(first).unwrap();
        let b2 = tree.bounds(second).unwrap();
        assert_eq!(b1.y, 0.0);
        assert_eq!(b2.y, 30.0);
        assert_eq!(b2.mid_y(), 45.0);
    }

    #[test]
    fn test_hidden_text_is_skipped() {
        let mut tree = RenderTree::new(320.0);
        let div = tree.create_node("div").unwrap();
        let a = tree.create_text("shown").unwrap();
        let b = tree.create_text("gone").unwrap();
        tree.append_child(div, a).unwrap();
        tree.append_child(div, b).unwrap();
        tree.set_hidden(b, true);
        assert_eq!(tree.text_content(div), "shown");
    }

    #[test]
    fn test_discard_removes_subtree() {
        let mut tree = RenderTree::new(320.0);
        let div = tree.create_node("div").unwrap();
        let t = tree.create_text("x").unwrap();
        tree.append_child(div, t).unwrap();
        tree.append_child(tree.root(), div).unwrap();
        tree.discard(div);
        assert!(!tree.contains(div));
        assert!(!tree.contains(t));
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn test_element_text_keeps_other_children() {
        let mut tree = RenderTree::new(320.0);
        let div = tree.create_node("div").unwrap();
        let child = tree.create_node("span").unwrap();
        let inner = tree.create_text("x").unwrap();
        tree.append_child(child, inner).unwrap();
        tree.append_child(div, child).unwrap();

        tree.set_text(div, "head:");
        tree.set_text(div, "title:");
        assert!(tree.contains(child));
        assert_eq!(tree.children(div).len(), 2);
        assert_eq!(tree.children(div)[1], child);
        assert_eq!(tree.text_content(div), "title:x");
    }
}
