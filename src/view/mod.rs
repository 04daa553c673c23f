//! 视图系统
//!
//! `ViewTree` 持有渲染目标和全部视图。视图在第一次需要活节点时才物化，
//! 之后通过 `refresh` 重放更新动作，不会重新物化。
//!
//! 视图的能力由 `Role` 决定，而不是继承链：
//! - `Leaf`：只有自己的节点
//! - `Container`：有序子视图（`OrderedContainer`）
//! - `List`：子视图 + 选择 + 拖拽协调
//! - `Item`：可选中（`Selectable`）、可拖拽（`Draggable`）的列表项

pub mod container;
pub mod drag;
pub mod list;
pub mod selection;

pub use container::{remove_at, ChildList, OrderedContainer};
pub use drag::{DragPayload, DragSession, Draggable, DropEffect, DropHandler, DropTarget, ItemDragState};
pub use list::{ContextMenuHandler, ItemState, ListEvent, ListState};
pub use selection::{Selectable, SelectionChange, SelectionHelper};

use crate::config::{ListOptions, TreeConfig};
use crate::descriptor::{Child, Descriptor};
use crate::error::{Result, ViewError};
use crate::materialize::{materialize, MaterializeHost, StateHandle, UpdateContext};
use crate::render::{NodeId, RenderTarget, RenderTree};
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// 视图 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

/// 可物化的视图主体
pub trait Materializable {
    /// 给出视图的描述符，动态部分应使用绑定而不是直接读取状态
    fn describe(&self, state: &JsonValue) -> Descriptor;

    /// 第一次物化完成后调用一次
    fn on_created(&mut self, _node: NodeId, _ctx: &UpdateContext, _target: &mut dyn RenderTarget) {}
}

impl<F> Materializable for F
where
    F: Fn(&JsonValue) -> Descriptor,
{
    fn describe(&self, state: &JsonValue) -> Descriptor {
        self(state)
    }
}

/// 视图能力
pub enum Role {
    Leaf,
    Container(ChildList),
    List(ListState),
    Item(ItemState),
}

impl Role {
    pub fn container(&self) -> Option<&dyn OrderedContainer> {
        match self {
            Role::Container(c) => Some(c),
            Role::List(l) => Some(l),
            _ => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut ChildList> {
        match self {
            Role::Container(c) => Some(c),
            Role::List(l) => Some(&mut l.items),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&ListState> {
        match self {
            Role::List(l) => Some(l),
            _ => None,
        }
    }

    pub(crate) fn list_mut(&mut self) -> Option<&mut ListState> {
        match self {
            Role::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn item(&self) -> Option<&ItemState> {
        match self {
            Role::Item(i) => Some(i),
            _ => None,
        }
    }

    pub(crate) fn item_mut(&mut self) -> Option<&mut ItemState> {
        match self {
            Role::Item(i) => Some(i),
            _ => None,
        }
    }
}

/// 视图：包装且只包装一个活节点
pub struct View {
    id: ViewId,
    body: Box<dyn Materializable>,
    role: Role,
    state: StateHandle,
    live: Option<NodeId>,
    ctx: Option<UpdateContext>,
    parent: Option<ViewId>,
    position: Option<usize>,
    created: bool,
}

impl View {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn live_node(&self) -> Option<NodeId> {
        self.live
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn context(&self) -> Option<&UpdateContext> {
        self.ctx.as_ref()
    }
}

/// 视图树
pub struct ViewTree<T: RenderTarget = RenderTree> {
    target: T,
    views: HashMap<ViewId, View>,
    /// 视图根节点 -> 视图
    owners: HashMap<NodeId, ViewId>,
    /// 正在物化的视图，防止视图把自己嵌进自己的描述符
    materializing: HashSet<ViewId>,
    next_id: u64,
    config: TreeConfig,
    events: Vec<ListEvent>,
    pub(crate) active_drag: Option<drag::ActiveDrag>,
    pub(crate) next_session: u64,
}

impl ViewTree<RenderTree> {
    pub fn new(config: TreeConfig) -> Self {
        let target = RenderTree::new(config.viewport_width);
        Self::with_target(target, config)
    }

    /// 物化并挂到渲染树根节点下
    pub fn mount(&mut self, id: ViewId) -> Result<NodeId> {
        let root = self.target.root();
        self.mount_into(id, root)
    }
}

impl Default for ViewTree<RenderTree> {
    fn default() -> Self {
        Self::new(TreeConfig::default())
    }
}

impl<T: RenderTarget> ViewTree<T> {
    pub fn with_target(target: T, config: TreeConfig) -> Self {
        Self {
            target,
            views: HashMap::new(),
            owners: HashMap::new(),
            materializing: HashSet::new(),
            next_id: 1,
            config,
            events: Vec::new(),
            active_drag: None,
            next_session: 1,
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub(crate) fn view_ref(&self, id: ViewId) -> Result<&View> {
        self.views.get(&id).ok_or(ViewError::UnknownView(id))
    }

    pub(crate) fn view_mut(&mut self, id: ViewId) -> Result<&mut View> {
        self.views.get_mut(&id).ok_or(ViewError::UnknownView(id))
    }

    /// 添加叶子视图（未物化）
    pub fn add(&mut self, body: impl Materializable + 'static, state: JsonValue) -> Result<ViewId> {
        self.add_with_role(Box::new(body), Role::Leaf, state)
    }

    pub fn add_container(&mut self, body: impl Materializable + 'static, state: JsonValue) -> Result<ViewId> {
        self.add_with_role(Box::new(body), Role::Container(ChildList::new()), state)
    }

    /// 列表状态里的 `empty` 字段由视图树维护
    pub fn add_list(&mut self, body: impl Materializable + 'static, state: JsonValue, options: ListOptions) -> Result<ViewId> {
        let id = self.add_with_role(Box::new(body), Role::List(ListState::new(options)), state)?;
        self.sync_empty_flag(id)?;
        Ok(id)
    }

    pub fn add_item(&mut self, body: impl Materializable + 'static, state: JsonValue) -> Result<ViewId> {
        self.add_with_role(Box::new(body), Role::Item(ItemState::new()), state)
    }

    pub fn add_with_role(&mut self, body: Box<dyn Materializable>, role: Role, state: JsonValue) -> Result<ViewId> {
        if !state.is_object() {
            return Err(ViewError::InvalidState(format!("view state must be an object, got {}", state)));
        }
        let id = ViewId(self.next_id);
        self.next_id += 1;
        self.views.insert(id, View {
            id,
            body,
            role,
            state: Rc::new(RefCell::new(state)),
            live: None,
            ctx: None,
            parent: None,
            position: None,
            created: false,
        });
        Ok(id)
    }

    pub fn live_node(&self, id: ViewId) -> Option<NodeId> {
        self.views.get(&id).and_then(|v| v.live)
    }

    pub fn state(&self, id: ViewId) -> Result<JsonValue> {
        Ok(self.view_ref(id)?.state.borrow().clone())
    }

    pub fn context(&self, id: ViewId) -> Option<UpdateContext> {
        self.views.get(&id).and_then(|v| v.ctx.clone())
    }

    /// 视图的命名节点
    pub fn named_node(&self, id: ViewId, name: &str) -> Option<NodeId> {
        self.views.get(&id)?.ctx.as_ref()?.get(name)
    }

    /// 节点所属的最近视图
    pub fn owner_of(&self, node: NodeId) -> Option<ViewId> {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if let Some(v) = self.owners.get(&n) {
                return Some(*v);
            }
            cur = self.target.parent(n);
        }
        None
    }

    /// 取出累积的列表事件
    pub fn take_events(&mut self) -> Vec<ListEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: ListEvent) {
        self.events.push(event);
    }

    /// 确保视图已物化，返回其活节点。重复调用不做任何事。
    pub fn ensure_live(&mut self, id: ViewId) -> Result<NodeId> {
        if let Some(node) = self.view_ref(id)?.live {
            return Ok(node);
        }
        if !self.materializing.insert(id) {
            return Err(ViewError::RanOutOfBudget);
        }
        let result = self.materialize_view(id);
        self.materializing.remove(&id);
        result
    }

    fn materialize_view(&mut self, id: ViewId) -> Result<NodeId> {
        let (descriptor, state) = {
            let view = self.view_ref(id)?;
            let descriptor = view.body.describe(&view.state.borrow());
            (descriptor, view.state.clone())
        };

        let ctx = UpdateContext::new(state);
        let ttl = self.config.ttl;
        let node = materialize(self, &Child::Node(descriptor), &ctx, ttl)?;
        self.owners.insert(node, id);

        let (children, selected, parent) = {
            let view = self.view_mut(id)?;
            view.live = Some(node);
            view.ctx = Some(ctx.clone());
            let children = view.role.container().map(|c| c.items().to_vec()).unwrap_or_default();
            (children, view.role.item().map(|i| i.is_selected()), view.parent)
        };

        if let Some(selected) = selected {
            self.target.set_attribute(node, "selected", JsonValue::from(selected));
        }

        // 容器物化时子视图一并就位
        for child in children {
            if self.live_node(child).is_some() {
                self.place_child(id, child)?;
            } else {
                self.ensure_live(child)?;
            }
        }

        if let Some(view) = self.views.get_mut(&id) {
            if !view.created {
                view.created = true;
                view.body.on_created(node, &ctx, &mut self.target);
            }
        }
        ctx.refresh(&mut self.target);

        if let Some(parent) = parent {
            self.place_child(parent, id)?;
        }
        log::debug!("materialized view {:?} as node {:?} ({} actions)", id, node, ctx.len());
        Ok(node)
    }

    /// 重放更新动作，不重新物化；未物化的视图什么也不做
    pub fn refresh(&mut self, id: ViewId) -> Result<()> {
        if let Some(ctx) = self.view_ref(id)?.ctx.clone() {
            ctx.refresh(&mut self.target);
        }
        Ok(())
    }

    /// 合并字段到视图状态后刷新
    pub fn update_with(&mut self, id: ViewId, partial: JsonValue) -> Result<()> {
        let JsonValue::Object(fields) = partial else {
            return Err(ViewError::InvalidState(format!("partial state must be an object, got {}", partial)));
        };
        {
            let view = self.view_ref(id)?;
            let mut state = view.state.borrow_mut();
            if let Some(obj) = state.as_object_mut() {
                obj.extend(fields);
            }
        }
        self.refresh(id)
    }

    /// 物化并挂到指定节点下
    pub fn mount_into(&mut self, id: ViewId, parent: NodeId) -> Result<NodeId> {
        let node = self.ensure_live(id)?;
        self.target.append_child(parent, node)?;
        Ok(node)
    }

    /// 销毁视图及其所有子视图
    pub fn dispose(&mut self, id: ViewId) -> Result<()> {
        if let Some(parent) = self.view_ref(id)?.parent {
            self.remove(parent, id)?;
        }
        let children = self.view_ref(id)?.role.container().map(|c| c.items().to_vec()).unwrap_or_default();
        for child in children.into_iter().rev() {
            self.dispose(child)?;
        }
        let view = self.views.remove(&id).ok_or(ViewError::UnknownView(id))?;
        if let Some(node) = view.live {
            self.owners.remove(&node);
            self.target.discard(node);
        }
        if let Some(ctx) = view.ctx {
            ctx.clear();
        }
        Ok(())
    }

    /// 容器放置子节点的位置：登记为 "content" 的节点，没有则为根节点
    pub(crate) fn content_node(&self, id: ViewId) -> Option<NodeId> {
        let view = self.views.get(&id)?;
        let live = view.live?;
        Some(view.ctx.as_ref().and_then(|c| c.get("content")).unwrap_or(live))
    }

    /// 把已物化的子视图放到容器活节点中，位置对齐到下一个已物化的兄弟之前
    pub(crate) fn place_child(&mut self, container: ViewId, child: ViewId) -> Result<()> {
        let Some(content) = self.content_node(container) else { return Ok(()) };
        let Some(node) = self.live_node(child) else { return Ok(()) };

        let reference = {
            let parent = self.view_ref(container)?;
            let items = parent.role.container().ok_or(ViewError::NotAContainer(container))?.items();
            let position = self
                .view_ref(child)?
                .position
                .ok_or(ViewError::NotAMember { container, child })?;
            items
                .get(position + 1..)
                .unwrap_or(&[])
                .iter()
                .find_map(|s| self.views.get(s).and_then(|v| v.live))
        };
        self.target.insert_before(content, node, reference)
    }
}

impl<T: RenderTarget> MaterializeHost for ViewTree<T> {
    fn target(&mut self) -> &mut dyn RenderTarget {
        &mut self.target
    }

    fn view_node(&mut self, view: ViewId) -> Result<NodeId> {
        self.ensure_live(view)
    }
}
