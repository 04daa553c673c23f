//! 拖拽重排
//!
//! 一次手势对应一个 `DragSession`：由 `drag_start` 创建，之后每个拖拽事件都显式带上它，
//! 由 `drag_end` 消耗。视图树同一时间只接受一个进行中的会话，
//! 带着过期会话到达的事件会被忽略。

use super::list::ListEvent;
use super::{OrderedContainer, ViewId, ViewTree};
use crate::error::{Result, ViewError};
use crate::event::Event;
use crate::geometry::Point;
use crate::render::{NodeId, RenderTarget};
use indexmap::IndexSet;
use serde_json::{json, Value as JsonValue};
use std::rc::Rc;
use std::time::Instant;

/// 插入占位节点的类型
pub const PLACEHOLDER_KIND: &str = "drop-placeholder";
const PLACEHOLDER_HEIGHT: f32 = 4.0;

/// 可拖拽能力
pub trait Draggable {
    fn is_draggable(&self) -> bool;
    fn drag_state(&self) -> &ItemDragState;
    fn drag_state_mut(&mut self) -> &mut ItemDragState;
}

impl Draggable for super::ItemState {
    fn is_draggable(&self) -> bool {
        self.draggable
    }

    fn drag_state(&self) -> &ItemDragState {
        &self.drag
    }

    fn drag_state_mut(&mut self) -> &mut ItemDragState {
        &mut self.drag
    }
}

/// 放置效果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropEffect {
    #[default]
    None,
    /// 插到目标之前
    Move,
    /// 插到目标之后
    MoveAfter,
    Copy,
}

impl DropEffect {
    pub fn accepts(&self) -> bool {
        !matches!(self, DropEffect::None)
    }

    pub fn is_reorder(&self) -> bool {
        matches!(self, DropEffect::Move | DropEffect::MoveAfter)
    }
}

/// 条目的拖拽反馈状态。进入/离开用计数而不是布尔值，
/// 子节点触发的嵌套进入离开事件不会让状态失步。
#[derive(Debug, Default)]
pub struct ItemDragState {
    enter_count: u32,
    accept: DropEffect,
    placeholder: Option<NodeId>,
}

impl ItemDragState {
    /// 返回是否从 idle 进入 entered
    pub fn enter(&mut self) -> bool {
        self.enter_count += 1;
        self.enter_count == 1
    }

    /// 返回是否回到 idle
    pub fn leave(&mut self) -> bool {
        if self.enter_count == 0 {
            return false;
        }
        self.enter_count -= 1;
        self.enter_count == 0
    }

    pub fn is_entered(&self) -> bool {
        self.enter_count > 0
    }

    pub fn enter_count(&self) -> u32 {
        self.enter_count
    }

    pub fn accept(&self) -> DropEffect {
        self.accept
    }

    pub fn placeholder(&self) -> Option<NodeId> {
        self.placeholder
    }

    pub(crate) fn reset(&mut self) -> Option<NodeId> {
        self.enter_count = 0;
        self.accept = DropEffect::None;
        self.placeholder.take()
    }
}

/// 拖拽载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    Single(ViewId),
    /// 按列表位置排序的选中条目
    Multiple(Vec<ViewId>),
}

impl DragPayload {
    pub fn items(&self) -> &[ViewId] {
        match self {
            DragPayload::Single(id) => std::slice::from_ref(id),
            DragPayload::Multiple(ids) => ids,
        }
    }

    pub fn contains(&self, item: ViewId) -> bool {
        self.items().contains(&item)
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }
}

/// 拖拽会话
#[derive(Debug)]
pub struct DragSession {
    id: u64,
    source_list: ViewId,
    origin: ViewId,
    payload: DragPayload,
    started_at: Instant,
}

impl DragSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source_list(&self) -> ViewId {
        self.source_list
    }

    /// 被按住拖动的条目
    pub fn origin(&self) -> ViewId {
        self.origin
    }

    pub fn payload(&self) -> &DragPayload {
        &self.payload
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

/// 放置目标描述，交给外部处理函数
#[derive(Debug, Clone)]
pub struct DropTarget {
    pub list: ViewId,
    /// None 表示列表空白处
    pub item: Option<ViewId>,
    pub source_list: ViewId,
    /// 按指针位置算出的前/后提示
    pub hint: DropEffect,
}

/// 外部（非重排）放置处理
pub trait DropHandler {
    fn drag_over(&self, payload: &DragPayload, target: &DropTarget) -> DropEffect;

    /// 返回是否接受了放置
    fn accept_drop(&self, payload: &DragPayload, target: &DropTarget) -> bool;
}

/// 视图树持有的进行中手势
#[derive(Debug)]
pub(crate) struct ActiveDrag {
    id: u64,
    source_list: ViewId,
    started_at: Instant,
    payload: Vec<ViewId>,
    /// 出现过反馈状态的条目，结束时统一清理
    touched: IndexSet<ViewId>,
}

enum Resolution {
    Reorder(DropEffect),
    External(DropEffect, Rc<dyn DropHandler>),
    Refused,
}

impl Resolution {
    fn effect(&self) -> DropEffect {
        match self {
            Resolution::Reorder(e) | Resolution::External(e, _) => *e,
            Resolution::Refused => DropEffect::None,
        }
    }
}

impl<T: RenderTarget> ViewTree<T> {
    pub fn is_dragging(&self) -> bool {
        self.active_drag.is_some()
    }

    fn is_current(&self, session: &DragSession) -> bool {
        let current = self.active_drag.as_ref().map_or(false, |a| a.id == session.id);
        if !current {
            log::warn!("ignoring drag event for stale session {}", session.id);
        }
        current
    }

    /// 开始拖拽。条目已选中时载荷为整个选择（按位置排序），否则只有该条目。
    pub fn drag_start(&mut self, item: ViewId, now: Instant) -> Result<DragSession> {
        if self.active_drag.is_some() {
            return Err(ViewError::DragInProgress);
        }
        let list = self.list_of(item).ok_or_else(|| {
            ViewError::InvalidState(format!("item {:?} does not belong to a list", item))
        })?;
        let draggable = self
            .views
            .get(&item)
            .and_then(|v| v.role.item())
            .map_or(false, |i| i.is_draggable());
        if !draggable {
            return Err(ViewError::InvalidState(format!("item {:?} is not draggable", item)));
        }

        let payload = {
            let state = self.list_state(list)?;
            if state.selection.is_selected(item) {
                state.selection.selected_in_order(state.items.items())
            } else {
                vec![item]
            }
        };
        for id in &payload {
            if let Some(node) = self.live_node(*id) {
                self.target.set_attribute(node, "dragging", JsonValue::Bool(true));
            }
        }

        let id = self.next_session;
        self.next_session += 1;
        self.active_drag = Some(ActiveDrag {
            id,
            source_list: list,
            started_at: now,
            payload: payload.clone(),
            touched: IndexSet::new(),
        });
        log::debug!("drag session {} started from {:?} with {} item(s)", id, list, payload.len());

        let payload = if payload.len() == 1 {
            DragPayload::Single(payload[0])
        } else {
            DragPayload::Multiple(payload)
        };
        Ok(DragSession { id, source_list: list, origin: item, payload, started_at: now })
    }

    pub fn drag_enter(&mut self, session: &DragSession, item: ViewId) -> Result<()> {
        if !self.is_current(session) {
            return Ok(());
        }
        self.touch(item);
        if let Some(state) = self.item_state_mut(item) {
            if state.drag.enter() {
                log::trace!("drag entered {:?}", item);
            }
        }
        Ok(())
    }

    pub fn drag_leave(&mut self, session: &DragSession, item: ViewId) -> Result<()> {
        if !self.is_current(session) {
            return Ok(());
        }
        let idle = self.item_state_mut(item).map_or(false, |s| s.drag.leave());
        if idle {
            log::trace!("drag left {:?}", item);
            self.clear_drag_feedback(item);
        }
        Ok(())
    }

    /// 指针在条目上移动，返回条目当前接受的效果
    pub fn drag_over(&mut self, session: &DragSession, item: ViewId, pointer: Point) -> Result<DropEffect> {
        if !self.is_current(session) {
            return Ok(DropEffect::None);
        }
        let Some(list) = self.list_of(item) else { return Ok(DropEffect::None) };
        self.touch(item);
        if let Some(state) = self.item_state_mut(item) {
            if !state.drag.is_entered() {
                state.drag.enter();
            }
        }
        let (resolution, _) = self.resolve(session, list, Some(item), pointer)?;
        let effect = resolution.effect();
        self.update_feedback(item, effect)?;
        Ok(effect)
    }

    /// 在条目上放下。返回是否接受。
    pub fn drop_on_item(&mut self, session: &DragSession, item: ViewId, pointer: Point) -> Result<bool> {
        if !self.is_current(session) {
            return Ok(false);
        }
        let Some(list) = self.list_of(item) else { return Ok(false) };
        let (resolution, target) = self.resolve(session, list, Some(item), pointer)?;
        self.clear_drag_feedback(item);
        self.finish_drop(session, resolution, target)
    }

    /// 指针在列表空白处移动
    pub fn drag_over_list(&mut self, session: &DragSession, list: ViewId, pointer: Point) -> Result<DropEffect> {
        if !self.is_current(session) {
            return Ok(DropEffect::None);
        }
        let (resolution, _) = self.resolve(session, list, None, pointer)?;
        Ok(resolution.effect())
    }

    /// 在列表空白处放下，重排时追加到末尾
    pub fn drop_on_list(&mut self, session: &DragSession, list: ViewId, pointer: Point) -> Result<bool> {
        if !self.is_current(session) {
            return Ok(false);
        }
        let (resolution, target) = self.resolve(session, list, None, pointer)?;
        self.finish_drop(session, resolution, target)
    }

    /// 结束手势。无论是否放下都会清理占位节点、计数和会话。
    pub fn drag_end(&mut self, session: DragSession) {
        match self.active_drag.take() {
            Some(active) if active.id == session.id => {
                log::debug!("drag session {} ended", session.id);
                self.cleanup_drag(active);
            }
            other => {
                self.active_drag = other;
                log::warn!("drag end for stale session {}", session.id);
            }
        }
    }

    /// 超时保护：会话超过配置时长仍未结束时强制清理。返回是否清理了会话。
    pub fn tick(&mut self, now: Instant) -> bool {
        let failsafe = self.config.drag.failsafe();
        let expired = self
            .active_drag
            .as_ref()
            .map_or(false, |a| now.saturating_duration_since(a.started_at) >= failsafe);
        if !expired {
            return false;
        }
        let Some(active) = self.active_drag.take() else { return false };
        log::warn!("drag session {} expired after {:?} without drag end", active.id, failsafe);
        let list = active.source_list;
        self.cleanup_drag(active);
        self.emit(ListEvent::DragExpired { list });
        true
    }

    /// 把拖拽事件路由到节点所在的条目或列表
    pub fn dispatch_drag(&mut self, session: &DragSession, node: NodeId, event: &Event) -> Result<bool> {
        if self.target.fire(node, event) {
            return Ok(true);
        }
        let pointer = match event {
            Event::DragEnter(e) | Event::DragOver(e) | Event::DragLeave(e) | Event::Drop(e) => e.position(),
            _ => return Ok(false),
        };
        if let Some(item) = self.enclosing_item(node) {
            return match event {
                Event::DragEnter(_) => self.drag_enter(session, item).map(|_| true),
                Event::DragLeave(_) => self.drag_leave(session, item).map(|_| true),
                Event::DragOver(_) => Ok(self.drag_over(session, item, pointer)?.accepts()),
                _ => self.drop_on_item(session, item, pointer),
            };
        }
        match (event, self.enclosing_list(node)) {
            (Event::DragOver(_), Some(list)) => Ok(self.drag_over_list(session, list, pointer)?.accepts()),
            (Event::Drop(_), Some(list)) => self.drop_on_list(session, list, pointer),
            _ => Ok(false),
        }
    }

    fn touch(&mut self, item: ViewId) {
        if let Some(active) = self.active_drag.as_mut() {
            active.touched.insert(item);
        }
    }

    /// 同列表且可重排时自己决定，否则交给条目处理函数，再交给列表处理函数
    fn resolve(
        &mut self,
        session: &DragSession,
        list: ViewId,
        item: Option<ViewId>,
        pointer: Point,
    ) -> Result<(Resolution, DropTarget)> {
        let hint = match item {
            Some(item) => self.midpoint_hint(item, pointer),
            None => DropEffect::MoveAfter,
        };
        let target = DropTarget { list, item, source_list: session.source_list, hint };

        let reorderable = list == session.source_list && self.list_state(list)?.options.reorderable;
        let resolution = if reorderable {
            if item.map_or(false, |i| session.payload.contains(i)) {
                Resolution::Refused
            } else {
                Resolution::Reorder(hint)
            }
        } else {
            let handler = item
                .and_then(|i| self.views.get(&i))
                .and_then(|v| v.role.item())
                .and_then(|i| i.drop_handler.clone())
                .or_else(|| self.list_state(list).ok().and_then(|l| l.drop_handler.clone()));
            match handler {
                Some(handler) => {
                    let effect = handler.drag_over(&session.payload, &target);
                    if effect.accepts() {
                        Resolution::External(effect, handler)
                    } else {
                        Resolution::Refused
                    }
                }
                None => Resolution::Refused,
            }
        };
        Ok((resolution, target))
    }

    /// 指针在条目上半部分为之前，下半部分为之后
    fn midpoint_hint(&mut self, item: ViewId, pointer: Point) -> DropEffect {
        let bounds = self.live_node(item).and_then(|node| self.target.bounds(node));
        match bounds {
            Some(rect) if pointer.y >= rect.mid_y() => DropEffect::MoveAfter,
            _ => DropEffect::Move,
        }
    }

    fn finish_drop(&mut self, session: &DragSession, resolution: Resolution, target: DropTarget) -> Result<bool> {
        let effect = resolution.effect();
        let accepted = match resolution {
            Resolution::Refused => false,
            Resolution::Reorder(effect) => {
                let position = match target.item {
                    Some(item) => {
                        let pos = self
                            .position(item)
                            .ok_or(ViewError::NotAMember { container: target.list, child: item })?;
                        if effect == DropEffect::MoveAfter { pos + 1 } else { pos }
                    }
                    None => self.list_state(target.list)?.items.len(),
                };
                self.reorder(target.list, session.payload.items(), position)?;
                true
            }
            Resolution::External(_, handler) => handler.accept_drop(&session.payload, &target),
        };
        if accepted {
            self.emit(ListEvent::Dropped {
                list: target.list,
                target: target.item,
                payload: session.payload.clone(),
                effect,
            });
        }
        Ok(accepted)
    }

    /// 按原相对顺序把载荷插到目标位置。每移走一个原本在目标之前的条目，插入位置减一。
    fn reorder(&mut self, list: ViewId, payload: &[ViewId], position: usize) -> Result<()> {
        let mut insert_at = position;
        for &item in payload {
            if self.parent(item) != Some(list) {
                // 拖拽期间被移出列表
                continue;
            }
            let Some(from) = self.position(item) else { continue };
            if from < insert_at {
                insert_at -= 1;
            }
            self.move_item(list, item, insert_at)?;
            insert_at += 1;
        }
        log::debug!("reordered {} item(s) in {:?} at {}", payload.len(), list, position);
        Ok(())
    }

    /// 接受状态变化时重建占位节点
    fn update_feedback(&mut self, item: ViewId, effect: DropEffect) -> Result<()> {
        let old = match self.item_state_mut(item) {
            Some(state) if state.drag.accept != effect => {
                state.drag.accept = effect;
                state.drag.placeholder.take()
            }
            _ => return Ok(()),
        };
        if let Some(placeholder) = old {
            self.target.discard(placeholder);
        }
        log::trace!("drop feedback on {:?} is now {:?}", item, effect);

        if !effect.is_reorder() {
            return Ok(());
        }
        let Some(node) = self.live_node(item) else { return Ok(()) };
        let Some(parent) = self.target.parent(node) else { return Ok(()) };
        let reference = if effect == DropEffect::Move { Some(node) } else { self.target.next_sibling(node) };

        let placeholder = self.target.create_node(PLACEHOLDER_KIND)?;
        self.target.set_attribute(placeholder, "height", json!(PLACEHOLDER_HEIGHT));
        self.target.insert_before(parent, placeholder, reference)?;
        if let Some(state) = self.item_state_mut(item) {
            state.drag.placeholder = Some(placeholder);
        }
        Ok(())
    }

    /// 清除条目的拖拽反馈
    pub(crate) fn clear_drag_feedback(&mut self, item: ViewId) {
        let placeholder = self.item_state_mut(item).and_then(|s| s.drag.reset());
        if let Some(placeholder) = placeholder {
            self.target.discard(placeholder);
        }
    }

    fn cleanup_drag(&mut self, active: ActiveDrag) {
        for item in active.touched {
            self.clear_drag_feedback(item);
        }
        for item in active.payload {
            if let Some(node) = self.live_node(item) {
                self.target.remove_attribute(node, "dragging");
            }
        }
    }
}
