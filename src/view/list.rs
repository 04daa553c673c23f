//! 列表视图
//!
//! 列表 = 容器 + 选择 + 拖拽协调。条目点击先交给选择辅助处理，
//! 未处理时才发出 `ItemClicked`。回调不直接挂在视图上，
//! 而是以 `ListEvent` 累积在视图树里，由调用方 `take_events` 取走。

use super::drag::{DragPayload, DropEffect, DropHandler, ItemDragState};
use super::selection::{Selectable, SelectionChange, SelectionHelper};
use super::{ChildList, OrderedContainer, Role, ViewId, ViewTree};
use crate::config::ListOptions;
use crate::error::{Result, ViewError};
use crate::event::{Event, Key, KeyEvent, Modifiers, PointerEvent};
use crate::render::{NodeId, RenderTarget};
use serde_json::Value as JsonValue;
use std::rc::Rc;

/// 右键菜单处理函数，返回 true 表示已处理
pub type ContextMenuHandler = Rc<dyn Fn(ViewId, &PointerEvent) -> bool>;

/// 列表发出的通知
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    Selected { list: ViewId, item: ViewId },
    Deselected { list: ViewId, item: ViewId },
    /// 选择辅助未处理的点击
    ItemClicked { list: ViewId, item: ViewId },
    /// Enter 激活焦点条目
    ItemActivated { list: ViewId, item: ViewId },
    FocusMoved { list: ViewId, item: ViewId },
    Moved { list: ViewId, item: ViewId, from: usize, to: usize },
    /// 没有处理函数接手的右键菜单
    ContextMenu { list: ViewId, item: ViewId },
    Dropped { list: ViewId, target: Option<ViewId>, payload: DragPayload, effect: DropEffect },
    /// 拖拽超时被强制结束
    DragExpired { list: ViewId },
}

/// 列表状态
pub struct ListState {
    pub(crate) items: ChildList,
    pub(crate) selection: SelectionHelper,
    pub(crate) options: ListOptions,
    pub(crate) focused: Option<ViewId>,
    pub(crate) drop_handler: Option<Rc<dyn DropHandler>>,
    pub(crate) context_menu: Option<ContextMenuHandler>,
}

impl ListState {
    pub fn new(options: ListOptions) -> Self {
        let selection = SelectionHelper::new(options.selection_enabled)
            .with_ctrl_forces_selection(options.ctrl_forces_selection);
        Self {
            items: ChildList::new(),
            selection,
            options,
            focused: None,
            drop_handler: None,
            context_menu: None,
        }
    }

    pub fn selection(&self) -> &SelectionHelper {
        &self.selection
    }

    pub fn options(&self) -> &ListOptions {
        &self.options
    }

    pub fn focused(&self) -> Option<ViewId> {
        self.focused
    }
}

impl OrderedContainer for ListState {
    fn items(&self) -> &[ViewId] {
        self.items.items()
    }
}

/// 列表条目状态
pub struct ItemState {
    selected: bool,
    pub(crate) draggable: bool,
    pub(crate) drag: ItemDragState,
    pub(crate) drop_handler: Option<Rc<dyn DropHandler>>,
    pub(crate) context_menu: Option<ContextMenuHandler>,
}

impl ItemState {
    pub fn new() -> Self {
        Self {
            selected: false,
            draggable: true,
            drag: ItemDragState::default(),
            drop_handler: None,
            context_menu: None,
        }
    }

    pub fn with_draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }
}

impl Default for ItemState {
    fn default() -> Self {
        Self::new()
    }
}

impl Selectable for ItemState {
    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl<T: RenderTarget> ViewTree<T> {
    pub(crate) fn list_state(&self, list: ViewId) -> Result<&ListState> {
        self.view_ref(list)?.role.list().ok_or(ViewError::NotAContainer(list))
    }

    pub(crate) fn list_state_mut(&mut self, list: ViewId) -> Result<&mut ListState> {
        self.view_mut(list)?.role.list_mut().ok_or(ViewError::NotAContainer(list))
    }

    pub(crate) fn item_state_mut(&mut self, item: ViewId) -> Option<&mut ItemState> {
        self.views.get_mut(&item).and_then(|v| v.role.item_mut())
    }

    /// 列表状态里的 `empty` 字段跟随条目数量，已物化时刷新
    pub(crate) fn sync_empty_flag(&mut self, list: ViewId) -> Result<()> {
        let Some(view) = self.views.get(&list) else { return Ok(()) };
        let Some(state) = view.role.list() else { return Ok(()) };
        let empty = state.items.is_empty();
        let changed = {
            let mut data = view.state.borrow_mut();
            match data.as_object_mut() {
                Some(obj) if obj.get("empty") != Some(&JsonValue::Bool(empty)) => {
                    obj.insert("empty".to_string(), JsonValue::Bool(empty));
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.refresh(list)?;
        }
        Ok(())
    }

    /// 条目所在的列表
    pub fn list_of(&self, item: ViewId) -> Option<ViewId> {
        let parent = self.parent(item)?;
        self.views.get(&parent)?.role.list().map(|_| parent)
    }

    /// 节点所在的最近列表条目
    pub fn enclosing_item(&self, node: NodeId) -> Option<ViewId> {
        self.enclosing(node, |tree, view| {
            tree.views.get(&view).map_or(false, |v| v.role.item().is_some()) && tree.list_of(view).is_some()
        })
    }

    /// 节点所在的最近列表
    pub fn enclosing_list(&self, node: NodeId) -> Option<ViewId> {
        self.enclosing(node, |tree, view| tree.views.get(&view).map_or(false, |v| v.role.list().is_some()))
    }

    fn enclosing(&self, node: NodeId, accept: impl Fn(&Self, ViewId) -> bool) -> Option<ViewId> {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if let Some(&view) = self.owners.get(&n) {
                if accept(self, view) {
                    return Some(view);
                }
            }
            cur = self.target.parent(n);
        }
        None
    }

    pub fn set_drop_handler(&mut self, view: ViewId, handler: Rc<dyn DropHandler>) -> Result<()> {
        match &mut self.view_mut(view)?.role {
            Role::List(l) => l.drop_handler = Some(handler),
            Role::Item(i) => i.drop_handler = Some(handler),
            _ => return Err(ViewError::InvalidState(format!("view {:?} is neither a list nor an item", view))),
        }
        Ok(())
    }

    pub fn set_context_menu_handler(&mut self, view: ViewId, handler: ContextMenuHandler) -> Result<()> {
        match &mut self.view_mut(view)?.role {
            Role::List(l) => l.context_menu = Some(handler),
            Role::Item(i) => i.context_menu = Some(handler),
            _ => return Err(ViewError::InvalidState(format!("view {:?} is neither a list nor an item", view))),
        }
        Ok(())
    }

    pub fn is_selected(&self, item: ViewId) -> bool {
        self.views
            .get(&item)
            .and_then(|v| v.role.item())
            .map_or(false, |i| i.is_selected())
    }

    /// 按列表顺序返回选中条目
    pub fn selected_items(&self, list: ViewId) -> Result<Vec<ViewId>> {
        let state = self.list_state(list)?;
        Ok(state.selection.selected_in_order(state.items.items()))
    }

    /// 切换（或强制）条目选中状态，返回是否发生变化
    pub fn toggle_item_selection(&mut self, item: ViewId, force: Option<bool>) -> Result<bool> {
        let list = self.list_of(item).ok_or_else(|| {
            ViewError::InvalidState(format!("item {:?} does not belong to a list", item))
        })?;
        let change = self.list_state_mut(list)?.selection.toggle_item_selection(item, force);
        let changed = change.is_some();
        self.apply_selection_changes(list, change.into_iter().collect());
        Ok(changed)
    }

    pub fn set_selection_enabled(&mut self, list: ViewId, enabled: bool) -> Result<()> {
        let changes = self.list_state_mut(list)?.selection.set_enabled(enabled);
        self.apply_selection_changes(list, changes);
        Ok(())
    }

    pub fn select_all(&mut self, list: ViewId) -> Result<()> {
        let state = self.list_state_mut(list)?;
        let changes = state.selection.select_all(state.items.items());
        self.apply_selection_changes(list, changes);
        Ok(())
    }

    pub fn clear_selection(&mut self, list: ViewId) -> Result<()> {
        let changes = self.list_state_mut(list)?.selection.clear();
        self.apply_selection_changes(list, changes);
        Ok(())
    }

    /// 条目点击：选择辅助优先，未处理时发出 `ItemClicked`
    pub fn handle_item_click(&mut self, item: ViewId, modifiers: Modifiers) -> Result<bool> {
        let Some(list) = self.list_of(item) else { return Ok(false) };
        let state = self.list_state_mut(list)?;
        let (handled, changes) = state.selection.handle_item_clicked(item, state.items.items(), modifiers);
        self.apply_selection_changes(list, changes);
        if !handled {
            self.emit(ListEvent::ItemClicked { list, item });
        }
        self.focus_item(list, item)?;
        Ok(handled)
    }

    /// 列表键盘导航
    pub fn handle_key(&mut self, list: ViewId, key: &KeyEvent) -> Result<bool> {
        let (items, focused, page, selection_enabled) = {
            let state = self.list_state(list)?;
            (
                state.items.items().to_vec(),
                state.focused,
                state.options.page_size.max(1),
                state.selection.is_enabled(),
            )
        };
        if items.is_empty() {
            return Ok(false);
        }
        let current = focused.and_then(|f| items.iter().position(|i| *i == f));
        let last = items.len() - 1;

        let next = match key.key {
            Key::Enter => {
                return match focused {
                    Some(item) => {
                        self.emit(ListEvent::ItemActivated { list, item });
                        Ok(true)
                    }
                    None => Ok(false),
                };
            }
            Key::Char(c) if key.modifiers.ctrl_or_meta() && c.eq_ignore_ascii_case(&'a') => {
                if !selection_enabled {
                    return Ok(false);
                }
                self.select_all(list)?;
                return Ok(true);
            }
            Key::ArrowDown => current.map_or(0, |i| (i + 1).min(last)),
            Key::ArrowUp => current.map_or(last, |i| i.saturating_sub(1)),
            Key::PageDown => current.map_or(0, |i| (i + page).min(last)),
            Key::PageUp => current.map_or(0, |i| i.saturating_sub(page)),
            Key::Home => 0,
            Key::End => last,
            _ => return Ok(false),
        };
        self.focus_item(list, items[next])?;
        Ok(true)
    }

    /// 设置焦点条目，并同步 "focused" 属性
    pub fn focus_item(&mut self, list: ViewId, item: ViewId) -> Result<()> {
        let previous = {
            let state = self.list_state_mut(list)?;
            if state.items.index_of(item).is_none() {
                return Err(ViewError::NotAMember { container: list, child: item });
            }
            state.focused.replace(item)
        };
        if previous == Some(item) {
            return Ok(());
        }
        if let Some(node) = previous.and_then(|p| self.live_node(p)) {
            self.target.remove_attribute(node, "focused");
        }
        if let Some(node) = self.live_node(item) {
            self.target.set_attribute(node, "focused", JsonValue::Bool(true));
        }
        self.emit(ListEvent::FocusMoved { list, item });
        Ok(())
    }

    /// 右键菜单：条目处理函数优先，其次列表处理函数，都没有时发出事件
    pub fn handle_context_menu(&mut self, item: ViewId, event: &PointerEvent) -> Result<bool> {
        let Some(list) = self.list_of(item) else { return Ok(false) };
        let handler = self
            .views
            .get(&item)
            .and_then(|v| v.role.item())
            .and_then(|i| i.context_menu.clone())
            .or_else(|| self.list_state(list).ok().and_then(|l| l.context_menu.clone()));
        match handler {
            Some(handler) => Ok(handler(item, event)),
            None => {
                self.emit(ListEvent::ContextMenu { list, item });
                Ok(false)
            }
        }
    }

    /// 移动条目：先移除再插入，期间不取消选中
    pub fn move_item(&mut self, list: ViewId, item: ViewId, new_position: usize) -> Result<usize> {
        let from = self
            .list_state(list)?
            .items
            .index_of(item)
            .ok_or(ViewError::NotAMember { container: list, child: item })?;
        self.detach_child(list, from, false)?;
        let to = self.insert(list, item, Some(new_position))?;
        if from != to {
            log::debug!("moved {:?} in {:?} from {} to {}", item, list, from, to);
            self.emit(ListEvent::Moved { list, item, from, to });
        }
        Ok(to)
    }

    /// 把输入事件路由到节点监听器，未处理时再交给所属列表
    pub fn dispatch(&mut self, node: NodeId, event: &Event) -> Result<bool> {
        if self.target.fire(node, event) {
            return Ok(true);
        }
        match event {
            Event::Click(pointer) => match self.enclosing_item(node) {
                Some(item) => self.handle_item_click(item, pointer.modifiers),
                None => Ok(false),
            },
            Event::ContextMenu(pointer) => match self.enclosing_item(node) {
                Some(item) => self.handle_context_menu(item, pointer),
                None => Ok(false),
            },
            Event::KeyDown(key) => match self.enclosing_list(node) {
                Some(list) => self.handle_key(list, key),
                None => Ok(false),
            },
            Event::Focus => match self.enclosing_item(node) {
                Some(item) => match self.list_of(item) {
                    Some(list) => self.focus_item(list, item).map(|_| true),
                    None => Ok(false),
                },
                None => Ok(false),
            },
            _ => Ok(false),
        }
    }

    /// 条目离开列表时同步清理选择和焦点
    pub(crate) fn forget_in_list(&mut self, list: ViewId, item: ViewId) {
        let change = match self.views.get_mut(&list).and_then(|v| v.role.list_mut()) {
            Some(state) => {
                if state.focused == Some(item) {
                    state.focused = None;
                }
                state.selection.forget(item)
            }
            None => return,
        };
        if let Some(node) = self.live_node(item) {
            self.target.remove_attribute(node, "focused");
        }
        self.apply_selection_changes(list, change.into_iter().collect());
    }

    fn apply_selection_changes(&mut self, list: ViewId, changes: Vec<SelectionChange>) {
        for change in changes {
            let item = change.item();
            let selected = change.is_added();
            if let Some(state) = self.item_state_mut(item) {
                state.set_selected(selected);
            }
            if let Some(node) = self.live_node(item) {
                self.target.set_attribute(node, "selected", JsonValue::Bool(selected));
            }
            self.emit(if selected {
                ListEvent::Selected { list, item }
            } else {
                ListEvent::Deselected { list, item }
            });
        }
    }
}
