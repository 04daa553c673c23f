//! 更新上下文 - 名字到活节点的登记表 + 可重放的更新动作列表

use crate::descriptor::{Binding, Condition, CustomUpdate};
use crate::render::{NodeId, RenderTarget};
use serde_json::{json, Value as JsonValue};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// 视图状态（JSON 对象）的共享句柄
pub type StateHandle = Rc<RefCell<JsonValue>>;

/// 延迟绑定的更新动作。每个动作只读取当前状态并写入自己的节点，可重复执行。
#[derive(Clone)]
pub enum UpdateAction {
    SetText { node: NodeId, binding: Binding, state: StateHandle },
    SetVisibility { node: NodeId, condition: Condition, state: StateHandle },
    RunCustom { node: NodeId, update: CustomUpdate, state: StateHandle },
}

impl UpdateAction {
    pub fn node(&self) -> NodeId {
        match self {
            UpdateAction::SetText { node, .. }
            | UpdateAction::SetVisibility { node, .. }
            | UpdateAction::RunCustom { node, .. } => *node,
        }
    }

    pub fn run(&self, target: &mut dyn RenderTarget) {
        match self {
            UpdateAction::SetText { node, binding, state } => {
                let text = binding.evaluate(&state.borrow());
                target.set_text(*node, &text);
            }
            UpdateAction::SetVisibility { node, condition, state } => {
                let visible = condition.evaluate(&state.borrow());
                target.set_hidden(*node, !visible);
            }
            UpdateAction::RunCustom { node, update, state } => {
                // 先拷贝状态，自定义更新里可能会再借用它
                let snapshot = state.borrow().clone();
                update(target, *node, &snapshot);
            }
        }
    }
}

impl fmt::Debug for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateAction::SetText { node, binding, .. } => write!(f, "SetText({:?}, {:?})", node, binding),
            UpdateAction::SetVisibility { node, condition, .. } => {
                write!(f, "SetVisibility({:?}, {:?})", node, condition)
            }
            UpdateAction::RunCustom { node, .. } => write!(f, "RunCustom({:?})", node),
        }
    }
}

/// 动作队列，合并后的上下文共享同一个队列
#[derive(Default)]
struct ActionQueue {
    actions: RefCell<Vec<UpdateAction>>,
    refreshing: Cell<bool>,
}

/// 名字到节点的登记表，派生出的上下文与原上下文共享
type Registry = Rc<RefCell<HashMap<String, NodeId>>>;

struct ContextInner {
    registry: Registry,
    queue: Rc<ActionQueue>,
    state: StateHandle,
}

/// 更新上下文（共享句柄）
#[derive(Clone)]
pub struct UpdateContext {
    inner: Rc<RefCell<ContextInner>>,
}

impl UpdateContext {
    pub fn new(state: StateHandle) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ContextInner {
                registry: Rc::new(RefCell::new(HashMap::new())),
                queue: Rc::new(ActionQueue::default()),
                state,
            })),
        }
    }

    /// 带自己独立状态的上下文
    pub fn with_state(state: JsonValue) -> Self {
        Self::new(Rc::new(RefCell::new(state)))
    }

    pub fn state(&self) -> StateHandle {
        self.inner.borrow().state.clone()
    }

    pub fn register(&self, name: &str, node: NodeId) {
        self.inner.borrow().registry.borrow_mut().insert(name.to_string(), node);
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.inner.borrow().registry.borrow().get(name).copied()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().registry.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn record(&self, action: UpdateAction) {
        let queue = self.inner.borrow().queue.clone();
        queue.actions.borrow_mut().push(action);
    }

    pub fn actions(&self) -> Vec<UpdateAction> {
        let queue = self.inner.borrow().queue.clone();
        let actions = queue.actions.borrow().clone();
        actions
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().queue.actions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 两个上下文是否写入同一个动作列表
    pub fn shares_actions_with(&self, other: &UpdateContext) -> bool {
        Rc::ptr_eq(&self.inner.borrow().queue, &other.inner.borrow().queue)
    }

    /// 丢弃所有动作（活节点被销毁时调用）
    pub fn clear(&self) {
        let queue = self.inner.borrow().queue.clone();
        queue.actions.borrow_mut().clear();
        self.inner.borrow().registry.borrow_mut().clear();
    }

    /// 按记录顺序重放全部动作
    pub fn refresh(&self, target: &mut dyn RenderTarget) {
        let queue = self.inner.borrow().queue.clone();
        if queue.refreshing.get() {
            log::warn!("refresh re-entered while replaying the same action list, ignored");
            return;
        }
        queue.refreshing.set(true);
        let actions = queue.actions.borrow().clone();
        for action in &actions {
            action.run(target);
        }
        queue.refreshing.set(false);
    }
}

impl Default for UpdateContext {
    fn default() -> Self {
        Self::with_state(json!({}))
    }
}

impl fmt::Debug for UpdateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateContext")
            .field("names", &self.names())
            .field("actions", &self.len())
            .finish()
    }
}

/// 描述符自带上下文时，为这一次物化派生一个上下文：
/// 共享自带上下文的登记表和状态，动作写入祖先的动作列表，
/// 这样顶层一次 `refresh` 就能更新任意深度的绑定。
/// 自带上下文本身不被修改，同一描述符多次物化互不影响；
/// 它直接记录的动作会复制一份到祖先列表。
pub fn ensure_context(candidate: Option<&UpdateContext>, parent: &UpdateContext) -> UpdateContext {
    let Some(own) = candidate else {
        return parent.clone();
    };
    if Rc::ptr_eq(&own.inner, &parent.inner) || own.shares_actions_with(parent) {
        return own.clone();
    }

    let parent_queue = parent.inner.borrow().queue.clone();
    let (registry, state, own_queue) = {
        let inner = own.inner.borrow();
        (inner.registry.clone(), inner.state.clone(), inner.queue.clone())
    };
    let pending = own_queue.actions.borrow().clone();
    parent_queue.actions.borrow_mut().extend(pending);

    UpdateContext {
        inner: Rc::new(RefCell::new(ContextInner { registry, queue: parent_queue, state })),
    }
}
