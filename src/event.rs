//! 事件系统 - 处理用户交互

use crate::geometry::Point;
use std::rc::Rc;

/// 事件类型
#[derive(Debug, Clone)]
pub enum Event {
    // 指针事件（触摸会被统一成同一套 down/move/up）
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),

    // 点击事件
    Click(PointerEvent),
    ContextMenu(PointerEvent),

    // 键盘事件
    KeyDown(KeyEvent),

    // 焦点
    Focus,
    Blur,

    // 拖拽
    DragStart(DragEvent),
    DragEnter(DragEvent),
    DragOver(DragEvent),
    DragLeave(DragEvent),
    Drop(DragEvent),
    DragEnd(DragEvent),
}

/// 不带数据的事件种类，用于注册监听器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerDown,
    PointerMove,
    PointerUp,
    Click,
    ContextMenu,
    KeyDown,
    Focus,
    Blur,
    DragStart,
    DragEnter,
    DragOver,
    DragLeave,
    Drop,
    DragEnd,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PointerDown(_) => EventKind::PointerDown,
            Event::PointerMove(_) => EventKind::PointerMove,
            Event::PointerUp(_) => EventKind::PointerUp,
            Event::Click(_) => EventKind::Click,
            Event::ContextMenu(_) => EventKind::ContextMenu,
            Event::KeyDown(_) => EventKind::KeyDown,
            Event::Focus => EventKind::Focus,
            Event::Blur => EventKind::Blur,
            Event::DragStart(_) => EventKind::DragStart,
            Event::DragEnter(_) => EventKind::DragEnter,
            Event::DragOver(_) => EventKind::DragOver,
            Event::DragLeave(_) => EventKind::DragLeave,
            Event::Drop(_) => EventKind::Drop,
            Event::DragEnd(_) => EventKind::DragEnd,
        }
    }

    /// 把触摸事件统一成指针事件
    pub fn from_touch(phase: TouchPhase, touch: &Touch) -> Event {
        let pe = PointerEvent::at(touch.x, touch.y);
        match phase {
            TouchPhase::Start => Event::PointerDown(pe),
            TouchPhase::Move => Event::PointerMove(pe),
            TouchPhase::End | TouchPhase::Cancel => Event::PointerUp(pe),
        }
    }
}

/// 修饰键
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { alt: false, ctrl: false, shift: false, meta: false };
    pub const CTRL: Modifiers = Modifiers { alt: false, ctrl: true, shift: false, meta: false };
    pub const SHIFT: Modifiers = Modifiers { alt: false, ctrl: false, shift: true, meta: false };

    /// macOS 上 Cmd 等同于 Ctrl
    pub fn ctrl_or_meta(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// 指针事件
#[derive(Debug, Clone, Default)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub button: u8,
    pub modifiers: Modifiers,
    pub timestamp: u64,
}

impl PointerEvent {
    pub fn at(x: f32, y: f32) -> Self {
        Self { x, y, ..Default::default() }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// 触摸阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// 单个触摸点
#[derive(Debug, Clone)]
pub struct Touch {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

impl Touch {
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }
}

/// 键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Home,
    End,
    Char(char),
}

/// 键盘事件
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, modifiers: Modifiers::NONE }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// 拖拽事件
#[derive(Debug, Clone, Default)]
pub struct DragEvent {
    pub x: f32,
    pub y: f32,
    pub modifiers: Modifiers,
}

impl DragEvent {
    pub fn at(x: f32, y: f32) -> Self {
        Self { x, y, modifiers: Modifiers::NONE }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// 事件监听器，返回是否消费
pub type Listener = Rc<dyn Fn(&Event) -> bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// 单个节点上的监听器集合
#[derive(Default, Clone)]
pub struct ListenerSet {
    listeners: Vec<(ListenerId, EventKind, Listener)>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self { listeners: Vec::new() }
    }

    pub fn add(&mut self, id: ListenerId, kind: EventKind, listener: Listener) {
        self.listeners.push((id, kind, listener));
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _, _)| *l != id);
        self.listeners.len() != before
    }

    /// 依次调用匹配的监听器，任一返回 true 即视为已消费
    pub fn dispatch(&self, event: &Event) -> bool {
        let kind = event.kind();
        let mut handled = false;
        for (_, k, listener) in &self.listeners {
            if *k == kind {
                handled |= listener(event);
            }
        }
        handled
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_touch_unified_into_pointer() {
        let t = Touch::new(1, 3.0, 4.0);
        assert_eq!(Event::from_touch(TouchPhase::Start, &t).kind(), EventKind::PointerDown);
        assert_eq!(Event::from_touch(TouchPhase::Cancel, &t).kind(), EventKind::PointerUp);
    }

    #[test]
    fn test_listener_set_dispatch_and_remove() {
        let hits = Rc::new(Cell::new(0));
        let mut set = ListenerSet::new();
        let h = hits.clone();
        set.add(ListenerId(1), EventKind::Click, Rc::new(move |_| { h.set(h.get() + 1); true }));

        assert!(set.dispatch(&Event::Click(PointerEvent::at(0.0, 0.0))));
        assert!(!set.dispatch(&Event::Focus));
        assert_eq!(hits.get(), 1);

        assert!(set.remove(ListenerId(1)));
        assert!(set.is_empty());
    }
}
