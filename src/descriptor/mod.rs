//! 节点描述符 - 声明式描述一个渲染节点及其子树
//!
//! 描述符本身是惰性数据，物化时由 `materialize` 转换为活节点。
//! 动态属性（文本、可见性、自定义更新）不会在物化时求值，
//! 而是记录进 `UpdateContext`，在 `refresh` 时重放。

pub mod json;
pub mod template;

pub use json::{ChildSpec, DescriptorSpec};
pub use template::TemplateEngine;

use crate::event::{Event, EventKind, Listener};
use crate::i18n;
use crate::materialize::UpdateContext;
use crate::render::{NodeId, RenderTarget};
use crate::view::ViewId;
use serde_json::Value as JsonValue;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

pub type TextFn = Rc<dyn Fn(&JsonValue) -> String>;
pub type ConditionFn = Rc<dyn Fn(&JsonValue) -> bool>;
/// 自定义更新：读取当前状态，写入绑定的节点
pub type CustomUpdate = Rc<dyn Fn(&mut dyn RenderTarget, NodeId, &JsonValue)>;

/// 文本来源
#[derive(Clone)]
pub enum Binding {
    Const(String),
    /// 含 {{}} 的模板，针对视图状态求值
    Template(String),
    /// 通过 i18n 查找
    Localized(String),
    Fn(TextFn),
}

impl Binding {
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Binding::Const(_))
    }

    pub fn evaluate(&self, state: &JsonValue) -> String {
        match self {
            Binding::Const(s) => s.clone(),
            Binding::Template(t) => TemplateEngine::interpolate(t, state),
            Binding::Localized(key) => i18n::tr(key),
            Binding::Fn(f) => f(state),
        }
    }
}

impl From<&str> for Binding {
    fn from(s: &str) -> Self {
        Binding::Const(s.to_string())
    }
}

impl From<String> for Binding {
    fn from(s: String) -> Self {
        Binding::Const(s)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Const(s) => write!(f, "Const({:?})", s),
            Binding::Template(t) => write!(f, "Template({:?})", t),
            Binding::Localized(k) => write!(f, "Localized({:?})", k),
            Binding::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// 可见性条件，为 true 时可见
#[derive(Clone)]
pub enum Condition {
    Const(bool),
    Expr(String),
    Fn(ConditionFn),
}

impl Condition {
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Condition::Const(_))
    }

    pub fn evaluate(&self, state: &JsonValue) -> bool {
        match self {
            Condition::Const(b) => *b,
            Condition::Expr(e) => TemplateEngine::evaluate_condition(e, state),
            Condition::Fn(f) => f(state),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Const(b) => write!(f, "Const({})", b),
            Condition::Expr(e) => write!(f, "Expr({:?})", e),
            Condition::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// 属性种类
#[derive(Clone)]
pub enum Attr {
    /// 直接赋值的静态属性
    Static(String, JsonValue),
    Text(Binding),
    Visibility(Condition),
    /// 把该节点以名字登记到上下文
    NamedRef(String),
    Event(EventKind, Listener),
    Custom(CustomUpdate),
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attr::Static(k, v) => write!(f, "Static({}={})", k, v),
            Attr::Text(b) => write!(f, "Text({:?})", b),
            Attr::Visibility(c) => write!(f, "Visibility({:?})", c),
            Attr::NamedRef(n) => write!(f, "NamedRef({})", n),
            Attr::Event(k, _) => write!(f, "Event({:?})", k),
            Attr::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// 子节点
#[derive(Clone, Debug)]
pub enum Child {
    /// 字符串/数字/布尔，成为文本叶子
    Value(JsonValue),
    /// 动态文本叶子，刷新时重新求值
    Dynamic(Binding),
    Node(Descriptor),
    /// 已存在的活节点，原样使用
    Live(NodeId),
    /// 视图，按需物化后原样使用
    View(ViewId),
    /// 子节点数组，展开一层
    Many(Vec<Child>),
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Value(JsonValue::from(s))
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Value(JsonValue::from(s))
    }
}

impl From<i64> for Child {
    fn from(n: i64) -> Self {
        Child::Value(JsonValue::from(n))
    }
}

impl From<f64> for Child {
    fn from(n: f64) -> Self {
        Child::Value(JsonValue::from(n))
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Value(JsonValue::from(b))
    }
}

impl From<Descriptor> for Child {
    fn from(d: Descriptor) -> Self {
        Child::Node(d)
    }
}

impl From<NodeId> for Child {
    fn from(n: NodeId) -> Self {
        Child::Live(n)
    }
}

impl From<ViewId> for Child {
    fn from(v: ViewId) -> Self {
        Child::View(v)
    }
}

impl From<Binding> for Child {
    fn from(b: Binding) -> Self {
        Child::Dynamic(b)
    }
}

impl<C: Into<Child>> From<Vec<C>> for Child {
    fn from(items: Vec<C>) -> Self {
        Child::Many(items.into_iter().map(Into::into).collect())
    }
}

/// 由函数产生的动态文本子节点
pub fn dynamic<F>(f: F) -> Child
where
    F: Fn(&JsonValue) -> String + 'static,
{
    Child::Dynamic(Binding::Fn(Rc::new(f)))
}

pub struct NodeDescriptor {
    kind: String,
    attrs: RefCell<Vec<Attr>>,
    children: RefCell<Vec<Child>>,
    context: RefCell<Option<UpdateContext>>,
}

/// 节点描述符（共享句柄，可在多次物化间复用）
#[derive(Clone)]
pub struct Descriptor(Rc<NodeDescriptor>);

impl Descriptor {
    pub fn new(kind: &str) -> Self {
        Self(Rc::new(NodeDescriptor {
            kind: kind.to_string(),
            attrs: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            context: RefCell::new(None),
        }))
    }

    pub fn kind(&self) -> &str {
        &self.0.kind
    }

    pub fn attrs(&self) -> Ref<'_, Vec<Attr>> {
        self.0.attrs.borrow()
    }

    pub fn children(&self) -> Ref<'_, Vec<Child>> {
        self.0.children.borrow()
    }

    pub fn context(&self) -> Option<UpdateContext> {
        self.0.context.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Descriptor) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn push_attr(self, attr: Attr) -> Self {
        self.0.attrs.borrow_mut().push(attr);
        self
    }

    pub fn attr(self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.push_attr(Attr::Static(name.to_string(), value.into()))
    }

    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    pub fn text(self, binding: impl Into<Binding>) -> Self {
        self.push_attr(Attr::Text(binding.into()))
    }

    pub fn text_template(self, template: &str) -> Self {
        self.push_attr(Attr::Text(Binding::Template(template.to_string())))
    }

    pub fn text_fn<F>(self, f: F) -> Self
    where
        F: Fn(&JsonValue) -> String + 'static,
    {
        self.push_attr(Attr::Text(Binding::Fn(Rc::new(f))))
    }

    pub fn localized(self, key: &str) -> Self {
        self.push_attr(Attr::Text(Binding::Localized(key.to_string())))
    }

    pub fn visible_if(self, expr: &str) -> Self {
        self.push_attr(Attr::Visibility(Condition::Expr(expr.to_string())))
    }

    pub fn visible_when<F>(self, f: F) -> Self
    where
        F: Fn(&JsonValue) -> bool + 'static,
    {
        self.push_attr(Attr::Visibility(Condition::Fn(Rc::new(f))))
    }

    pub fn hidden(self, hidden: bool) -> Self {
        self.push_attr(Attr::Visibility(Condition::Const(!hidden)))
    }

    pub fn named(self, name: &str) -> Self {
        self.push_attr(Attr::NamedRef(name.to_string()))
    }

    pub fn on<F>(self, kind: EventKind, f: F) -> Self
    where
        F: Fn(&Event) -> bool + 'static,
    {
        self.push_attr(Attr::Event(kind, Rc::new(f)))
    }

    pub fn custom<F>(self, f: F) -> Self
    where
        F: Fn(&mut dyn RenderTarget, NodeId, &JsonValue) + 'static,
    {
        self.push_attr(Attr::Custom(Rc::new(f)))
    }

    pub fn child(self, child: impl Into<Child>) -> Self {
        self.0.children.borrow_mut().push(child.into());
        self
    }

    pub fn children_from<I, C>(self, children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Child>,
    {
        self.0.children.borrow_mut().extend(children.into_iter().map(Into::into));
        self
    }

    /// 作者阶段追加子节点（不消耗句柄）
    pub fn push_child(&self, child: impl Into<Child>) {
        self.0.children.borrow_mut().push(child.into());
    }

    /// 使用自带的更新上下文，物化时其动作会并入祖先的动作列表
    pub fn with_context(self, ctx: UpdateContext) -> Self {
        *self.0.context.borrow_mut() = Some(ctx);
        self
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 子节点可能引用自身，只输出数量
        f.debug_struct("Descriptor")
            .field("kind", &self.0.kind)
            .field("attrs", &self.0.attrs.borrow().len())
            .field("children", &self.0.children.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_attrs_and_children() {
        let d = Descriptor::new("li")
            .class("row")
            .text_template("{{name}}")
            .named("row")
            .child("x")
            .child(vec!["a", "b"]);
        assert_eq!(d.kind(), "li");
        assert_eq!(d.attrs().len(), 3);
        assert_eq!(d.children().len(), 2);
        assert!(matches!(d.children()[1], Child::Many(ref v) if v.len() == 2));
    }

    #[test]
    fn test_binding_evaluate() {
        let state = json!({ "n": 2 });
        assert_eq!(Binding::from("x").evaluate(&state), "x");
        assert_eq!(Binding::Template("{{n}}!".into()).evaluate(&state), "2!");
        assert!(!Binding::from("x").is_dynamic());
        assert!(Condition::Expr("n > 1".into()).evaluate(&state));
    }
}
