//! 物化与更新上下文测试

use crate::descriptor::{dynamic, Child, Descriptor};
use crate::error::ViewError;
use crate::event::EventKind;
use crate::materialize::{materialize, UpdateContext, DEFAULT_TTL};
use crate::render::{NodeId, RenderTarget, RenderTree};
use crate::view::{Materializable, ViewId, ViewTree};
use serde_json::{json, Value as JsonValue};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// 记录 on_created 次数的视图
struct Counted {
    created: Rc<Cell<u32>>,
}

impl Materializable for Counted {
    fn describe(&self, _state: &JsonValue) -> Descriptor {
        Descriptor::new("div").text_template("{{title}}")
    }

    fn on_created(&mut self, _node: NodeId, _ctx: &UpdateContext, _target: &mut dyn RenderTarget) {
        self.created.set(self.created.get() + 1);
    }
}

#[test]
fn test_direct_cycle_runs_out_of_budget() {
    let mut tree = RenderTree::new(320.0);
    let looping = Descriptor::new("div");
    looping.push_child(looping.clone());

    let ctx = UpdateContext::default();
    let err = materialize(&mut tree, &Child::Node(looping.clone()), &ctx, DEFAULT_TTL).unwrap_err();
    assert!(matches!(err, ViewError::RanOutOfBudget));
    // 失败时半成品子树被丢弃，只剩根节点
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_small_budget_limits_depth() {
    let mut tree = RenderTree::new(320.0);
    let d = Descriptor::new("a").child(Descriptor::new("b").child(Descriptor::new("c")));
    let ctx = UpdateContext::default();
    assert!(matches!(
        materialize(&mut tree, &Child::Node(d.clone()), &ctx, 2),
        Err(ViewError::RanOutOfBudget)
    ));
    assert!(materialize(&mut tree, &Child::Node(d), &ctx, 3).is_ok());
}

#[test]
fn test_attribute_kinds_dispatch() {
    let mut tree = RenderTree::new(320.0);
    let clicks = Rc::new(Cell::new(0));
    let c = clicks.clone();
    let d = Descriptor::new("button")
        .attr("width", 80)
        .class("primary")
        .named("button")
        .text_template("{{label}}")
        .visible_if("enabled")
        .on(EventKind::Click, move |_| {
            c.set(c.get() + 1);
            true
        })
        .custom(|target, node, state| target.set_attribute(node, "data-count", state["count"].clone()));

    let ctx = UpdateContext::with_state(json!({ "label": "Save", "enabled": true, "count": 3 }));
    let node = materialize(&mut tree, &Child::Node(d), &ctx, DEFAULT_TTL).unwrap();

    assert_eq!(tree.attribute(node, "class"), Some(json!("primary")));
    assert_eq!(ctx.get("button"), Some(node));
    // 绑定在 refresh 之前不生效
    assert_eq!(tree.text(node).as_deref(), Some(""));
    assert_eq!(tree.attribute(node, "data-count"), None);
    assert_eq!(ctx.len(), 3);

    ctx.refresh(&mut tree);
    assert_eq!(tree.text(node).as_deref(), Some("Save"));
    assert!(!tree.is_hidden(node));
    assert_eq!(tree.attribute(node, "data-count"), Some(json!(3)));

    assert!(!tree.fire(node, &crate::event::Event::Focus));
    assert!(tree.fire(node, &crate::event::Event::Click(Default::default())));
    assert_eq!(clicks.get(), 1);
}

#[test]
fn test_array_children_flatten_one_level() {
    let mut tree = RenderTree::new(320.0);
    let d = Descriptor::new("ul").child(vec!["a", "b"]).child("c");
    let ctx = UpdateContext::default();
    let node = materialize(&mut tree, &Child::Node(d), &ctx, DEFAULT_TTL).unwrap();
    assert_eq!(tree.children(node).len(), 3);
    assert_eq!(tree.text_content(node), "abc");
}

#[test]
fn test_function_child_not_called_until_refresh() {
    let mut tree = RenderTree::new(320.0);
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let d = Descriptor::new("p").child(dynamic(move |s| {
        c.set(c.get() + 1);
        format!("hello {}", s["name"].as_str().unwrap_or("?"))
    }));
    let ctx = UpdateContext::with_state(json!({ "name": "ada" }));
    let node = materialize(&mut tree, &Child::Node(d), &ctx, DEFAULT_TTL).unwrap();
    assert_eq!(calls.get(), 0);

    ctx.refresh(&mut tree);
    ctx.refresh(&mut tree);
    assert_eq!(calls.get(), 2);
    assert_eq!(tree.text_content(node), "hello ada");
}

#[test]
fn test_refresh_twice_is_idempotent() {
    let mut tree = RenderTree::new(320.0);
    let d = Descriptor::new("div")
        .child(Descriptor::new("span").text_template("{{a}}-{{b}}"))
        .child(Descriptor::new("span").visible_if("a > 1"))
        .custom(|target, node, state| target.set_attribute(node, "sum", json!(state["a"].as_i64().unwrap_or(0) + 1)));
    let ctx = UpdateContext::with_state(json!({ "a": 2, "b": "x" }));
    let node = materialize(&mut tree, &Child::Node(d), &ctx, DEFAULT_TTL).unwrap();

    ctx.refresh(&mut tree);
    let first = tree.dump(node);
    ctx.refresh(&mut tree);
    assert_eq!(tree.dump(node), first);
    assert_eq!(tree.attribute(node, "sum"), Some(json!(3)));
}

#[test]
fn test_nested_context_merges_into_parent() {
    let mut tree = RenderTree::new(320.0);
    let inner = UpdateContext::with_state(json!({ "who": "inner" }));
    let d = Descriptor::new("div")
        .child(Descriptor::new("span").text_template("{{who}}"))
        .child(
            Descriptor::new("section")
                .child(Descriptor::new("span").named("label").text_template("{{who}}"))
                .with_context(inner.clone()),
        );
    let outer = UpdateContext::with_state(json!({ "who": "outer" }));
    let node = materialize(&mut tree, &Child::Node(d), &outer, DEFAULT_TTL).unwrap();

    // 一次顶层 refresh 覆盖嵌套绑定
    outer.refresh(&mut tree);
    assert_eq!(tree.text_content(node), "outerinner");
    assert!(!inner.shares_actions_with(&outer));
    assert_eq!(outer.len(), 2);

    // 登记表各自独立
    assert!(inner.get("label").is_some());
    assert!(outer.get("label").is_none());

    *inner.state().borrow_mut() = json!({ "who": "changed" });
    outer.refresh(&mut tree);
    assert_eq!(tree.text_content(node), "outerchanged");
}

#[test]
fn test_json_descriptor_materializes() {
    let mut tree = RenderTree::new(320.0);
    let d = Descriptor::from_json(
        r#"{ "kind": "ul", "ref": "list", "children": [
            { "kind": "li", "text": "{{first}}", "visibleIf": "!hideFirst" },
            "plain",
            "n={{n}}"
        ] }"#,
    )
    .unwrap();
    let ctx = UpdateContext::with_state(json!({ "first": "one", "n": 2, "hideFirst": false }));
    let node = materialize(&mut tree, &Child::Node(d), &ctx, DEFAULT_TTL).unwrap();
    ctx.refresh(&mut tree);
    assert_eq!(ctx.get("list"), Some(node));
    assert_eq!(tree.text_content(node), "oneplainn=2");
}

#[test]
fn test_view_materializes_lazily_once() {
    let mut tree: ViewTree = ViewTree::default();
    let created = Rc::new(Cell::new(0));
    let id = tree.add(Counted { created: created.clone() }, json!({ "title": "hi" })).unwrap();
    assert_eq!(tree.target().len(), 1);
    assert!(!tree.view(id).unwrap().is_live());

    let node = tree.ensure_live(id).unwrap();
    assert_eq!(tree.ensure_live(id).unwrap(), node);
    assert_eq!(created.get(), 1);
    assert_eq!(tree.target().text(node).as_deref(), Some("hi"));
}

#[test]
fn test_update_with_merges_and_refreshes() {
    let mut tree: ViewTree = ViewTree::default();
    let id = tree
        .add(
            |_: &JsonValue| Descriptor::new("p").text_template("{{greeting}}, {{name}}"),
            json!({ "greeting": "Hello", "name": "world" }),
        )
        .unwrap();
    let node = tree.ensure_live(id).unwrap();
    tree.update_with(id, json!({ "name": "Rust" })).unwrap();
    assert_eq!(tree.target().text(node).as_deref(), Some("Hello, Rust"));
    assert_eq!(tree.state(id).unwrap()["greeting"], "Hello");

    let err = tree.update_with(id, json!([1, 2])).unwrap_err();
    assert!(matches!(err, ViewError::InvalidState(_)));
}

#[test]
fn test_view_state_must_be_object() {
    let mut tree: ViewTree = ViewTree::default();
    let err = tree.add(|_: &JsonValue| Descriptor::new("p"), json!("text")).unwrap_err();
    assert!(matches!(err, ViewError::InvalidState(_)));
}

#[test]
fn test_empty_kind_view_fails() {
    let mut tree: ViewTree = ViewTree::default();
    let id = tree.add(|_: &JsonValue| Descriptor::new(""), json!({})).unwrap();
    assert!(matches!(tree.ensure_live(id), Err(ViewError::InvalidDescriptor(_))));
    assert!(!tree.view(id).unwrap().is_live());
}

#[test]
fn test_embedded_view_keeps_identity() {
    let mut tree: ViewTree = ViewTree::default();
    let badge = tree.add(|_: &JsonValue| Descriptor::new("badge").text_template("{{n}}"), json!({ "n": 5 })).unwrap();
    let badge_node = tree.ensure_live(badge).unwrap();

    let card = tree
        .add(move |_: &JsonValue| Descriptor::new("card").child(badge), json!({}))
        .unwrap();
    let card_node = tree.ensure_live(card).unwrap();
    assert_eq!(tree.target().children(card_node), vec![badge_node]);
    assert_eq!(tree.owner_of(badge_node), Some(badge));
}

#[test]
fn test_view_embedding_itself_runs_out_of_budget() {
    let mut tree: ViewTree = ViewTree::default();
    let me = Rc::new(Cell::new(ViewId(0)));
    let slot = me.clone();
    let id = tree
        .add(move |_: &JsonValue| Descriptor::new("div").child(slot.get()), json!({}))
        .unwrap();
    me.set(id);
    assert!(matches!(tree.ensure_live(id), Err(ViewError::RanOutOfBudget)));
    assert_eq!(tree.target().len(), 1);
}

#[test]
fn test_custom_update_sees_latest_state() {
    let mut tree: ViewTree = ViewTree::default();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let id = tree
        .add(
            move |_: &JsonValue| {
                let log = log.clone();
                Descriptor::new("meter").custom(move |_, _, state| log.borrow_mut().push(state["v"].clone()))
            },
            json!({ "v": 1 }),
        )
        .unwrap();
    tree.ensure_live(id).unwrap();
    tree.update_with(id, json!({ "v": 2 })).unwrap();
    tree.refresh(id).unwrap();
    assert_eq!(*seen.borrow(), vec![json!(1), json!(2), json!(2)]);
}

fn titled(shared: Descriptor) -> impl Fn(&JsonValue) -> Descriptor {
    move |_| Descriptor::new("div").text_template("{{t}}").child(shared.clone())
}

#[test]
fn test_shared_descriptor_materializes_independently() {
    let mut tree: ViewTree = ViewTree::default();
    let shared_ctx = UpdateContext::with_state(json!({ "s": "x" }));
    let shared = Descriptor::new("span")
        .named("badge")
        .text_template("{{s}}")
        .with_context(shared_ctx.clone());
    let first = tree.add(titled(shared.clone()), json!({ "t": "one" })).unwrap();
    let second = tree.add(titled(shared), json!({ "t": "uno" })).unwrap();

    let first_node = tree.ensure_live(first).unwrap();
    let recorded = tree.context(first).unwrap().len();
    assert!(recorded >= 2);
    let second_node = tree.ensure_live(second).unwrap();

    // 第二次物化不会拿走第一个视图的动作
    let first_ctx = tree.context(first).unwrap();
    let second_ctx = tree.context(second).unwrap();
    assert_eq!(first_ctx.len(), recorded);
    assert_eq!(second_ctx.len(), recorded);
    assert!(!first_ctx.shares_actions_with(&second_ctx));
    assert!(shared_ctx.is_empty());

    tree.update_with(first, json!({ "t": "two" })).unwrap();
    assert_eq!(tree.target().text_content(first_node), "twox");
    assert_eq!(tree.target().text_content(second_node), "unox");

    *shared_ctx.state().borrow_mut() = json!({ "s": "y" });
    tree.refresh(first).unwrap();
    tree.refresh(second).unwrap();
    assert_eq!(tree.target().text_content(first_node), "twoy");
    assert_eq!(tree.target().text_content(second_node), "unoy");
}

#[test]
fn test_failed_view_keeps_embedded_view_alive() {
    let mut tree: ViewTree = ViewTree::default();
    let label = tree.add(|_: &JsonValue| Descriptor::new("p").text_template("L"), json!({})).unwrap();
    let label_node = tree.ensure_live(label).unwrap();

    let broken = tree
        .add(move |_: &JsonValue| Descriptor::new("div").child(label).child(Descriptor::new("")), json!({}))
        .unwrap();
    assert!(matches!(tree.ensure_live(broken), Err(ViewError::InvalidDescriptor(_))));
    assert!(!tree.view(broken).unwrap().is_live());

    // 嵌入的视图节点只被摘下
    assert!(tree.target().contains(label_node));
    assert_eq!(tree.live_node(label), Some(label_node));
    assert_eq!(tree.target().parent(label_node), None);

    assert_eq!(tree.mount(label).unwrap(), label_node);
    assert_eq!(tree.target().text(label_node).as_deref(), Some("L"));
}
