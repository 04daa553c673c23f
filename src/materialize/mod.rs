//! 树物化 - 把描述符（或视图、普通值）转换为活的渲染节点
//!
//! 物化过程中动态绑定只被记录进 `UpdateContext`，不会立即求值；
//! 递归带一个递减的深度预算，防止描述符意外引用自己的祖先时无限展开。

mod context;

pub use context::{ensure_context, StateHandle, UpdateAction, UpdateContext};

use crate::descriptor::{Attr, Binding, Child, Descriptor, TemplateEngine};
use crate::error::{Result, ViewError};
use crate::render::{NodeId, RenderTarget, RenderTree};
use crate::view::ViewId;

/// 默认深度预算
pub const DEFAULT_TTL: u32 = 64;

/// 物化宿主：提供渲染目标，并负责把视图变成活节点
pub trait MaterializeHost {
    fn target(&mut self) -> &mut dyn RenderTarget;

    /// 返回视图的活节点，必要时先物化（身份保持，不克隆）
    fn view_node(&mut self, view: ViewId) -> Result<NodeId>;
}

impl MaterializeHost for RenderTree {
    fn target(&mut self) -> &mut dyn RenderTarget {
        self
    }

    fn view_node(&mut self, view: ViewId) -> Result<NodeId> {
        Err(ViewError::InvalidDescriptor(format!(
            "view {:?} can only be materialized inside a view tree",
            view
        )))
    }
}

/// 物化一个子节点描述
pub fn materialize(host: &mut dyn MaterializeHost, child: &Child, ctx: &UpdateContext, ttl: u32) -> Result<NodeId> {
    materialize_child(host, child, ctx, ttl, &mut Vec::new())
}

/// `adopted` 收集原样接入的节点（已有活节点、视图节点），失败时它们只被摘下不被销毁
fn materialize_child(
    host: &mut dyn MaterializeHost,
    child: &Child,
    ctx: &UpdateContext,
    ttl: u32,
    adopted: &mut Vec<NodeId>,
) -> Result<NodeId> {
    if ttl == 0 {
        return Err(ViewError::RanOutOfBudget);
    }

    match child {
        Child::Value(value) => host.target().create_text(&TemplateEngine::json_to_string(value)),
        Child::Dynamic(binding) => {
            let target = host.target();
            match binding {
                Binding::Const(text) => target.create_text(text),
                _ => {
                    let node = target.create_text("")?;
                    ctx.record(UpdateAction::SetText { node, binding: binding.clone(), state: ctx.state() });
                    Ok(node)
                }
            }
        }
        Child::Live(node) => {
            adopted.push(*node);
            Ok(*node)
        }
        Child::View(view) => {
            let node = host.view_node(*view)?;
            adopted.push(node);
            Ok(node)
        }
        Child::Node(descriptor) => materialize_node(host, descriptor, ctx, ttl, adopted),
        Child::Many(_) => Err(ViewError::InvalidDescriptor(
            "child lists are only flattened one level inside a descriptor's children".into(),
        )),
    }
}

fn materialize_node(
    host: &mut dyn MaterializeHost,
    descriptor: &Descriptor,
    ctx: &UpdateContext,
    ttl: u32,
    adopted: &mut Vec<NodeId>,
) -> Result<NodeId> {
    let kind = descriptor.kind().trim();
    if kind.is_empty() {
        return Err(ViewError::InvalidDescriptor("descriptor has no kind".into()));
    }

    let own = descriptor.context();
    let ctx = ensure_context(own.as_ref(), ctx);

    let node = host.target().create_node(kind)?;
    let mark = adopted.len();
    if let Err(e) = apply_descriptor(host, descriptor, &ctx, node, ttl, adopted) {
        let target = host.target();
        for borrowed in adopted.drain(mark..) {
            target.detach(borrowed);
        }
        target.discard(node);
        return Err(e);
    }
    Ok(node)
}

fn apply_descriptor(
    host: &mut dyn MaterializeHost,
    descriptor: &Descriptor,
    ctx: &UpdateContext,
    node: NodeId,
    ttl: u32,
    adopted: &mut Vec<NodeId>,
) -> Result<()> {
    for attr in descriptor.attrs().iter() {
        let target = host.target();
        match attr {
            Attr::Static(name, value) => target.set_attribute(node, name, value.clone()),
            Attr::Text(binding) if binding.is_dynamic() => {
                ctx.record(UpdateAction::SetText { node, binding: binding.clone(), state: ctx.state() });
            }
            Attr::Text(binding) => target.set_text(node, &binding.evaluate(&ctx.state().borrow())),
            Attr::Visibility(condition) if condition.is_dynamic() => {
                ctx.record(UpdateAction::SetVisibility { node, condition: condition.clone(), state: ctx.state() });
            }
            Attr::Visibility(condition) => {
                target.set_hidden(node, !condition.evaluate(&ctx.state().borrow()));
            }
            Attr::NamedRef(name) => ctx.register(name, node),
            Attr::Event(kind, listener) => {
                target.add_listener(node, *kind, listener.clone());
            }
            Attr::Custom(update) => {
                ctx.record(UpdateAction::RunCustom { node, update: update.clone(), state: ctx.state() });
            }
        }
    }

    for child in descriptor.children().iter() {
        match child {
            Child::Many(items) => {
                for item in items {
                    append(host, item, ctx, node, ttl, adopted)?;
                }
            }
            other => append(host, other, ctx, node, ttl, adopted)?,
        }
    }
    Ok(())
}

fn append(
    host: &mut dyn MaterializeHost,
    child: &Child,
    ctx: &UpdateContext,
    parent: NodeId,
    ttl: u32,
    adopted: &mut Vec<NodeId>,
) -> Result<()> {
    let mark = adopted.len();
    let node = materialize_child(host, child, ctx, ttl - 1, adopted)?;
    if let Err(e) = host.target().append_child(parent, node) {
        let target = host.target();
        if adopted.last() == Some(&node) {
            // 没接上的原样节点留在原处
            adopted.pop();
        } else {
            for borrowed in adopted.drain(mark..) {
                target.detach(borrowed);
            }
            target.discard(node);
        }
        return Err(e);
    }
    Ok(())
}
