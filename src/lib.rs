//! Mini View - 视图树核心
//! 描述符物化、可重放的更新绑定、容器/列表视图、选择与拖拽重排

mod geometry;

pub use geometry::{Point, Rect};

// 错误类型
pub mod error;
pub use error::{Result, ViewError};

// 配置
pub mod config;
pub use config::{DragConfig, ListOptions, TreeConfig};

// 事件系统
pub mod event;

// 渲染目标与内存渲染树
pub mod render;
pub use render::{NodeId, RenderTarget, RenderTree};

// 节点描述符
pub mod descriptor;
pub use descriptor::{Attr, Binding, Child, Condition, Descriptor};

// 树物化与更新上下文
pub mod materialize;
pub use materialize::{ensure_context, materialize, MaterializeHost, UpdateAction, UpdateContext};

// 视图、容器、列表
pub mod view;
pub use view::{
    DragPayload, DragSession, DropEffect, DropHandler, DropTarget, ListEvent, Materializable, Role, ViewId, ViewTree,
};

// 内置小部件
pub mod widgets;

// 本地化
pub mod i18n;

// 单元测试
#[cfg(test)]
mod tests;
