//! 错误类型

use crate::render::NodeId;
use crate::view::ViewId;
use thiserror::Error;

/// 视图系统错误
#[derive(Debug, Error)]
pub enum ViewError {
    /// 描述符递归超出深度预算（通常是描述符引用了自己的祖先）
    #[error("ran out of materialization budget (cyclic or too deep descriptor)")]
    RanOutOfBudget,

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("view {0:?} already belongs to a container")]
    AlreadyOwned(ViewId),

    #[error("view {child:?} is not a member of container {container:?}")]
    NotAMember { container: ViewId, child: ViewId },

    #[error("index {index} is out of range for container {container:?}")]
    IndexOutOfRange { container: ViewId, index: usize },

    #[error("view {0:?} cannot hold children")]
    NotAContainer(ViewId),

    #[error("unknown view {0:?}")]
    UnknownView(ViewId),

    #[error("unknown render node {0:?}")]
    UnknownNode(NodeId),

    #[error("invalid view state: {0}")]
    InvalidState(String),

    /// 同一棵视图树同时只允许一个拖拽手势
    #[error("a drag gesture is already in progress")]
    DragInProgress,

    #[error("layout failed: {0}")]
    Layout(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ViewError>;
