//! 单元测试模块
//! 覆盖物化、容器、选择、列表、拖拽重排

pub mod materialize_tests;
pub mod selection_tests;

use crate::config::ListOptions;
use crate::geometry::Point;
use crate::render::RenderTarget;
use crate::view::{OrderedContainer, ViewId, ViewTree};
use crate::widgets::{ListBox, ListRow};
use serde_json::json;

/// 创建已挂载的列表，每个标签一行
pub(crate) fn mounted_list(labels: &[&str]) -> (ViewTree, ViewId, Vec<ViewId>) {
    mounted_list_with(labels, ListOptions::default())
}

pub(crate) fn mounted_list_with(labels: &[&str], options: ListOptions) -> (ViewTree, ViewId, Vec<ViewId>) {
    let mut tree: ViewTree = ViewTree::default();
    let (list, rows) = add_list(&mut tree, labels, options);
    tree.mount(list).unwrap();
    (tree, list, rows)
}

/// 向已有的树添加一个未挂载的列表
pub(crate) fn add_list(tree: &mut ViewTree, labels: &[&str], options: ListOptions) -> (ViewId, Vec<ViewId>) {
    let list = tree.add_list(ListBox, json!({}), options).unwrap();
    let mut rows = Vec::new();
    for label in labels {
        let row = tree.add_item(ListRow::default(), json!({ "label": label })).unwrap();
        tree.insert(list, row, None).unwrap();
        rows.push(row);
    }
    (list, rows)
}

/// 按容器顺序读取条目标签
pub(crate) fn labels(tree: &ViewTree, container: ViewId) -> Vec<String> {
    tree.items(container)
        .unwrap()
        .iter()
        .map(|id| tree.state(*id).unwrap()["label"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// 按渲染树顺序读取条目文本
pub(crate) fn live_labels(tree: &ViewTree, list: ViewId) -> Vec<String> {
    let content = tree.named_node(list, "content").unwrap();
    tree.target()
        .children(content)
        .into_iter()
        .filter(|n| tree.target().kind(*n) == Some("li"))
        .map(|n| tree.target().text(n).unwrap_or_default())
        .collect()
}

/// 每个子视图的 position 与下标一致
pub(crate) fn assert_positions(tree: &ViewTree, container: ViewId) {
    let items = tree.items(container).unwrap().to_vec();
    for (i, id) in items.iter().enumerate() {
        assert_eq!(tree.position(*id), Some(i), "position of {:?}", id);
        assert_eq!(tree.parent(*id), Some(container));
    }
    let role = tree.view(container).unwrap().role();
    assert_eq!(role.container().map(|c| c.len()), Some(items.len()));
}

pub(crate) fn upper_half(tree: &mut ViewTree, item: ViewId) -> Point {
    let node = tree.live_node(item).unwrap();
    let b = tree.target_mut().bounds(node).unwrap();
    Point::new(b.x + 1.0, b.y + 2.0)
}

pub(crate) fn lower_half(tree: &mut ViewTree, item: ViewId) -> Point {
    let node = tree.live_node(item).unwrap();
    let b = tree.target_mut().bounds(node).unwrap();
    Point::new(b.x + 1.0, b.bottom() - 2.0)
}
