//! 列表选择测试

use super::{mounted_list, mounted_list_with};
use crate::config::ListOptions;
use crate::event::{Event, Key, KeyEvent, Modifiers, PointerEvent};
use crate::render::RenderTarget;
use crate::view::ListEvent;
use serde_json::json;

#[test]
fn test_force_toggle_is_idempotent() {
    let (mut tree, list, rows) = mounted_list(&["a", "b"]);
    assert!(tree.toggle_item_selection(rows[0], Some(true)).unwrap());
    assert!(!tree.toggle_item_selection(rows[0], Some(true)).unwrap());
    assert_eq!(tree.selected_items(list).unwrap(), vec![rows[0]]);

    let selected: Vec<_> = tree
        .take_events()
        .into_iter()
        .filter(|e| matches!(e, ListEvent::Selected { .. }))
        .collect();
    assert_eq!(selected, vec![ListEvent::Selected { list, item: rows[0] }]);
}

#[test]
fn test_selected_flag_and_attribute_follow_toggle() {
    let (mut tree, _, rows) = mounted_list(&["a"]);
    let node = tree.live_node(rows[0]).unwrap();
    tree.toggle_item_selection(rows[0], None).unwrap();
    assert!(tree.is_selected(rows[0]));
    assert_eq!(tree.target().attribute(node, "selected"), Some(json!(true)));
    tree.toggle_item_selection(rows[0], None).unwrap();
    assert!(!tree.is_selected(rows[0]));
    assert_eq!(tree.target().attribute(node, "selected"), Some(json!(false)));
}

#[test]
fn test_shift_click_mirrors_anchor_selection() {
    let (mut tree, list, rows) = mounted_list(&["A", "B", "C", "D"]);
    // A 被点击选中并成为锚点
    tree.handle_item_click(rows[0], Modifiers::NONE).unwrap();
    tree.handle_item_click(rows[3], Modifiers::SHIFT).unwrap();
    assert_eq!(tree.selected_items(list).unwrap(), rows);
}

#[test]
fn test_shift_click_upwards_deselects_when_anchor_is_off() {
    let (mut tree, list, rows) = mounted_list(&["A", "B", "C", "D"]);
    tree.select_all(list).unwrap();
    tree.handle_item_click(rows[3], Modifiers::NONE).unwrap();
    tree.handle_item_click(rows[0], Modifiers::SHIFT).unwrap();
    assert!(tree.selected_items(list).unwrap().is_empty());
}

#[test]
fn test_removing_selected_item_drops_it_from_selection() {
    let (mut tree, list, rows) = mounted_list(&["a", "b", "c"]);
    tree.toggle_item_selection(rows[1], Some(true)).unwrap();
    tree.toggle_item_selection(rows[2], Some(true)).unwrap();
    tree.take_events();

    tree.remove(list, rows[1]).unwrap();
    assert_eq!(tree.selected_items(list).unwrap(), vec![rows[2]]);
    assert!(!tree.is_selected(rows[1]));
    assert!(tree
        .take_events()
        .contains(&ListEvent::Deselected { list, item: rows[1] }));
}

#[test]
fn test_disabling_selection_clears_it() {
    let (mut tree, list, rows) = mounted_list(&["a", "b"]);
    tree.select_all(list).unwrap();
    tree.set_selection_enabled(list, false).unwrap();
    assert!(tree.selected_items(list).unwrap().is_empty());
    assert!(!tree.is_selected(rows[0]));

    // 关闭后点击交给普通点击处理
    assert!(!tree.handle_item_click(rows[0], Modifiers::NONE).unwrap());
    assert!(tree
        .take_events()
        .contains(&ListEvent::ItemClicked { list, item: rows[0] }));
    assert!(!tree.toggle_item_selection(rows[0], Some(true)).unwrap());
}

#[test]
fn test_ctrl_click_forces_selection_when_allowed() {
    let options = ListOptions { selection_enabled: false, ctrl_forces_selection: true, ..Default::default() };
    let (mut tree, list, rows) = mounted_list_with(&["a", "b"], options);
    assert!(!tree.handle_item_click(rows[0], Modifiers::NONE).unwrap());
    assert!(tree.handle_item_click(rows[1], Modifiers::CTRL).unwrap());
    assert_eq!(tree.selected_items(list).unwrap(), vec![rows[1]]);
}

#[test]
fn test_ctrl_a_selects_all() {
    let (mut tree, list, rows) = mounted_list(&["a", "b", "c"]);
    let ctrl_a = KeyEvent::new(Key::Char('a')).with_modifiers(Modifiers::CTRL);
    assert!(tree.handle_key(list, &ctrl_a).unwrap());
    assert_eq!(tree.selected_items(list).unwrap(), rows);

    tree.set_selection_enabled(list, false).unwrap();
    assert!(!tree.handle_key(list, &ctrl_a).unwrap());
}

#[test]
fn test_click_dispatch_from_inner_node() {
    let (mut tree, list, rows) = mounted_list(&["a", "b"]);
    let row_node = tree.live_node(rows[1]).unwrap();
    // 点在行内的文本节点上，冒泡到行
    let text_node = tree.target().children(row_node)[0];
    assert!(tree.dispatch(text_node, &Event::Click(PointerEvent::at(3.0, 3.0))).unwrap());
    assert_eq!(tree.selected_items(list).unwrap(), vec![rows[1]]);
}

#[test]
fn test_selection_survives_move() {
    let (mut tree, list, rows) = mounted_list(&["a", "b", "c"]);
    tree.toggle_item_selection(rows[0], Some(true)).unwrap();
    tree.move_item(list, rows[0], 2).unwrap();
    assert!(tree.is_selected(rows[0]));
    assert_eq!(tree.selected_items(list).unwrap(), vec![rows[0]]);
    assert_eq!(tree.position(rows[0]), Some(2));
}
