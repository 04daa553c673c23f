//! Mini View 演示程序

use mini_view::event::{Event, Modifiers, PointerEvent};
use mini_view::widgets::{ListBox, ListRow, Panel};
use mini_view::{Descriptor, ListOptions, RenderTarget, TreeConfig, ViewTree};
use serde_json::json;
use std::time::Instant;

fn main() -> mini_view::Result<()> {
    env_logger::init();
    println!("🚀 Mini View demo starting...");

    mini_view::i18n::set_translator(|key| match key {
        "list.empty" => "没有条目".to_string(),
        other => other.to_string(),
    });

    let config = TreeConfig::from_json(r#"{ "viewportWidth": 375, "drag": { "failsafeMs": 5000 } }"#)?;
    let mut tree: ViewTree = ViewTree::new(config);

    // 页面：面板 + 列表
    let panel = tree.add_container(Panel, json!({ "title": "待办事项" }))?;
    let list = tree.add_list(ListBox, json!({}), ListOptions::default())?;
    tree.insert(panel, list, None)?;

    let labels = ["学习 Rust", "完成视图核心", "添加拖拽", "写测试", "发布"];
    let mut rows = Vec::new();
    for (i, label) in labels.iter().enumerate() {
        let row = tree.add_item(ListRow::new("{{index}}. {{label}}"), json!({ "index": i + 1, "label": label }))?;
        tree.insert(list, row, None)?;
        rows.push(row);
    }

    // JSON 描述的页脚
    let footer = Descriptor::from_json(r#"{ "kind": "text", "text": "共 {{count}} 项" }"#)?;
    let footer_view = tree.add(move |_: &serde_json::Value| footer.clone(), json!({ "count": labels.len() }))?;
    tree.insert(panel, footer_view, None)?;

    let root = tree.mount(panel)?;
    println!("✅ Mounted panel with {} rows", rows.len());

    // 点击第二项，再 Shift 点击第四项
    for (row, modifiers) in [(rows[1], Modifiers::NONE), (rows[3], Modifiers::SHIFT)] {
        if let Some(node) = tree.live_node(row) {
            tree.dispatch(node, &Event::Click(PointerEvent::at(10.0, 10.0).with_modifiers(modifiers)))?;
        }
    }
    println!("✅ Selected: {:?}", tree.selected_items(list)?);

    // 把选中的三项拖到最后一项之后
    let session = tree.drag_start(rows[1], Instant::now())?;
    let last = rows[4];
    if let Some(bounds) = tree.live_node(last).and_then(|n| tree.target_mut().bounds(n)) {
        let pointer = mini_view::Point::new(bounds.x + 4.0, bounds.bottom() - 2.0);
        tree.drag_enter(&session, last)?;
        println!("   drag over -> {:?}", tree.drag_over(&session, last, pointer)?);
        tree.drop_on_item(&session, last, pointer)?;
    }
    tree.drag_end(session);

    let count = tree.items(list)?.len();
    tree.update_with(footer_view, json!({ "count": count }))?;

    println!("\n--- Events ---");
    for event in tree.take_events() {
        println!("   {:?}", event);
    }

    println!("\n--- Render tree ---");
    print!("{}", tree.target().dump(root));
    println!("\n✅ Text: {}", tree.target().text(root).unwrap_or_default());
    Ok(())
}
