//! 内置小部件
//!
//! 只用视图核心公开的能力拼出来：描述符 + 绑定 + 命名节点。

use crate::descriptor::Descriptor;
use crate::view::Materializable;
use serde_json::Value as JsonValue;

/// 列表行高度
pub const ROW_HEIGHT: f32 = 24.0;

/// 文本标签，内容是模板
pub struct Label {
    template: String,
}

impl Label {
    pub fn new(template: &str) -> Self {
        Self { template: template.to_string() }
    }
}

impl Materializable for Label {
    fn describe(&self, _state: &JsonValue) -> Descriptor {
        Descriptor::new("text").class("label").text_template(&self.template)
    }
}

/// 带标题的面板，子视图放在 "content" 节点里
pub struct Panel;

impl Materializable for Panel {
    fn describe(&self, _state: &JsonValue) -> Descriptor {
        Descriptor::new("view")
            .class("panel")
            .child(
                Descriptor::new("text")
                    .class("panel-title")
                    .text_template("{{title}}")
                    .visible_if("title"),
            )
            .child(Descriptor::new("view").class("panel-body").named("content"))
    }
}

/// 列表容器，没有条目时显示本地化的空提示
pub struct ListBox;

impl Materializable for ListBox {
    fn describe(&self, _state: &JsonValue) -> Descriptor {
        Descriptor::new("ul")
            .class("list-box")
            .attr("role", "listbox")
            .child(
                Descriptor::new("text")
                    .class("list-box-empty")
                    .named("empty")
                    .localized("list.empty")
                    .visible_if("empty"),
            )
            .child(Descriptor::new("view").class("list-box-items").named("content"))
    }
}

/// 列表行，状态里 `hidden` 为真时隐藏
pub struct ListRow {
    template: String,
}

impl ListRow {
    pub fn new(template: &str) -> Self {
        Self { template: template.to_string() }
    }
}

impl Default for ListRow {
    fn default() -> Self {
        Self::new("{{label}}")
    }
}

impl Materializable for ListRow {
    fn describe(&self, _state: &JsonValue) -> Descriptor {
        Descriptor::new("li")
            .class("list-row")
            .attr("height", ROW_HEIGHT)
            .attr("draggable", true)
            .text_template(&self.template)
            .visible_if("!hidden")
    }
}
