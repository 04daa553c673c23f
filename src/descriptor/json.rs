//! 从 JSON 加载静态描述符
//!
//! ```json
//! { "kind": "ul", "ref": "content", "children": [
//!     { "kind": "li", "text": "{{first}}", "visibleIf": "!hideFirst" },
//!     "plain text"
//! ] }
//! ```

use super::{Binding, Child, Condition, Descriptor, TemplateEngine};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// 描述符的可序列化形式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorSpec {
    pub kind: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, JsonValue>,
    /// 含 {{}} 时作为模板绑定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<String>,
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildSpec {
    Node(DescriptorSpec),
    Value(JsonValue),
}

impl DescriptorSpec {
    pub fn into_descriptor(self) -> Descriptor {
        let mut d = Descriptor::new(&self.kind);
        for (k, v) in self.attrs {
            d = d.attr(&k, v);
        }
        if let Some(text) = self.text {
            d = d.text(text_binding(text));
        }
        if let Some(expr) = self.visible_if {
            d = d.push_visibility(Condition::Expr(expr));
        }
        if let Some(name) = self.name {
            d = d.named(&name);
        }
        for child in self.children {
            d = d.child(child.into_child());
        }
        d
    }
}

impl ChildSpec {
    pub fn into_child(self) -> Child {
        match self {
            ChildSpec::Node(spec) => Child::Node(spec.into_descriptor()),
            ChildSpec::Value(JsonValue::String(s)) if TemplateEngine::has_bindings(&s) => {
                Child::Dynamic(Binding::Template(s))
            }
            ChildSpec::Value(v) => Child::Value(v),
        }
    }
}

fn text_binding(text: String) -> Binding {
    if TemplateEngine::has_bindings(&text) {
        Binding::Template(text)
    } else {
        Binding::Const(text)
    }
}

impl Descriptor {
    /// 解析 JSON 描述符
    pub fn from_json(json: &str) -> Result<Descriptor> {
        let spec: DescriptorSpec = serde_json::from_str(json)?;
        Ok(spec.into_descriptor())
    }

    fn push_visibility(self, condition: Condition) -> Self {
        self.push_attr(super::Attr::Visibility(condition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Attr;

    #[test]
    fn test_from_json() {
        let d = Descriptor::from_json(r#"{
            "kind": "ul",
            "ref": "content",
            "attrs": { "role": "listbox" },
            "children": [
                { "kind": "li", "text": "{{first}}", "visibleIf": "!hideFirst" },
                "plain",
                "{{count}} left",
                3
            ]
        }"#).unwrap();

        assert_eq!(d.kind(), "ul");
        assert!(d.attrs().iter().any(|a| matches!(a, Attr::NamedRef(n) if n == "content")));
        let children = d.children();
        assert_eq!(children.len(), 4);
        assert!(matches!(&children[0], Child::Node(li) if li.attrs().len() == 2));
        assert!(matches!(&children[1], Child::Value(_)));
        assert!(matches!(&children[2], Child::Dynamic(Binding::Template(_))));
        assert!(matches!(&children[3], Child::Value(v) if v == &JsonValue::from(3)));
    }

    #[test]
    fn test_from_json_rejects_missing_kind() {
        assert!(Descriptor::from_json(r#"{ "children": [] }"#).is_err());
    }
}
