//! 模板表达式 - 针对视图状态（JSON）求值 {{}} 绑定

use serde_json::Value as JsonValue;

/// 模板引擎
pub struct TemplateEngine;

impl TemplateEngine {
    /// 插值替换 {{expression}}
    pub fn interpolate(template: &str, data: &JsonValue) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open..].find("}}") else { break };
            out.push_str(&rest[..open]);
            let expr = &rest[open + 2..open + close];
            out.push_str(&Self::evaluate_expression(expr, data));
            rest = &rest[open + close + 2..];
        }
        out.push_str(rest);
        out
    }

    /// 模板中是否含有绑定
    pub fn has_bindings(template: &str) -> bool {
        template.find("{{").map_or(false, |i| template[i..].contains("}}"))
    }

    /// 去掉外层 {{}}
    pub fn strip_braces(s: &str) -> &str {
        let s = s.trim();
        if s.starts_with("{{") && s.ends_with("}}") && s.len() >= 4 {
            s[2..s.len() - 2].trim()
        } else {
            s
        }
    }

    /// 计算表达式，结果转为字符串
    pub fn evaluate_expression(expr: &str, data: &JsonValue) -> String {
        let expr = expr.trim();

        // 三元表达式: cond ? a : b
        if let Some(q) = expr.find('?') {
            if let Some(c) = expr[q..].find(':') {
                let cond = &expr[..q];
                let then = &expr[q + 1..q + c];
                let otherwise = &expr[q + c + 1..];
                return if Self::evaluate_condition(cond, data) {
                    Self::evaluate_expression(then, data)
                } else {
                    Self::evaluate_expression(otherwise, data)
                };
            }
        }

        if Self::is_quoted(expr) {
            return expr[1..expr.len() - 1].to_string();
        }
        if expr.parse::<f64>().is_ok() {
            return expr.to_string();
        }
        match Self::lookup(expr, data) {
            Some(v) => Self::json_to_string(v),
            None => String::new(),
        }
    }

    /// 计算条件表达式
    pub fn evaluate_condition(expr: &str, data: &JsonValue) -> bool {
        let expr = Self::strip_braces(expr);

        if let Some(inner) = expr.strip_prefix('!') {
            if !inner.starts_with('=') {
                return !Self::evaluate_condition(inner, data);
            }
        }

        for op in ["===", "!==", "==", "!=", ">=", "<=", ">", "<"] {
            if let Some(pos) = expr.find(op) {
                let left = Self::evaluate_expression(&expr[..pos], data);
                let right = Self::evaluate_expression(&expr[pos + op.len()..], data);
                let num = |s: &str| s.parse::<f64>().unwrap_or(0.0);
                return match op {
                    "===" | "==" => left == right,
                    "!==" | "!=" => left != right,
                    ">" => num(&left) > num(&right),
                    "<" => num(&left) < num(&right),
                    ">=" => num(&left) >= num(&right),
                    _ => num(&left) <= num(&right),
                };
            }
        }

        match expr {
            "true" => return true,
            "false" | "" => return false,
            _ => {}
        }

        Self::lookup(expr, data).map(Self::is_truthy).unwrap_or(false)
    }

    /// 按路径取值，支持 a.b 与 a[0]
    pub fn lookup<'a>(path: &str, data: &'a JsonValue) -> Option<&'a JsonValue> {
        let mut current = data;
        for part in path.trim().split('.') {
            match part.find('[') {
                Some(bracket) => {
                    let name = &part[..bracket];
                    if !name.is_empty() {
                        current = current.get(name)?;
                    }
                    let index = part[bracket + 1..].trim_end_matches(']').parse::<usize>().ok()?;
                    current = current.get(index)?;
                }
                None => current = current.get(part)?,
            }
        }
        Some(current)
    }

    pub fn json_to_string(value: &JsonValue) -> String {
        match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_truthy(value: &JsonValue) -> bool {
        match value {
            JsonValue::Null => false,
            JsonValue::Bool(b) => *b,
            JsonValue::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
            JsonValue::String(s) => !s.is_empty(),
            JsonValue::Array(a) => !a.is_empty(),
            JsonValue::Object(_) => true,
        }
    }

    fn is_quoted(s: &str) -> bool {
        s.len() >= 2
            && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    }
}
