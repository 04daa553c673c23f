//! 本地化文本查找
//!
//! 核心本身没有语言状态，只在需要本地化文本时调用这里注册的查找函数。

use once_cell::sync::Lazy;
use std::sync::RwLock;

type Translator = Box<dyn Fn(&str) -> String + Send + Sync>;

static TRANSLATOR: Lazy<RwLock<Option<Translator>>> = Lazy::new(|| RwLock::new(None));

/// 注册查找函数
pub fn set_translator<F>(f: F)
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    match TRANSLATOR.write() {
        Ok(mut slot) => *slot = Some(Box::new(f)),
        Err(e) => log::warn!("translator lock poisoned: {}", e),
    }
}

pub fn clear_translator() {
    if let Ok(mut slot) = TRANSLATOR.write() {
        *slot = None;
    }
}

/// 查找本地化文本，未注册查找函数时原样返回 key
pub fn tr(key: &str) -> String {
    match TRANSLATOR.read() {
        Ok(slot) => slot.as_ref().map(|f| f(key)).unwrap_or_else(|| key.to_string()),
        Err(_) => key.to_string(),
    }
}
