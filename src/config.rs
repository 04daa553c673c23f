//! 配置结构体

use crate::error::Result;
use crate::materialize::DEFAULT_TTL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 视图树配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeConfig {
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f32,
    /// 描述符递归深度预算
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub drag: DragConfig,
}

fn default_viewport_width() -> f32 { 375.0 }
fn default_ttl() -> u32 { DEFAULT_TTL }

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_viewport_width(),
            ttl: default_ttl(),
            drag: DragConfig::default(),
        }
    }
}

impl TreeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 拖拽配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragConfig {
    /// 超过这个时间仍未收到 drag-end 的手势会被强制清理
    #[serde(default = "default_failsafe_ms")]
    pub failsafe_ms: u64,
}

fn default_failsafe_ms() -> u64 { 10_000 }

impl Default for DragConfig {
    fn default() -> Self {
        Self { failsafe_ms: default_failsafe_ms() }
    }
}

impl DragConfig {
    pub fn failsafe(&self) -> Duration {
        Duration::from_millis(self.failsafe_ms)
    }
}

/// 列表选项
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOptions {
    /// 同一列表内拖拽是否重排
    #[serde(default = "default_true")]
    pub reorderable: bool,
    #[serde(default = "default_true")]
    pub selection_enabled: bool,
    /// 选择关闭时按住 Ctrl 点击可强制开启选择
    #[serde(default)]
    pub ctrl_forces_selection: bool,
    /// PageUp/PageDown 移动的条目数
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_true() -> bool { true }
fn default_page_size() -> usize { 10 }

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            reorderable: true,
            selection_enabled: true,
            ctrl_forces_selection: false,
            page_size: default_page_size(),
        }
    }
}
