//! 特性 / 兼容性开关
//!
//! 同一组开关必须一致地应用到链接中的每个翻译单元，包括只用于绑定
//! 生成的声明单元。否则头文件在不同单元中声明的符号集合会出现分歧，
//! 绑定与实际链接的符号不再一致。
//!
//! 一致性通过 [`FlagFingerprint`] 检查：对每个单元可见的宏（单一定义宏除外）
//! 排序后做 BLAKE3 摘要，整个链接中的摘要必须完全相同。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::header::{LibraryHeader, APPLE_GL, UNIX_GLCORE, UNIX_GLES3};
use crate::gfx::Backend;

/// 主循环归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    /// 调用方驱动主循环（`SOKOL_NO_ENTRY`）
    Caller,
    /// 库提供 `main` 并拥有事件循环
    Library,
}

/// UI 集成头的类型定义模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiTypeMode {
    /// 输出 cimgui 的 enum / struct 定义（`CIMGUI_DEFINE_ENUMS_AND_STRUCTS`）
    Define,
    /// 只保留声明
    Declare,
}

/// 特性开关集合
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// 屏蔽弃用 API
    #[serde(default = "default_true")]
    pub no_deprecated: bool,

    /// 启用诊断 trace hook
    #[serde(default = "default_true")]
    pub trace_hooks: bool,

    /// 主循环归属
    #[serde(default = "default_entry")]
    pub entry: EntryMode,

    /// cimgui 类型定义模式
    #[serde(default = "default_ui_types")]
    pub ui_types: UiTypeMode,

    /// 调试构建（`SOKOL_DEBUG` + `_DEBUG`）
    #[serde(default)]
    pub debug: bool,
}

fn default_true() -> bool { true }
fn default_entry() -> EntryMode { EntryMode::Caller }
fn default_ui_types() -> UiTypeMode { UiTypeMode::Define }

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            no_deprecated: default_true(),
            trace_hooks: default_true(),
            entry: default_entry(),
            ui_types: default_ui_types(),
            debug: false,
        }
    }
}

/// 一条预处理器宏定义
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn flag(name: impl Into<String>) -> Self {
        Self { name: name.into(), value: None }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: Some(value.into()) }
    }

    /// `NAME` 或 `NAME=VALUE`
    pub fn canonical(&self) -> String {
        match &self.value {
            Some(value) => format!("{}={}", self.name, value),
            None => self.name.clone(),
        }
    }

    /// 编译器 / clang 的 `-D` 参数
    pub fn to_arg(&self) -> String {
        format!("-D{}", self.canonical())
    }

    /// 是否为单一定义宏
    pub fn is_impl_macro(&self) -> bool {
        self.name == "SOKOL_IMPL"
            || LibraryHeader::ALL
                .iter()
                .any(|h| h.impl_macro() == Some(self.name.as_str()))
    }

    /// 只对单个单元有意义的宏：单一定义宏与预包含头的宏，不参与一致性指纹
    pub fn is_unit_local(&self) -> bool {
        self.is_impl_macro()
            || [APPLE_GL, UNIX_GLCORE, UNIX_GLES3]
                .iter()
                .any(|pre| pre.defines.iter().any(|d| *d == self.name))
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// 全链接统一的开关集合：后端宏 + 特性宏
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSet {
    pub backend: Backend,
    pub flags: FeatureFlags,
    /// 链接中是否包含 UI overlay（决定 cimgui 类型定义开关是否生效）
    pub overlay: bool,
}

impl GateSet {
    pub fn new(backend: Backend, flags: FeatureFlags, overlay: bool) -> Self {
        Self { backend, flags, overlay }
    }

    /// 按固定顺序列出所有开关宏
    pub fn defines(&self) -> Vec<Define> {
        let mut defines = vec![Define::flag(self.backend.macro_name())];

        if self.flags.no_deprecated {
            defines.push(Define::flag("SOKOL_NO_DEPRECATED"));
        }
        if self.flags.trace_hooks {
            defines.push(Define::flag("SOKOL_TRACE_HOOKS"));
        }
        if self.flags.entry == EntryMode::Caller {
            defines.push(Define::flag("SOKOL_NO_ENTRY"));
        }
        if self.overlay && self.flags.ui_types == UiTypeMode::Define {
            defines.push(Define::flag("CIMGUI_DEFINE_ENUMS_AND_STRUCTS"));
        }
        if self.flags.debug {
            defines.push(Define::flag("_DEBUG"));
            defines.push(Define::flag("SOKOL_DEBUG"));
        }

        defines
    }

    pub fn fingerprint(&self) -> FlagFingerprint {
        FlagFingerprint::of(&self.defines())
    }
}

/// 单元可见开关的摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagFingerprint {
    digest: String,
    canonical: Vec<String>,
}

impl FlagFingerprint {
    /// 计算摘要：忽略单元局部的宏，排序去重后哈希
    pub fn of<'a>(defines: impl IntoIterator<Item = &'a Define>) -> Self {
        let mut canonical: Vec<String> = defines
            .into_iter()
            .filter(|d| !d.is_unit_local())
            .map(Define::canonical)
            .collect();
        canonical.sort();
        canonical.dedup();

        let digest = blake3::hash(canonical.join("\n").as_bytes()).to_hex().to_string();
        Self { digest, canonical }
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// 参与摘要的宏列表（已排序）
    pub fn canonical(&self) -> &[String] {
        &self.canonical
    }

    /// 短摘要，用于日志
    pub fn short(&self) -> &str {
        &self.digest[..16]
    }
}

impl fmt::Display for FlagFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.short(), self.canonical.join(" "))
    }
}
