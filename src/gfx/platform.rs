//! 宿主平台标识
//!
//! 平台在构建配置阶段由目标工具链确定一次，之后不再改变。
//! 它决定了哪些原生图形头文件必须在库头文件之前可见。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::SelectionError;

/// 目标平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Platform {
    /// Linux / BSD 桌面（X11 + 原生 GL）
    Unix,
    /// macOS 桌面（Cocoa + OpenGL/Metal framework）
    Apple,
    /// Windows 桌面
    Windows,
    /// 其余目标（wasm、移动端等）
    Other,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Platform::Unix, Platform::Apple, Platform::Windows, Platform::Other];

    /// 根据 `CARGO_CFG_TARGET_OS` 的取值确定平台
    pub fn from_target_os(target_os: &str) -> Self {
        match target_os {
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Platform::Unix,
            "macos" => Platform::Apple,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }

    /// 小写标识，用于配置文件与命令行
    pub fn token(&self) -> &'static str {
        match self {
            Platform::Unix => "unix",
            Platform::Apple => "apple",
            Platform::Windows => "windows",
            Platform::Other => "other",
        }
    }

    /// 获取平台名称
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Unix => "Unix desktop",
            Platform::Apple => "Apple desktop",
            Platform::Windows => "Windows desktop",
            Platform::Other => "other platform",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Platform {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unix" | "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Ok(Platform::Unix),
            "apple" | "macos" | "darwin" => Ok(Platform::Apple),
            "windows" | "win32" => Ok(Platform::Windows),
            "other" => Ok(Platform::Other),
            _ => Err(SelectionError::UnknownPlatform(s.to_string())),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = SelectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.token().to_string()
    }
}
