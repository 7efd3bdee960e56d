//! 实现 bundle
//!
//! 一个 bundle 是一组必须在同一翻译单元中编译的库头文件。每个 bundle 只有一个
//! 实现单元；其它单元可以用声明模式包含相同的头文件。
//!
//! `Graphics` 与 `Platform` 是同一个 "core" 策略的两种参数化形式（是否带窗口层），
//! 二者都实现 `sokol_gfx.h`，因此不能出现在同一个链接中。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::header::LibraryHeader;
use crate::core::error::AssemblyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Bundle {
    /// 独立的核心图形层：`sokol_gfx.h`
    Graphics,
    /// 核心图形 + 窗口层：`sokol_app.h` + `sokol_gfx.h` + `sokol_glue.h`
    Platform,
    /// UI overlay：`sokol_imgui.h` + `sokol_gfx_imgui.h`
    Overlay,
    /// 文字渲染：`fontstash.h` + `sokol_fontstash.h`
    Text,
}

impl Bundle {
    pub const ALL: [Bundle; 4] = [Bundle::Graphics, Bundle::Platform, Bundle::Overlay, Bundle::Text];

    /// 核心策略：是否带窗口层
    pub fn core(windowing: bool) -> Self {
        if windowing {
            Bundle::Platform
        } else {
            Bundle::Graphics
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Bundle::Graphics => "graphics",
            Bundle::Platform => "platform",
            Bundle::Overlay => "overlay",
            Bundle::Text => "text",
        }
    }

    /// 本 bundle 负责实现的头文件
    pub fn implements(&self) -> &'static [LibraryHeader] {
        match self {
            Bundle::Graphics => &[LibraryHeader::Gfx],
            Bundle::Platform => &[LibraryHeader::App, LibraryHeader::Gfx, LibraryHeader::Glue],
            Bundle::Overlay => &[LibraryHeader::Imgui, LibraryHeader::GfxImgui],
            Bundle::Text => &[LibraryHeader::Fontstash, LibraryHeader::SokolFontstash],
        }
    }

    /// 本 bundle 只以声明模式包含的头文件（实现由其它 bundle 提供）
    pub fn declares(&self) -> &'static [LibraryHeader] {
        match self {
            Bundle::Graphics | Bundle::Platform => &[],
            Bundle::Overlay => &[LibraryHeader::App, LibraryHeader::Gfx, LibraryHeader::Cimgui],
            Bundle::Text => &[LibraryHeader::Gfx],
        }
    }

    /// 单元需要包含的全部头文件
    pub fn headers(&self) -> Vec<LibraryHeader> {
        let mut headers: Vec<LibraryHeader> = self.declares().to_vec();
        headers.extend_from_slice(self.implements());
        headers
    }

    /// 是否包含窗口层实现
    pub fn has_windowing(&self) -> bool {
        self.implements().contains(&LibraryHeader::App)
    }

    /// 实现单元的文件名
    pub fn unit_file_name(&self) -> String {
        format!("sokol_{}_impl.c", self.name())
    }

    /// 编译产物（静态库）名
    pub fn lib_name(&self) -> String {
        format!("sokol_{}", self.name())
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Bundle {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graphics" | "gfx" | "impl-gfx" => Ok(Bundle::Graphics),
            "platform" | "app" | "impl-app" | "glue" => Ok(Bundle::Platform),
            "overlay" | "imgui" => Ok(Bundle::Overlay),
            "text" | "fontstash" => Ok(Bundle::Text),
            _ => Err(AssemblyError::UnknownBundle(s.to_string())),
        }
    }
}

impl TryFrom<String> for Bundle {
    type Error = AssemblyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Bundle> for String {
    fn from(bundle: Bundle) -> Self {
        bundle.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_policy() {
        assert_eq!(Bundle::core(false), Bundle::Graphics);
        assert_eq!(Bundle::core(true), Bundle::Platform);
        assert!(Bundle::Platform.has_windowing());
        assert!(!Bundle::Graphics.has_windowing());
    }

    #[test]
    fn test_implements_and_declares_are_disjoint() {
        for bundle in Bundle::ALL {
            for header in bundle.implements() {
                assert!(!bundle.declares().contains(header), "{} in {}", header, bundle);
            }
        }
    }

    #[test]
    fn test_names_round_trip_through_parse() {
        for bundle in Bundle::ALL {
            assert_eq!(bundle.name().parse::<Bundle>(), Ok(bundle));
        }
        assert_eq!("impl-app".parse::<Bundle>(), Ok(Bundle::Platform));
        assert!("audio".parse::<Bundle>().is_err());
    }
}
