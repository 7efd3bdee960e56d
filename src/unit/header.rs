//! 头文件聚合
//!
//! 描述每个库头文件在翻译单元中的位置：所属分组、依赖的其它头文件、
//! 单一定义宏，以及各平台 / 后端组合要求的预包含头。
//!
//! 预包含头必须出现在任何库头文件之前，因为库的实现代码假定平台 GL
//! 入口已经声明。这个顺序约束由 [`HeaderPlan::validate`] 显式检查，
//! 而不是依赖手写文件中的文本顺序。

use std::fmt;

use crate::core::error::{AssemblyError, Result};
use crate::gfx::{Backend, Platform};

/// 头文件分组，按包含顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderGroup {
    PreInclude,
    Windowing,
    Graphics,
    Glue,
    UiCore,
    UiBackend,
    Text,
}

/// 库头文件
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LibraryHeader {
    /// `sokol_app.h`
    App,
    /// `sokol_gfx.h`
    Gfx,
    /// `sokol_glue.h`
    Glue,
    /// `cimgui.h`
    Cimgui,
    /// `util/sokol_imgui.h`
    Imgui,
    /// `util/sokol_gfx_imgui.h`
    GfxImgui,
    /// `fontstash.h`
    Fontstash,
    /// `util/sokol_fontstash.h`
    SokolFontstash,
}

impl LibraryHeader {
    pub const ALL: [LibraryHeader; 8] = [
        LibraryHeader::App,
        LibraryHeader::Gfx,
        LibraryHeader::Glue,
        LibraryHeader::Cimgui,
        LibraryHeader::Imgui,
        LibraryHeader::GfxImgui,
        LibraryHeader::Fontstash,
        LibraryHeader::SokolFontstash,
    ];

    /// 头文件名（相对于 include 路径）
    pub fn file_name(&self) -> &'static str {
        match self {
            LibraryHeader::App => "sokol_app.h",
            LibraryHeader::Gfx => "sokol_gfx.h",
            LibraryHeader::Glue => "sokol_glue.h",
            LibraryHeader::Cimgui => "cimgui.h",
            LibraryHeader::Imgui => "sokol_imgui.h",
            LibraryHeader::GfxImgui => "sokol_gfx_imgui.h",
            LibraryHeader::Fontstash => "fontstash.h",
            LibraryHeader::SokolFontstash => "sokol_fontstash.h",
        }
    }

    pub fn group(&self) -> HeaderGroup {
        match self {
            LibraryHeader::App => HeaderGroup::Windowing,
            LibraryHeader::Gfx => HeaderGroup::Graphics,
            LibraryHeader::Glue => HeaderGroup::Glue,
            LibraryHeader::Cimgui => HeaderGroup::UiCore,
            LibraryHeader::Imgui | LibraryHeader::GfxImgui => HeaderGroup::UiBackend,
            LibraryHeader::Fontstash | LibraryHeader::SokolFontstash => HeaderGroup::Text,
        }
    }

    /// 在同一翻译单元中必须先于本头文件出现的头文件
    pub fn requires(&self) -> &'static [LibraryHeader] {
        match self {
            LibraryHeader::App | LibraryHeader::Gfx | LibraryHeader::Cimgui | LibraryHeader::Fontstash => &[],
            LibraryHeader::Glue => &[LibraryHeader::App, LibraryHeader::Gfx],
            LibraryHeader::Imgui => &[LibraryHeader::App, LibraryHeader::Gfx, LibraryHeader::Cimgui],
            LibraryHeader::GfxImgui => &[LibraryHeader::Gfx, LibraryHeader::Imgui],
            LibraryHeader::SokolFontstash => &[LibraryHeader::Gfx, LibraryHeader::Fontstash],
        }
    }

    /// 单一定义宏
    ///
    /// `cimgui.h` 的实现是 C++ 的 Dear ImGui 本体，不在这里编译，所以没有实现宏。
    pub fn impl_macro(&self) -> Option<&'static str> {
        match self {
            LibraryHeader::App => Some("SOKOL_APP_IMPL"),
            LibraryHeader::Gfx => Some("SOKOL_GFX_IMPL"),
            LibraryHeader::Glue => Some("SOKOL_GLUE_IMPL"),
            LibraryHeader::Cimgui => None,
            LibraryHeader::Imgui => Some("SOKOL_IMGUI_IMPL"),
            LibraryHeader::GfxImgui => Some("SOKOL_GFX_IMGUI_IMPL"),
            LibraryHeader::Fontstash => Some("FONTSTASH_IMPLEMENTATION"),
            LibraryHeader::SokolFontstash => Some("SOKOL_FONTSTASH_IMPL"),
        }
    }

    /// 是否响应 sokol 的统一开关 `SOKOL_IMPL`
    pub fn honors_sokol_impl(&self) -> bool {
        !matches!(self, LibraryHeader::Cimgui | LibraryHeader::Fontstash)
    }

    /// 是否位于 sokol 的 `util/` 目录
    pub fn in_util(&self) -> bool {
        matches!(
            self,
            LibraryHeader::Imgui | LibraryHeader::GfxImgui | LibraryHeader::SokolFontstash
        )
    }

    /// 导出符号的前缀，供绑定生成器做 allowlist
    pub fn symbol_prefixes(&self) -> &'static [&'static str] {
        match self {
            LibraryHeader::App => &["sapp_"],
            LibraryHeader::Gfx => &["sg_"],
            LibraryHeader::Glue => &["sglue_", "sapp_sgcontext"],
            LibraryHeader::Cimgui => &["ig", "ImGui", "Im"],
            LibraryHeader::Imgui => &["simgui_"],
            LibraryHeader::GfxImgui => &["sgimgui_", "sg_imgui_"],
            LibraryHeader::Fontstash => &["fons"],
            LibraryHeader::SokolFontstash => &["sfons_"],
        }
    }

    /// 通过文件名查找头文件（忽略目录前缀）
    pub fn from_file_name(name: &str) -> Option<Self> {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        Self::ALL.into_iter().find(|h| h.file_name() == base)
    }
}

impl fmt::Display for LibraryHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// 预包含头：在库头文件之前需要的宏与系统头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreInclude {
    pub defines: &'static [&'static str],
    pub system_headers: &'static [&'static str],
}

/// macOS 的 OpenGL framework 头，屏蔽弃用警告
pub const APPLE_GL: PreInclude = PreInclude {
    defines: &["GL_SILENCE_DEPRECATION"],
    system_headers: &["OpenGL/gl3.h"],
};

/// Linux / BSD 的原生 GL 头（含 3.3 Core 扩展原型）
pub const UNIX_GLCORE: PreInclude = PreInclude {
    defines: &["GL_GLEXT_PROTOTYPES"],
    system_headers: &["GL/gl.h", "GL/glext.h"],
};

/// Linux / BSD 的 GLES3 头
pub const UNIX_GLES3: PreInclude = PreInclude {
    defines: &[],
    system_headers: &["GLES3/gl3.h"],
};

/// 给定平台 / 后端，以及该单元实现的头文件，返回必须的预包含头
///
/// 只有实现 `sokol_gfx.h` 的单元才需要 GL 入口声明；仅声明的单元不需要。
/// 在 macOS 上，如果同一单元也实现了 `sokol_app.h`，窗口层会自行引入
/// 平台的 GL/Metal 绑定，因此不再需要预包含。
pub fn required_pre_include(
    platform: Platform,
    backend: Backend,
    implements: &[LibraryHeader],
) -> Option<PreInclude> {
    if !backend.is_gl() || !implements.contains(&LibraryHeader::Gfx) {
        return None;
    }
    let windowing = implements.contains(&LibraryHeader::App);

    match (platform, backend) {
        (Platform::Apple, _) if windowing => None,
        (Platform::Apple, _) => Some(APPLE_GL),
        (Platform::Unix, Backend::Gles3) => Some(UNIX_GLES3),
        (Platform::Unix, _) => Some(UNIX_GLCORE),
        (Platform::Windows, _) | (Platform::Other, _) => None,
    }
}

/// 翻译单元中的一条包含项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeEntry {
    Pre(PreInclude),
    Library(LibraryHeader),
}

/// 单个翻译单元的有序头文件列表
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderPlan {
    entries: Vec<IncludeEntry>,
}

impl HeaderPlan {
    /// 按给定顺序构造（不做排序，用于检查手写顺序）
    pub fn from_entries(entries: Vec<IncludeEntry>) -> Self {
        Self { entries }
    }

    /// 为一组头文件生成规范顺序，并附加所需的预包含头
    pub fn assemble(
        headers: &[LibraryHeader],
        platform: Platform,
        backend: Backend,
        implements: &[LibraryHeader],
    ) -> Self {
        let mut sorted: Vec<LibraryHeader> = headers.to_vec();
        sorted.sort_by_key(|h| (h.group(), *h));
        sorted.dedup();

        let mut entries = Vec::with_capacity(sorted.len() + 1);
        if let Some(pre) = required_pre_include(platform, backend, implements) {
            entries.push(IncludeEntry::Pre(pre));
        }
        entries.extend(sorted.into_iter().map(IncludeEntry::Library));
        Self { entries }
    }

    pub fn entries(&self) -> &[IncludeEntry] {
        &self.entries
    }

    /// 库头文件（按包含顺序）
    pub fn library_headers(&self) -> impl Iterator<Item = LibraryHeader> + '_ {
        self.entries.iter().filter_map(|e| match e {
            IncludeEntry::Library(h) => Some(*h),
            IncludeEntry::Pre(_) => None,
        })
    }

    pub fn pre_includes(&self) -> impl Iterator<Item = &PreInclude> {
        self.entries.iter().filter_map(|e| match e {
            IncludeEntry::Pre(p) => Some(p),
            IncludeEntry::Library(_) => None,
        })
    }

    pub fn contains(&self, header: LibraryHeader) -> bool {
        self.library_headers().any(|h| h == header)
    }

    /// 验证包含顺序
    ///
    /// # 错误
    ///
    /// - `MissingPreInclude`：平台要求的预包含头缺失
    /// - `OrderViolation`：预包含头出现在库头之后，或头文件出现在其依赖之前
    /// - `MissingDependency`：依赖的头文件未被包含
    pub fn validate(
        &self,
        unit: &str,
        platform: Platform,
        backend: Backend,
        implements: &[LibraryHeader],
    ) -> Result<()> {
        if let Some(required) = required_pre_include(platform, backend, implements) {
            if !self.pre_includes().any(|p| *p == required) {
                return Err(AssemblyError::MissingPreInclude {
                    unit: unit.to_string(),
                    header: required.system_headers.join(">, <"),
                }
                .into());
            }
        }

        let mut last_library: Option<LibraryHeader> = None;
        let mut seen: Vec<LibraryHeader> = Vec::new();

        for entry in &self.entries {
            match entry {
                IncludeEntry::Pre(pre) => {
                    if let Some(last) = last_library {
                        return Err(AssemblyError::OrderViolation {
                            unit: unit.to_string(),
                            header: pre.system_headers.join(", "),
                            after: last.file_name().to_string(),
                        }
                        .into());
                    }
                }
                IncludeEntry::Library(header) => {
                    for required in header.requires() {
                        if seen.contains(required) {
                            continue;
                        }
                        return Err(if self.contains(*required) {
                            AssemblyError::OrderViolation {
                                unit: unit.to_string(),
                                header: required.file_name().to_string(),
                                after: header.file_name().to_string(),
                            }
                        } else {
                            AssemblyError::MissingDependency {
                                unit: unit.to_string(),
                                header: header.file_name().to_string(),
                                requires: required.file_name().to_string(),
                            }
                        }
                        .into());
                    }
                    seen.push(*header);
                    last_library = Some(*header);
                }
            }
        }

        Ok(())
    }
}
