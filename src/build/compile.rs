//! C 编译计划
//!
//! 每个 bundle 编译为一个独立的静态库 `libsokol_<bundle>.a`。开关宏同时写在
//! 生成的源文件里并通过 `-D` 传入，保证编排器的定义与单元内可见的定义一致。

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::config::PathsConfig;
use crate::core::error::{Result, SokolBuildError};
use crate::gfx::Platform;
use crate::unit::{Define, GateSet, LibraryHeader, TranslationUnit};

/// 头文件搜索路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludePaths {
    pub sokol: PathBuf,
    pub util: PathBuf,
    pub cimgui: PathBuf,
    pub fontstash: PathBuf,
}

impl IncludePaths {
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            sokol: paths.sokol_dir.clone(),
            util: paths.util_dir(),
            cimgui: paths.cimgui_dir.clone(),
            fontstash: paths.fontstash_dir(),
        }
    }

    /// 给定头文件集合所需的搜索路径（去重，保持顺序）
    pub fn dirs_for(&self, headers: impl IntoIterator<Item = LibraryHeader>) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = vec![self.sokol.clone()];
        for header in headers {
            let dir = match header {
                LibraryHeader::Cimgui => &self.cimgui,
                LibraryHeader::Fontstash => &self.fontstash,
                h if h.in_util() => &self.util,
                _ => &self.sokol,
            };
            if !dirs.contains(dir) {
                dirs.push(dir.clone());
            }
        }
        dirs
    }
}

/// 单个静态库的编译参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilePlan {
    pub lib_name: String,
    pub files: Vec<PathBuf>,
    pub includes: Vec<PathBuf>,
    pub defines: Vec<Define>,
    pub flags: Vec<String>,
    pub flags_if_supported: Vec<String>,
}

impl CompilePlan {
    /// 生成单元的编译计划
    pub fn for_unit(
        unit: &TranslationUnit,
        unit_path: &Path,
        platform: Platform,
        is_msvc: bool,
        paths: &IncludePaths,
    ) -> Self {
        let lib_name = match unit.bundle() {
            Some(bundle) => bundle.lib_name(),
            None => unit.name().trim_end_matches(".c").to_string(),
        };
        let includes = paths.dirs_for(unit.plan().library_headers());
        Self::new(lib_name, vec![unit_path.to_path_buf()], includes, unit.gates(), platform, is_msvc)
    }

    /// 手写单元的编译计划（使用相同的开关）
    pub fn for_sources(
        lib_name: impl Into<String>,
        files: Vec<PathBuf>,
        gates: &GateSet,
        platform: Platform,
        is_msvc: bool,
        paths: &IncludePaths,
    ) -> Self {
        let includes = paths.dirs_for(LibraryHeader::ALL);
        Self::new(lib_name.into(), files, includes, gates, platform, is_msvc)
    }

    fn new(
        lib_name: String,
        files: Vec<PathBuf>,
        includes: Vec<PathBuf>,
        gates: &GateSet,
        platform: Platform,
        is_msvc: bool,
    ) -> Self {
        let mut defines = gates.defines();
        let mut flags = Vec::new();
        let mut flags_if_supported = Vec::new();

        if !is_msvc {
            flags.push("-std=c99".to_string());
        }

        match platform {
            // macOS 上按 Objective-C 编译
            Platform::Apple => flags.push("-ObjC".to_string()),
            Platform::Unix => flags.push("-pthread".to_string()),
            Platform::Windows if !is_msvc => {
                defines.push(Define::with_value("_WIN32_WINNT", "0x0601"));
                flags_if_supported.extend(
                    ["-Wno-cast-function-type", "-Wno-sign-compare", "-Wno-unknown-pragmas"]
                        .map(String::from),
                );
            }
            Platform::Windows | Platform::Other => {}
        }

        Self { lib_name, files, includes, defines, flags, flags_if_supported }
    }

    /// 把计划应用到 `cc::Build`
    pub fn apply(&self, build: &mut cc::Build) {
        for dir in &self.includes {
            build.include(dir);
        }
        for define in &self.defines {
            build.define(&define.name, define.value.as_deref());
        }
        for flag in &self.flags {
            build.flag(flag);
        }
        for flag in &self.flags_if_supported {
            build.flag_if_supported(flag);
        }
        build.files(&self.files);
    }

    /// 编译为静态库
    pub fn compile(&self) -> Result<()> {
        let mut build = cc::Build::new();
        build.warnings(false);
        self.apply(&mut build);

        debug!(lib = %self.lib_name, defines = ?self.defines, flags = ?self.flags, "Compiling bundle");
        build
            .try_compile(&self.lib_name)
            .map_err(|e| SokolBuildError::Compile(format!("{}: {}", self.lib_name, e)))?;

        info!(lib = %self.lib_name, files = self.files.len(), "Compiled static library");
        Ok(())
    }
}
