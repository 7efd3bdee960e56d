//! FFI 绑定生成
//!
//! 绑定生成器解析的是仅声明单元：与实现单元相同的头文件、相同的开关，
//! 但不带任何单一定义宏。这样生成的类型与函数签名与实际链接的符号一致。
//!
//! 每个头文件生成一个模块文件 `<头文件名>.rs`（按符号前缀 allowlist），
//! 再生成一个索引文件把它们组织成模块：
//!
//! ```ignore
//! include!(concat!(env!("OUT_DIR"), "/sokol_bindings.rs"));
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use super::compile::IncludePaths;
use crate::core::error::{Result, SokolBuildError};
use crate::unit::{LibraryHeader, TranslationUnit};

/// 各模块都需要的 C 标准 typedef
const C_TYPEDEFS: &[&str] = &["u?int(8|16|32|64|ptr)_t", "__u?int(8|16|32|64)_t"];

/// 单个绑定模块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTarget {
    pub header: LibraryHeader,
    pub module: String,
}

impl BindingTarget {
    pub fn new(header: LibraryHeader) -> Self {
        let module = header.file_name().trim_end_matches(".h").to_string();
        Self { header, module }
    }

    pub fn file_name(&self) -> String {
        format!("{}.rs", self.module)
    }

    /// allowlist 正则
    pub fn patterns(&self) -> Vec<String> {
        self.header
            .symbol_prefixes()
            .iter()
            .map(|prefix| format!("{}.*", prefix))
            .collect()
    }
}

/// 绑定生成计划
#[derive(Debug, Clone)]
pub struct BindingPlan {
    name: String,
    header_path: PathBuf,
    clang_args: Vec<String>,
    targets: Vec<BindingTarget>,
    out_dir: PathBuf,
}

impl BindingPlan {
    /// `header_path` 为已写出的仅声明单元
    pub fn new(
        name: impl Into<String>,
        unit: &TranslationUnit,
        header_path: &Path,
        paths: &IncludePaths,
        out_dir: &Path,
    ) -> Self {
        let mut clang_args: Vec<String> = paths
            .dirs_for(unit.plan().library_headers())
            .iter()
            .map(|dir| format!("-I{}", dir.display()))
            .collect();
        clang_args.extend(unit.gates().defines().iter().map(|d| d.to_arg()));

        let targets = unit.plan().library_headers().map(BindingTarget::new).collect();

        Self {
            name: name.into(),
            header_path: header_path.to_path_buf(),
            clang_args,
            targets,
            out_dir: out_dir.to_path_buf(),
        }
    }

    pub fn clang_args(&self) -> &[String] {
        &self.clang_args
    }

    pub fn targets(&self) -> &[BindingTarget] {
        &self.targets
    }

    /// 索引文件内容
    ///
    /// 每个模块只含自己前缀的符号，依赖头文件的类型通过 `use super::<模块>::*` 引入，
    /// 这样 `sokol_glue` 返回的 `sg_environment` 与 `sokol_gfx` 中的是同一个类型。
    pub fn index_source(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "// Generated by sokol_build. Do not edit.");
        for target in &self.targets {
            let _ = writeln!(out);
            let _ = writeln!(out, "/// FFI to `{}`", target.header.file_name());
            let _ = writeln!(out, "pub mod {} {{", target.module);
            let _ = writeln!(out, "    #![allow(warnings)]");
            for dep in self.dependencies(target) {
                let _ = writeln!(out, "    use super::{}::*;", dep.module);
            }
            let _ = writeln!(
                out,
                "    include!(concat!(env!(\"OUT_DIR\"), \"/{}\"));",
                target.file_name()
            );
            let _ = writeln!(out, "}}");
        }
        out
    }

    /// 本次生成的模块中，`target` 依赖的那些
    fn dependencies<'a>(&'a self, target: &'a BindingTarget) -> impl Iterator<Item = &'a BindingTarget> + 'a {
        let requires = target.header.requires();
        self.targets.iter().filter(move |t| requires.contains(&t.header))
    }

    fn builder(&self, target: &BindingTarget) -> bindgen::Builder {
        let mut builder = bindgen::Builder::default()
            .header(self.header_path.display().to_string())
            .clang_args(&self.clang_args)
            .derive_default(true)
            // 其它头文件的类型由各自的模块提供，不在这里重复生成
            .allowlist_recursively(false)
            .raw_line(format!("// FFI to `{}`, generated by bindgen.", target.header.file_name()))
            .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()));

        for pattern in target.patterns() {
            builder = builder
                .allowlist_function(&pattern)
                .allowlist_type(&pattern)
                .allowlist_var(&pattern);
        }
        // 不递归时 libc 的定长整数 typedef 需要显式列出；它们是基本类型的别名，多模块重复无妨
        for pattern in C_TYPEDEFS {
            builder = builder.allowlist_type(pattern);
        }
        builder
    }

    /// 生成全部模块与索引文件，返回写出的文件
    pub fn generate(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.targets.len() + 1);

        for target in &self.targets {
            let dst = self.out_dir.join(target.file_name());
            let bindings = self.builder(target).generate().map_err(|e| {
                SokolBuildError::Bindings(format!("{}: {}", target.header.file_name(), e))
            })?;
            bindings.write_to_file(&dst)?;
            info!(header = %target.header, dst = %dst.display(), "Generated bindings");
            written.push(dst);
        }

        let index = self.out_dir.join(format!("{}.rs", self.name));
        std::fs::write(&index, self.index_source())?;
        written.push(index);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PathsConfig;
    use crate::gfx::{Backend, Platform};
    use crate::unit::{FeatureFlags, GateSet};

    fn plan() -> BindingPlan {
        let gates = GateSet::new(Backend::GlCore33, FeatureFlags::default(), false);
        let unit = TranslationUnit::declarations(
            "sokol_bindings.h",
            &[LibraryHeader::Gfx, LibraryHeader::App, LibraryHeader::Glue],
            gates,
            Platform::Unix,
        );
        BindingPlan::new(
            "sokol_bindings",
            &unit,
            Path::new("out/sokol_bindings.h"),
            &IncludePaths::from_config(&PathsConfig::default()),
            Path::new("out"),
        )
    }

    #[test]
    fn test_clang_args_match_gates() {
        let plan = plan();
        assert_eq!(plan.clang_args()[0], "-Isokol");
        assert!(plan.clang_args().contains(&"-DSOKOL_GLCORE33".to_string()));
        assert!(plan.clang_args().contains(&"-DSOKOL_TRACE_HOOKS".to_string()));
        assert!(!plan.clang_args().iter().any(|a| a.ends_with("_IMPL")));
    }

    #[test]
    fn test_targets_follow_include_order() {
        let modules: Vec<_> = plan().targets().iter().map(|t| t.module.clone()).collect();
        assert_eq!(modules, vec!["sokol_app", "sokol_gfx", "sokol_glue"]);
    }

    #[test]
    fn test_index_source() {
        let index = plan().index_source();
        assert!(index.contains("pub mod sokol_gfx {"));
        assert!(index.contains("include!(concat!(env!(\"OUT_DIR\"), \"/sokol_gfx.rs\"));"));
    }

    #[test]
    fn test_dependent_modules_import_shared_types() {
        let index = plan().index_source();
        let glue = index.split("pub mod sokol_glue {").nth(1).unwrap();
        assert!(glue.contains("use super::sokol_app::*;"));
        assert!(glue.contains("use super::sokol_gfx::*;"));

        let gfx = index.split("pub mod sokol_gfx {").nth(1).unwrap();
        let gfx = &gfx[..gfx.find('}').unwrap()];
        assert!(!gfx.contains("use super::"));
    }

    #[test]
    fn test_allowlist_is_not_recursive() {
        let plan = plan();
        let glue = &plan.targets()[2];
        let flags = plan.builder(glue).command_line_flags();
        assert!(flags.iter().any(|f| f == "--no-recursive-allowlist"));
        assert!(flags.iter().any(|f| f == "sglue_.*"));
    }

    #[test]
    fn test_patterns() {
        assert_eq!(BindingTarget::new(LibraryHeader::Imgui).patterns(), vec!["simgui_.*"]);
    }
}
