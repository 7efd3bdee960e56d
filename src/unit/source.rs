//! 翻译单元
//!
//! 把 bundle、开关集合与头文件顺序组合成一个可以直接交给 C 编译器
//! （或绑定生成器）的源文件，并能从已有的 C 源码中反解出宏定义与包含项。

use std::fmt::Write as _;

use super::bundle::Bundle;
use super::features::{Define, FlagFingerprint, GateSet};
use super::header::{HeaderPlan, IncludeEntry, LibraryHeader};
use crate::core::error::Result;
use crate::gfx::Platform;

/// 单元模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitMode {
    /// 单一定义实现：定义 bundle 的实现宏
    Implementation,
    /// 仅声明：不定义任何实现宏（供绑定生成或其它单元使用）
    DeclarationOnly,
}

/// 翻译单元
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    name: String,
    bundle: Option<Bundle>,
    mode: UnitMode,
    gates: GateSet,
    platform: Platform,
    plan: HeaderPlan,
    implements: Vec<LibraryHeader>,
}

impl TranslationUnit {
    /// bundle 的实现单元
    pub fn implementation(bundle: Bundle, gates: GateSet, platform: Platform) -> Self {
        let implements = bundle.implements().to_vec();
        let plan = HeaderPlan::assemble(&bundle.headers(), platform, gates.backend, &implements);
        Self {
            name: bundle.unit_file_name(),
            bundle: Some(bundle),
            mode: UnitMode::Implementation,
            gates,
            platform,
            plan,
            implements,
        }
    }

    /// 仅声明单元（绑定生成使用）
    pub fn declarations(
        name: impl Into<String>,
        headers: &[LibraryHeader],
        gates: GateSet,
        platform: Platform,
    ) -> Self {
        let plan = HeaderPlan::assemble(headers, platform, gates.backend, &[]);
        Self {
            name: name.into(),
            bundle: None,
            mode: UnitMode::DeclarationOnly,
            gates,
            platform,
            plan,
            implements: Vec::new(),
        }
    }

    /// 用手写的头文件顺序替换规范顺序
    pub fn with_plan(mut self, plan: HeaderPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bundle(&self) -> Option<Bundle> {
        self.bundle
    }

    pub fn mode(&self) -> UnitMode {
        self.mode
    }

    pub fn gates(&self) -> &GateSet {
        &self.gates
    }

    pub fn plan(&self) -> &HeaderPlan {
        &self.plan
    }

    /// 本单元实现的头文件
    pub fn implements(&self) -> &[LibraryHeader] {
        &self.implements
    }

    /// 本单元仅声明的头文件
    pub fn declares(&self) -> Vec<LibraryHeader> {
        self.plan
            .library_headers()
            .filter(|h| !self.implements.contains(h))
            .collect()
    }

    /// 单元中出现的全部宏：开关 + 单一定义宏 + 预包含宏
    pub fn defines(&self) -> Vec<Define> {
        let mut defines = self.gates.defines();
        defines.extend(
            self.implements
                .iter()
                .filter_map(|h| h.impl_macro())
                .map(Define::flag),
        );
        for pre in self.plan.pre_includes() {
            defines.extend(pre.defines.iter().copied().map(Define::flag));
        }
        defines
    }

    pub fn fingerprint(&self) -> FlagFingerprint {
        FlagFingerprint::of(&self.defines())
    }

    /// 验证头文件顺序与预包含头
    pub fn validate(&self) -> Result<()> {
        self.plan
            .validate(&self.name, self.platform, self.gates.backend, &self.implements)
    }

    /// 生成 C 源码
    pub fn render(&self) -> String {
        let mut out = String::new();
        let role = match (self.mode, self.bundle) {
            (UnitMode::Implementation, Some(bundle)) => {
                format!("implementation unit for bundle `{}`", bundle)
            }
            _ => "declaration-only unit".to_string(),
        };

        let _ = writeln!(out, "// {}", self.name);
        let _ = writeln!(out, "// Generated by sokol_build: {} ({}, {}).", role, self.gates.backend, self.platform);
        let _ = writeln!(out, "// Flag fingerprint: {}", self.fingerprint().digest());
        let _ = writeln!(out, "// Do not edit: regenerated on every build.");
        out.push('\n');

        // 开关宏也会通过 -D 传入，这里用 #ifndef 避免重定义警告
        let _ = writeln!(out, "// feature gates");
        for define in self.gates.defines() {
            let _ = writeln!(out, "#ifndef {}", define.name);
            match &define.value {
                Some(value) => {
                    let _ = writeln!(out, "#define {} {}", define.name, value);
                }
                None => {
                    let _ = writeln!(out, "#define {}", define.name);
                }
            }
            let _ = writeln!(out, "#endif");
        }

        if self.mode == UnitMode::Implementation {
            out.push('\n');
            let _ = writeln!(out, "// single-definition switches");
            for name in self.implements.iter().filter_map(|h| h.impl_macro()) {
                let _ = writeln!(out, "#define {}", name);
            }
        }

        for entry in self.plan.entries() {
            match entry {
                IncludeEntry::Pre(pre) => {
                    out.push('\n');
                    let _ = writeln!(out, "// platform pre-include");
                    for name in pre.defines {
                        let _ = writeln!(out, "#define {}", name);
                    }
                    for header in pre.system_headers {
                        let _ = writeln!(out, "#include <{}>", header);
                    }
                }
                IncludeEntry::Library(header) => {
                    let _ = writeln!(out, "#include \"{}\"", header.file_name());
                }
            }
        }

        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    Str,
    Char,
    LineComment,
    BlockComment,
}

/// 去掉整段 C 源码中的注释
///
/// 字符串与字符字面量中的 `//`、`/*` 原样保留；块注释替换为一个空格，
/// 其中的换行保留，使注释之后的指令仍然位于行首。反斜杠续行会被拼接。
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = Lex::Code;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Lex::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = Lex::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push(' ');
                    state = Lex::BlockComment;
                }
                '\\' if chars.peek() == Some(&'\n') => {
                    chars.next();
                }
                '"' => {
                    out.push(c);
                    state = Lex::Str;
                }
                '\'' => {
                    out.push(c);
                    state = Lex::Char;
                }
                _ => out.push(c),
            },
            Lex::Str | Lex::Char => {
                out.push(c);
                let close = if state == Lex::Str { '"' } else { '\'' };
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == close || c == '\n' {
                    // 未闭合的字面量在行尾结束
                    state = Lex::Code;
                }
            }
            Lex::LineComment => match c {
                '\\' if chars.peek() == Some(&'\n') => {
                    chars.next();
                }
                '\n' => {
                    out.push('\n');
                    state = Lex::Code;
                }
                _ => {}
            },
            Lex::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = Lex::Code;
                } else if c == '\n' {
                    out.push('\n');
                }
            }
        }
    }

    out
}

/// 去掉注释后的预处理指令行（不含 `#`）
fn directives(text: &str) -> Vec<String> {
    strip_comments(text)
        .lines()
        .filter_map(|line| line.trim().strip_prefix('#'))
        .map(|rest| rest.trim_start().to_string())
        .collect()
}

/// 解析 `#define` 之后的部分
fn parse_define(rest: &str) -> Option<Define> {
    let rest = rest.trim();
    let name_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let (name, tail) = rest.split_at(name_end);
    // 函数式宏不是开关
    if name.is_empty() || tail.starts_with('(') {
        return None;
    }
    let value = tail.trim();
    Some(if value.is_empty() {
        Define::flag(name)
    } else {
        Define::with_value(name, value)
    })
}

/// 提取所有 `#define`
pub fn extract_defines(text: &str) -> Vec<Define> {
    directives(text)
        .iter()
        .filter_map(|d| d.strip_prefix("define"))
        .filter_map(parse_define)
        .collect()
}

/// 命令行 `-D` 参数之后按顺序应用源码中的 `#define` / `#undef`，得到包含库头时可见的宏
///
/// 条件编译块不做求值：`#ifndef X` 中的 `#define X` 视为生效。
pub fn effective_defines(text: &str, command_line: &[Define]) -> Vec<Define> {
    let mut defines: Vec<Define> = command_line.to_vec();
    for directive in directives(text) {
        if let Some(rest) = directive.strip_prefix("undef") {
            if let Some(name) = rest.split_whitespace().next() {
                defines.retain(|d| d.name != name);
            }
        } else if let Some(define) = directive.strip_prefix("define").and_then(parse_define) {
            defines.retain(|d| d.name != define.name);
            defines.push(define);
        }
    }
    defines
}

/// 提取所有 `#include` 的目标
pub fn extract_includes(text: &str) -> Vec<String> {
    directives(text)
        .iter()
        .filter_map(|d| d.strip_prefix("include"))
        .filter_map(|rest| {
            let rest = rest.trim();
            let (open, close) = match rest.chars().next()? {
                '"' => ('"', '"'),
                '<' => ('<', '>'),
                _ => return None,
            };
            let inner = rest.strip_prefix(open)?;
            let end = inner.find(close)?;
            Some(inner[..end].to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::Backend;
    use crate::unit::features::FeatureFlags;

    fn gates(backend: Backend, overlay: bool) -> GateSet {
        GateSet::new(backend, FeatureFlags::default(), overlay)
    }

    #[test]
    fn test_render_platform_unit_on_unix() {
        let unit = TranslationUnit::implementation(Bundle::Platform, gates(Backend::GlCore33, false), Platform::Unix);
        let text = unit.render();

        let includes = extract_includes(&text);
        assert_eq!(
            includes,
            vec!["GL/gl.h", "GL/glext.h", "sokol_app.h", "sokol_gfx.h", "sokol_glue.h"]
        );

        let defines = extract_defines(&text);
        assert!(defines.contains(&Define::flag("SOKOL_APP_IMPL")));
        assert!(defines.contains(&Define::flag("SOKOL_GFX_IMPL")));
        assert!(defines.contains(&Define::flag("SOKOL_GLCORE33")));
        assert!(defines.contains(&Define::flag("GL_GLEXT_PROTOTYPES")));
        assert!(unit.validate().is_ok());
    }

    #[test]
    fn test_declaration_unit_has_no_impl_macros() {
        let unit = TranslationUnit::declarations(
            "sokol_bindings.h",
            &[LibraryHeader::App, LibraryHeader::Gfx],
            gates(Backend::Metal, false),
            Platform::Apple,
        );
        let defines = extract_defines(&unit.render());
        assert!(!defines.iter().any(Define::is_impl_macro));
        assert_eq!(unit.declares(), vec![LibraryHeader::App, LibraryHeader::Gfx]);
    }

    #[test]
    fn test_rendered_text_fingerprint_matches_unit() {
        let unit = TranslationUnit::implementation(Bundle::Overlay, gates(Backend::D3D11, true), Platform::Windows);
        let parsed = FlagFingerprint::of(&extract_defines(&unit.render()));
        assert_eq!(parsed, unit.fingerprint());
    }

    #[test]
    fn test_fingerprint_equal_across_bundles() {
        let g = gates(Backend::GlCore33, true);
        let platform = TranslationUnit::implementation(Bundle::Platform, g, Platform::Unix);
        let overlay = TranslationUnit::implementation(Bundle::Overlay, g, Platform::Unix);
        assert_eq!(platform.fingerprint(), overlay.fingerprint());
    }

    #[test]
    fn test_comments_are_ignored() {
        let text = "// #define SOKOL_IMPL\n/* #define SOKOL_GFX_IMPL\n#define SOKOL_APP_IMPL */\n#define SOKOL_GLUE_IMPL // trailing\n#  include \"sokol_glue.h\"\n#define MAX(a, b) ((a) > (b) ? (a) : (b))\n";
        let defines = extract_defines(text);
        assert_eq!(defines, vec![Define::flag("SOKOL_GLUE_IMPL")]);
        assert_eq!(extract_includes(text), vec!["sokol_glue.h"]);
    }

    #[test]
    fn test_block_comment_before_directive_keeps_directive() {
        let text = "/* gfx */ #define SOKOL_IMPL\n#include /* core */ \"sokol_gfx.h\"\n";
        assert_eq!(extract_defines(text), vec![Define::flag("SOKOL_IMPL")]);
        assert_eq!(extract_includes(text), vec!["sokol_gfx.h"]);
    }

    #[test]
    fn test_multiline_block_comment_then_directive() {
        let text = "/* license\n * text */ #define SOKOL_GFX_IMPL\n/*\n#define SOKOL_APP_IMPL\n*/\n";
        assert_eq!(extract_defines(text), vec![Define::flag("SOKOL_GFX_IMPL")]);
    }

    #[test]
    fn test_comment_markers_inside_string_literal() {
        let defines = extract_defines("#define SOKOL_LOG_PREFIX \"http://x/*y*/\" // note\n");
        assert_eq!(defines, vec![Define::with_value("SOKOL_LOG_PREFIX", "\"http://x/*y*/\"")]);

        let a = FlagFingerprint::of(&extract_defines("#define SOKOL_LOG_PREFIX \"http://a\"\n"));
        let b = FlagFingerprint::of(&extract_defines("#define SOKOL_LOG_PREFIX \"http://b\"\n"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_line_splice_continues_define() {
        let defines = extract_defines("#define SOKOL_ASSERT_LEVEL \\\n    2\n");
        assert_eq!(defines, vec![Define::with_value("SOKOL_ASSERT_LEVEL", "2")]);
    }

    #[test]
    fn test_effective_defines_apply_undef() {
        let text = "#undef SOKOL_TRACE_HOOKS\n#define SOKOL_GFX_IMPL\n";
        let defines = effective_defines(
            text,
            &[Define::flag("SOKOL_GLCORE33"), Define::flag("SOKOL_TRACE_HOOKS")],
        );
        assert_eq!(defines, vec![Define::flag("SOKOL_GLCORE33"), Define::flag("SOKOL_GFX_IMPL")]);
    }

    #[test]
    fn test_hand_ordered_plan_is_checked() {
        let unit = TranslationUnit::implementation(Bundle::Graphics, gates(Backend::GlCore33, false), Platform::Unix)
            .with_plan(HeaderPlan::from_entries(vec![IncludeEntry::Library(LibraryHeader::Gfx)]));
        assert_eq!(unit.mode(), UnitMode::Implementation);
        assert!(unit.validate().is_err());
    }

    #[test]
    fn test_define_with_value() {
        let defines = extract_defines("#define _WIN32_WINNT 0x0601\n");
        assert_eq!(defines, vec![Define::with_value("_WIN32_WINNT", "0x0601")]);
    }
}
