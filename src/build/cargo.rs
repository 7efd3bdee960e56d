//! cargo 指令
//!
//! `-sys` crate 需要在 `Cargo.toml` 中声明 `links = "sokol"`，这样这里输出的
//! `cargo:gfx=<backend>` 会以 `DEP_SOKOL_GFX` 的形式出现在直接依赖它的 crate 的
//! 构建脚本中。那些 crate 可以调用 [`forward_backend_cfg`]，然后使用
//! `#[cfg(sokol_gfx = "metal")]` 做条件编译。

use std::path::Path;
use tracing::debug;

use crate::core::env::{BACKEND_ENV, FORCE_DEBUG_ENV};
use crate::core::error::{Result, SokolBuildError};
use crate::gfx::Backend;

/// 下游构建脚本读取的后端元数据
pub const DEP_GFX_ENV: &str = "DEP_SOKOL_GFX";

/// cfg 名称
pub const GFX_CFG: &str = "sokol_gfx";

/// 触发重新运行构建脚本的指令
pub fn rerun_directives<'a>(watched: impl IntoIterator<Item = &'a Path>) -> Vec<String> {
    let mut lines = vec![
        format!("cargo:rerun-if-env-changed={}", BACKEND_ENV),
        format!("cargo:rerun-if-env-changed={}", FORCE_DEBUG_ENV),
    ];
    lines.extend(
        watched
            .into_iter()
            .map(|p| format!("cargo:rerun-if-changed={}", p.display())),
    );
    lines
}

/// `check-cfg` 声明与当前后端的 cfg
pub fn cfg_directives(backend: Backend) -> Vec<String> {
    let values: Vec<String> = Backend::ALL.iter().map(|b| format!("\"{}\"", b.token())).collect();
    vec![
        format!("cargo:rustc-check-cfg=cfg({}, values({}))", GFX_CFG, values.join(", ")),
        format!("cargo:rustc-cfg={}=\"{}\"", GFX_CFG, backend.token()),
    ]
}

/// 当前 crate 的后端元数据与 cfg
pub fn metadata_directives(backend: Backend) -> Vec<String> {
    let mut lines = vec![format!("cargo:gfx={}", backend.token())];
    lines.extend(cfg_directives(backend));
    lines
}

/// 输出到 stdout
pub fn emit<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}

/// 解析 `DEP_SOKOL_GFX` 的值
pub fn parse_dep_gfx(value: &str) -> Result<Backend> {
    // 兼容旧版本输出的带引号取值
    Ok(value.trim().trim_matches('"').parse()?)
}

/// 在依赖 `-sys` crate 的构建脚本中调用，转发后端 cfg
pub fn forward_backend_cfg() -> Result<Backend> {
    let value = std::env::var(DEP_GFX_ENV).map_err(|_| SokolBuildError::missing_env(DEP_GFX_ENV))?;
    let backend = parse_dep_gfx(&value)?;
    debug!(backend = %backend, "Forwarding backend cfg");
    emit(&cfg_directives(backend));
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata() {
        let lines = metadata_directives(Backend::Metal);
        assert_eq!(lines[0], "cargo:gfx=metal");
        assert_eq!(lines[2], "cargo:rustc-cfg=sokol_gfx=\"metal\"");
        assert!(lines[1].contains("\"d3d11\""));
    }

    #[test]
    fn test_rerun() {
        let lines = rerun_directives([Path::new("sokol")]);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "cargo:rerun-if-changed=sokol");
    }

    #[test]
    fn test_parse_dep_gfx() {
        assert_eq!(parse_dep_gfx("glcore33").unwrap(), Backend::GlCore33);
        assert_eq!(parse_dep_gfx("\"d3d11\"").unwrap(), Backend::D3D11);
        assert!(parse_dep_gfx("dx9").is_err());
    }
}
