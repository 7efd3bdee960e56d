//! 构建脚本环境
//!
//! Cargo 在运行 `build.rs` 时通过环境变量描述目标平台、输出目录与启用的 feature。
//! 注意 `cfg!(target_os = ...)` 在构建脚本里描述的是宿主机，交叉编译时必须读取
//! `CARGO_CFG_TARGET_OS`。

use std::path::{Path, PathBuf};

use crate::core::error::{Result, SokolBuildError};
use crate::gfx::{Backend, Platform};
use crate::unit::Bundle;

/// 显式后端请求的环境变量
pub const BACKEND_ENV: &str = "SOKOL_BACKEND";
/// 强制调试构建的环境变量
pub const FORCE_DEBUG_ENV: &str = "SOKOL_FORCE_DEBUG";

/// 构建环境快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
    pub target_os: String,
    pub target_env: String,
    pub out_dir: Option<PathBuf>,
    pub manifest_dir: Option<PathBuf>,
    pub debug: bool,
    pub backend_request: Option<String>,
    /// 启用的 cargo feature（小写，`_` 已还原为 `-`）
    pub features: Vec<String>,
}

impl BuildEnv {
    /// 读取当前进程的环境变量
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// 从任意键值对构造，缺少目标信息时退回到宿主平台
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut env = BuildEnv::default();
        let mut target_os = None;
        let mut target_env = None;
        let mut force_debug = false;

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "CARGO_CFG_TARGET_OS" => target_os = Some(value.to_string()),
                "CARGO_CFG_TARGET_ENV" => target_env = Some(value.to_string()),
                "OUT_DIR" => env.out_dir = Some(PathBuf::from(value)),
                "CARGO_MANIFEST_DIR" => env.manifest_dir = Some(PathBuf::from(value)),
                // cargo 总会设置 DEBUG，取值为 "true" 或 "false"
                "DEBUG" => env.debug |= value == "true",
                FORCE_DEBUG_ENV => force_debug = true,
                BACKEND_ENV if !value.trim().is_empty() => {
                    env.backend_request = Some(value.trim().to_string())
                }
                _ => {
                    if let Some(feature) = key.strip_prefix("CARGO_FEATURE_") {
                        env.features.push(feature.to_ascii_lowercase().replace('_', "-"));
                    }
                }
            }
        }

        env.debug |= force_debug;
        env.target_os = target_os.unwrap_or_else(|| std::env::consts::OS.to_string());
        env.target_env = target_env.unwrap_or_else(|| {
            if cfg!(target_env = "msvc") { "msvc" } else { "" }.to_string()
        });
        env.features.sort();
        env
    }

    pub fn platform(&self) -> Platform {
        Platform::from_target_os(&self.target_os)
    }

    pub fn is_msvc(&self) -> bool {
        self.target_env == "msvc"
    }

    /// 作为 cargo feature 启用的后端
    pub fn backend_features(&self) -> Vec<Backend> {
        self.features
            .iter()
            .filter_map(|f| Backend::ALL.into_iter().find(|b| b.token() == f))
            .collect()
    }

    /// 作为 cargo feature 启用的 bundle（`impl-gfx`、`impl-app`、`imgui`、`fontstash` 等）
    pub fn bundle_features(&self) -> Vec<Bundle> {
        let mut bundles: Vec<Bundle> = self.features.iter().filter_map(|f| f.parse().ok()).collect();
        bundles.sort();
        bundles.dedup();
        bundles
    }

    pub fn out_dir(&self) -> Result<&Path> {
        self.out_dir
            .as_deref()
            .ok_or_else(|| SokolBuildError::missing_env("OUT_DIR"))
    }

    /// 相对路径以 `CARGO_MANIFEST_DIR` 为根解析
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.manifest_dir {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
