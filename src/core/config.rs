//! 配置管理模块
//!
//! 构建配置的唯一来源：后端、bundle、特性开关、头文件路径与日志设置。
//! 支持从 TOML 配置文件加载，再由构建环境（环境变量、cargo feature）覆盖。
//!
//! # 配置文件格式 (sokol_build.toml)
//!
//! ```toml
//! [build]
//! backend = "glcore33"        # 可省略，省略时按平台选择
//! bundles = ["platform", "overlay"]
//! bindings = true
//!
//! [features]
//! no_deprecated = true
//! trace_hooks = true
//! entry = "caller"            # 或 "library"
//! ui_types = "define"         # 或 "declare"
//!
//! [paths]
//! sokol_dir = "sokol"
//! cimgui_dir = "cimgui"
//!
//! [logging]
//! level = "info"              # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::env::BuildEnv;
use super::error::{AssemblyError, ConfigError, Result};
use crate::gfx::{Backend, BackendSelector, Platform, RequestSource};
use crate::unit::{Bundle, FeatureFlags};

/// 构建配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 后端与 bundle 选择
    #[serde(default)]
    pub build: BuildConfig,

    /// 特性开关（整个链接统一）
    #[serde(default)]
    pub features: FeatureFlags,

    /// 头文件与输出路径
    #[serde(default)]
    pub paths: PathsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 后端与 bundle 选择
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// 显式请求的后端
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,

    /// 固定平台（默认由目标工具链决定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,

    /// 需要编译的 bundle
    #[serde(default = "default_bundles")]
    pub bundles: Vec<Bundle>,

    /// 是否生成 FFI 绑定
    #[serde(default = "default_bindings")]
    pub bindings: bool,

    /// 声明单元（及绑定模块）的名称
    #[serde(default = "default_binding_name")]
    pub binding_name: String,
}

/// 路径配置，相对路径以 `CARGO_MANIFEST_DIR` 为根
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// sokol 头文件目录
    #[serde(default = "default_sokol_dir")]
    pub sokol_dir: PathBuf,

    /// sokol util 头文件目录（默认 `<sokol_dir>/util`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub util_dir: Option<PathBuf>,

    /// cimgui 头文件目录
    #[serde(default = "default_cimgui_dir")]
    pub cimgui_dir: PathBuf,

    /// fontstash 头文件目录（默认与 sokol 相同）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fontstash_dir: Option<PathBuf>,

    /// 手写的翻译单元，参与单一定义检查并一起编译
    #[serde(default)]
    pub extra_sources: Vec<PathBuf>,

    /// 生成单元与绑定的输出目录（默认 `OUT_DIR`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_bundles() -> Vec<Bundle> { vec![Bundle::Platform] }
fn default_bindings() -> bool { true }
fn default_binding_name() -> String { "sokol_bindings".to_string() }
fn default_sokol_dir() -> PathBuf { PathBuf::from("sokol") }
fn default_cimgui_dir() -> PathBuf { PathBuf::from("cimgui") }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "sokol_build.log".to_string() }

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            backend: None,
            platform: None,
            bundles: default_bundles(),
            bindings: default_bindings(),
            binding_name: default_binding_name(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            sokol_dir: default_sokol_dir(),
            util_dir: None,
            cimgui_dir: default_cimgui_dir(),
            fontstash_dir: None,
            extra_sources: Vec::new(),
            out_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl PathsConfig {
    pub fn util_dir(&self) -> PathBuf {
        self.util_dir.clone().unwrap_or_else(|| self.sokol_dir.join("util"))
    }

    pub fn fontstash_dir(&self) -> PathBuf {
        self.fontstash_dir.clone().unwrap_or_else(|| self.sokol_dir.clone())
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 示例
    ///
    /// ```no_run
    /// use sokol_build::core::Config;
    ///
    /// let config = Config::from_file("sokol_build.toml")?;
    /// # Ok::<(), sokol_build::core::SokolBuildError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    ///
    /// 文件存在但内容无效时仍然报错：静默回退会编译出错误的后端。
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 用构建环境覆盖配置
    ///
    /// - `DEBUG=true` 或 `SOKOL_FORCE_DEBUG` 打开调试开关
    /// - 以 cargo feature 启用的 bundle 取代配置文件中的列表
    /// - 相对路径以 `CARGO_MANIFEST_DIR` 为根解析
    pub fn apply_env(&mut self, env: &BuildEnv) {
        self.features.debug |= env.debug;

        let bundles = env.bundle_features();
        if !bundles.is_empty() {
            info!(bundles = ?bundles, "Bundles selected by cargo features");
            self.build.bundles = bundles;
        }

        self.paths.sokol_dir = env.resolve_path(&self.paths.sokol_dir);
        self.paths.cimgui_dir = env.resolve_path(&self.paths.cimgui_dir);
        self.paths.util_dir = self.paths.util_dir.as_deref().map(|p| env.resolve_path(p));
        self.paths.fontstash_dir = self.paths.fontstash_dir.as_deref().map(|p| env.resolve_path(p));
        self.paths.extra_sources = self
            .paths
            .extra_sources
            .iter()
            .map(|p| env.resolve_path(p))
            .collect();
    }

    /// 收集所有显式后端请求
    ///
    /// 配置文件、`SOKOL_BACKEND` 环境变量与 cargo feature 都算显式请求；
    /// 环境变量中的未知标识立即报错。
    pub fn backend_selector(&self, env: &BuildEnv) -> Result<BackendSelector> {
        let mut selector = BackendSelector::new();
        if let Some(backend) = self.build.backend {
            selector.request(RequestSource::Config, backend);
        }
        if let Some(token) = &env.backend_request {
            selector.request_token(RequestSource::Env, token)?;
        }
        for backend in env.backend_features() {
            selector.request(RequestSource::Feature, backend);
        }
        Ok(selector)
    }

    /// 目标平台：配置固定值优先，否则取自构建环境
    pub fn platform(&self, env: &BuildEnv) -> Platform {
        self.build.platform.unwrap_or_else(|| env.platform())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.build.bundles.is_empty() {
            return Err(AssemblyError::NoBundles.into());
        }

        let mut seen: Vec<Bundle> = Vec::new();
        for bundle in &self.build.bundles {
            if seen.contains(bundle) {
                return Err(ConfigError::InvalidValue {
                    field: "build.bundles".to_string(),
                    reason: format!("Bundle '{}' is listed more than once", bundle),
                }
                .into());
            }
            seen.push(*bundle);
        }

        let name = &self.build.binding_name;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::InvalidValue {
                field: "build.binding_name".to_string(),
                reason: "Must be a non-empty identifier".to_string(),
            }
            .into());
        }

        if self.logging.file_output && self.logging.log_file.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.log_file".to_string(),
                reason: "File output requires a log file path".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{SelectionError, SokolBuildError};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.build.backend, None);
        assert_eq!(config.build.bundles, vec![Bundle::Platform]);
        assert!(config.features.no_deprecated);
        assert!(config.features.trace_hooks);
        assert_eq!(config.paths.util_dir(), PathBuf::from("sokol/util"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = Config::from_toml(
            r#"
            [build]
            backend = "GlCore33"
            bundles = ["graphics", "text"]

            [features]
            trace_hooks = false
            entry = "library"
            "#,
        )
        .unwrap();
        assert_eq!(config.build.backend, Some(Backend::GlCore33));
        assert_eq!(config.build.bundles, vec![Bundle::Graphics, Bundle::Text]);
        assert!(!config.features.trace_hooks);
        assert!(config.features.no_deprecated);
        assert_eq!(config.features.entry, crate::unit::EntryMode::Library);
    }

    #[test]
    fn test_unknown_backend_in_file_is_fatal() {
        let result = Config::from_toml("[build]\nbackend = \"vulkan\"\n");
        assert!(matches!(result, Err(SokolBuildError::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.build.bundles.clear();
        assert!(matches!(
            config.validate(),
            Err(SokolBuildError::Assembly(AssemblyError::NoBundles))
        ));

        config.build.bundles = vec![Bundle::Overlay, Bundle::Overlay];
        assert!(config.validate().is_err());

        config.build.bundles = vec![Bundle::Platform];
        config.build.binding_name = "sokol-ffi".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env = BuildEnv::from_vars([
            ("DEBUG", "true"),
            ("CARGO_FEATURE_IMPL_GFX", "1"),
            ("CARGO_MANIFEST_DIR", "/crate"),
        ]);
        let mut config = Config::default();
        config.apply_env(&env);
        assert!(config.features.debug);
        assert_eq!(config.build.bundles, vec![Bundle::Graphics]);
        assert_eq!(config.paths.sokol_dir, PathBuf::from("/crate/sokol"));
        assert_eq!(config.paths.util_dir(), PathBuf::from("/crate/sokol/util"));
    }

    #[test]
    fn test_backend_requests_from_all_sources() {
        let env = BuildEnv::from_vars([("SOKOL_BACKEND", "metal"), ("CARGO_FEATURE_GLCORE33", "1")]);
        let config = Config::default();
        let selector = config.backend_selector(&env).unwrap();
        assert_eq!(selector.requests().len(), 2);
        let err = selector.resolve(Platform::Apple, false).unwrap_err();
        assert!(matches!(
            err,
            SokolBuildError::Selection(SelectionError::ConflictingBackends(_))
        ));
    }

    #[test]
    fn test_invalid_env_backend() {
        let env = BuildEnv::from_vars([("SOKOL_BACKEND", "directx9")]);
        assert!(Config::default().backend_selector(&env).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sokol_build.toml");
        let mut config = Config::default();
        config.build.backend = Some(Backend::Wgpu);
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.build.backend, Some(Backend::Wgpu));
        assert!(Config::from_file_or_default(dir.path().join("missing.toml")).is_ok());
    }
}
