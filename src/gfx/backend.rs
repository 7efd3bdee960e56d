//! 图形后端选择
//!
//! 从显式请求（配置文件、环境变量、cargo feature、命令行）与宿主平台中
//! 解析出唯一的图形后端，并给出库内部用来选择渲染后端的预处理器符号。
//!
//! # 选择规则
//!
//! - 所有显式请求必须一致，出现两个不同的后端即为配置错误
//! - 显式请求总是优先于平台推断
//! - 没有任何显式请求时才按平台选择默认后端
//! - 无法识别的后端标识直接失败，不会静默回退到默认值

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use super::platform::Platform;
use crate::core::error::{Result, SelectionError};

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    /// 桌面 OpenGL 3.3 Core Profile
    GlCore33,
    /// OpenGL ES 3
    Gles3,
    /// Apple Metal
    Metal,
    /// Direct3D 11
    D3D11,
    /// WebGPU
    Wgpu,
}

impl Backend {
    pub const ALL: [Backend; 5] = [
        Backend::GlCore33,
        Backend::Gles3,
        Backend::Metal,
        Backend::D3D11,
        Backend::Wgpu,
    ];

    /// 小写标识，与 cargo feature 名称一致
    pub fn token(&self) -> &'static str {
        match self {
            Backend::GlCore33 => "glcore33",
            Backend::Gles3 => "gles3",
            Backend::Metal => "metal",
            Backend::D3D11 => "d3d11",
            Backend::Wgpu => "wgpu",
        }
    }

    /// `-D` 宏名称
    pub fn macro_name(&self) -> &'static str {
        match self {
            Backend::GlCore33 => "SOKOL_GLCORE33",
            Backend::Gles3 => "SOKOL_GLES3",
            Backend::Metal => "SOKOL_METAL",
            Backend::D3D11 => "SOKOL_D3D11",
            Backend::Wgpu => "SOKOL_WGPU",
        }
    }

    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            Backend::GlCore33 => "OpenGL 3.3 Core",
            Backend::Gles3 => "OpenGL ES 3",
            Backend::Metal => "Metal",
            Backend::D3D11 => "Direct3D 11",
            Backend::Wgpu => "WebGPU",
        }
    }

    /// 是否属于 OpenGL 家族（需要平台 GL 入口声明）
    pub fn is_gl(&self) -> bool {
        matches!(self, Backend::GlCore33 | Backend::Gles3)
    }

    /// 检查后端在给定平台上是否可用
    pub fn supports(&self, platform: Platform) -> bool {
        match self {
            Backend::D3D11 => platform == Platform::Windows,
            Backend::Metal => platform == Platform::Apple,
            Backend::GlCore33 => platform != Platform::Other,
            Backend::Gles3 => matches!(platform, Platform::Unix | Platform::Other),
            Backend::Wgpu => true,
        }
    }

    /// 平台默认后端
    ///
    /// - Windows：MSVC 工具链用 D3D11，其余用 GLCORE33
    /// - macOS：Metal
    /// - Linux：GLCORE33
    /// - 其余平台：GLES3
    pub fn default_for(platform: Platform, is_msvc: bool) -> Self {
        match platform {
            Platform::Windows if is_msvc => Backend::D3D11,
            Platform::Windows => Backend::GlCore33,
            Platform::Apple => Backend::Metal,
            Platform::Unix => Backend::GlCore33,
            Platform::Other => Backend::Gles3,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Backend {
    type Err = SelectionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        let token = token.strip_prefix("sokol_").unwrap_or(token.as_str());
        match token {
            "glcore33" | "gl" => Ok(Backend::GlCore33),
            "gles3" => Ok(Backend::Gles3),
            "metal" => Ok(Backend::Metal),
            "d3d11" => Ok(Backend::D3D11),
            "wgpu" => Ok(Backend::Wgpu),
            _ => Err(SelectionError::UnknownBackend(s.to_string())),
        }
    }
}

impl TryFrom<String> for Backend {
    type Error = SelectionError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Backend> for String {
    fn from(backend: Backend) -> Self {
        backend.token().to_string()
    }
}

/// 显式后端请求的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// 配置文件 `[build] backend`
    Config,
    /// 环境变量 `SOKOL_BACKEND`
    Env,
    /// cargo feature（`CARGO_FEATURE_<BACKEND>`）
    Feature,
    /// 命令行参数
    Cli,
}

impl RequestSource {
    pub fn name(&self) -> &'static str {
        match self {
            RequestSource::Config => "config",
            RequestSource::Env => "env",
            RequestSource::Feature => "feature",
            RequestSource::Cli => "cli",
        }
    }
}

/// 单条显式后端请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendRequest {
    pub source: RequestSource,
    pub backend: Backend,
}

/// 后端解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub backend: Backend,
    pub platform: Platform,
    /// 是否来自显式请求（否则为平台默认值）
    pub explicit: bool,
}

/// 后端选择器
///
/// 收集所有显式请求，在 [`BackendSelector::resolve`] 时一次性校验。
#[derive(Debug, Default, Clone)]
pub struct BackendSelector {
    requests: Vec<BackendRequest>,
}

impl BackendSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一条显式请求
    pub fn request(&mut self, source: RequestSource, backend: Backend) -> &mut Self {
        self.requests.push(BackendRequest { source, backend });
        self
    }

    /// 以字符串标识添加请求，无法识别时立即失败
    pub fn request_token(&mut self, source: RequestSource, token: &str) -> Result<&mut Self> {
        let backend: Backend = token.parse()?;
        Ok(self.request(source, backend))
    }

    pub fn requests(&self) -> &[BackendRequest] {
        &self.requests
    }

    /// 解析出唯一后端
    ///
    /// # 错误
    ///
    /// - `ConflictingBackends`：显式请求之间不一致
    /// - `Unsupported`：后端与平台不兼容
    pub fn resolve(&self, platform: Platform, is_msvc: bool) -> Result<Selection> {
        let (backend, explicit) = match self.requests.first() {
            Some(first) => {
                if self.requests.iter().any(|r| r.backend != first.backend) {
                    let requests = self
                        .requests
                        .iter()
                        .map(|r| (r.source.name().to_string(), r.backend.token().to_string()))
                        .collect();
                    return Err(SelectionError::ConflictingBackends(requests).into());
                }
                (first.backend, true)
            }
            None => {
                let backend = Backend::default_for(platform, is_msvc);
                debug!(backend = %backend, platform = %platform, "No explicit backend request, using platform default");
                (backend, false)
            }
        };

        if !backend.supports(platform) {
            return Err(SelectionError::Unsupported {
                backend: backend.token().to_string(),
                platform: platform.name().to_string(),
            }
            .into());
        }

        info!(
            backend = backend.name(),
            platform = platform.name(),
            explicit,
            "Graphics backend selected"
        );

        Ok(Selection { backend, platform, explicit })
    }
}
