//! 错误处理模块
//!
//! 定义了构建配置过程中使用的统一错误类型。
//!
//! 所有错误都在构建期发现（配置、组装、编译、绑定生成），运行期不存在错误路径。
//! 错误按发现阶段划分为几个子类型，方便构建脚本模式匹配并给出清晰的诊断。

use std::fmt;

/// 统一的 Result 类型
pub type Result<T> = std::result::Result<T, SokolBuildError>;

/// 构建配置的错误类型
#[derive(Debug)]
pub enum SokolBuildError {
    /// 配置错误
    Config(ConfigError),

    /// 后端 / 平台选择错误
    Selection(SelectionError),

    /// 翻译单元组装错误（头文件顺序、单一定义、标志一致性）
    Assembly(AssemblyError),

    /// IO 错误
    Io(std::io::Error),

    /// C 编译失败
    Compile(String),

    /// FFI 绑定生成失败
    Bindings(String),

    /// 构建环境缺失（如 `OUT_DIR` 未设置）
    Environment(String),

    /// 日志系统错误
    Log(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 后端选择相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// 无法识别的后端标识
    UnknownBackend(String),

    /// 无法识别的平台标识
    UnknownPlatform(String),

    /// 多个显式请求指定了不同的后端
    ConflictingBackends(Vec<(String, String)>),

    /// 后端在该平台上不可用
    Unsupported { backend: String, platform: String },
}

/// 翻译单元组装相关的错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// 没有选择任何 bundle
    NoBundles,

    /// 无法识别的 bundle 名称
    UnknownBundle(String),

    /// 平台要求的预包含头缺失
    MissingPreInclude { unit: String, header: String },

    /// 头文件顺序错误
    OrderViolation { unit: String, header: String, after: String },

    /// 头文件依赖缺失
    MissingDependency { unit: String, header: String, requires: String },

    /// 同一头文件的实现在多个翻译单元中定义
    DuplicateDefinition { header: String, units: Vec<String> },

    /// 头文件被声明使用，但链接中没有任何单元提供其实现
    Unresolved { header: String, unit: String },

    /// 翻译单元之间的特性标志不一致
    FlagMismatch { unit: String, expected: String, found: String },
}

impl fmt::Display for SokolBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SokolBuildError::Config(e) => write!(f, "Configuration error: {}", e),
            SokolBuildError::Selection(e) => write!(f, "Backend selection error: {}", e),
            SokolBuildError::Assembly(e) => write!(f, "Translation unit assembly error: {}", e),
            SokolBuildError::Io(e) => write!(f, "IO error: {}", e),
            SokolBuildError::Compile(msg) => write!(f, "Compilation failed: {}", msg),
            SokolBuildError::Bindings(msg) => write!(f, "Binding generation failed: {}", msg),
            SokolBuildError::Environment(msg) => write!(f, "Build environment error: {}", msg),
            SokolBuildError::Log(msg) => write!(f, "Log error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownBackend(token) => write!(f, "Unknown graphics backend: '{}'", token),
            SelectionError::UnknownPlatform(token) => write!(f, "Unknown platform: '{}'", token),
            SelectionError::ConflictingBackends(requests) => {
                write!(f, "Conflicting backend requests:")?;
                for (source, backend) in requests {
                    write!(f, " {}={}", source, backend)?;
                }
                Ok(())
            }
            SelectionError::Unsupported { backend, platform } => {
                write!(f, "Backend '{}' is not available on {}", backend, platform)
            }
        }
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyError::NoBundles => write!(f, "No implementation bundle selected"),
            AssemblyError::UnknownBundle(name) => write!(f, "Unknown bundle: '{}'", name),
            AssemblyError::MissingPreInclude { unit, header } => {
                write!(f, "Unit '{}' must pre-include <{}> before library headers", unit, header)
            }
            AssemblyError::OrderViolation { unit, header, after } => {
                write!(f, "Unit '{}' includes '{}' after '{}'", unit, header, after)
            }
            AssemblyError::MissingDependency { unit, header, requires } => {
                write!(f, "Unit '{}' includes '{}' without '{}'", unit, header, requires)
            }
            AssemblyError::DuplicateDefinition { header, units } => {
                write!(f, "'{}' is implemented by more than one unit: {}", header, units.join(", "))
            }
            AssemblyError::Unresolved { header, unit } => {
                write!(f, "Unit '{}' declares '{}' but no unit implements it", unit, header)
            }
            AssemblyError::FlagMismatch { unit, expected, found } => {
                write!(f, "Unit '{}' flag fingerprint {} differs from {}", unit, found, expected)
            }
        }
    }
}

impl std::error::Error for SokolBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SokolBuildError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for SelectionError {}
impl std::error::Error for AssemblyError {}

impl From<std::io::Error> for SokolBuildError {
    fn from(err: std::io::Error) -> Self {
        SokolBuildError::Io(err)
    }
}

impl From<ConfigError> for SokolBuildError {
    fn from(err: ConfigError) -> Self {
        SokolBuildError::Config(err)
    }
}

impl From<SelectionError> for SokolBuildError {
    fn from(err: SelectionError) -> Self {
        SokolBuildError::Selection(err)
    }
}

impl From<AssemblyError> for SokolBuildError {
    fn from(err: AssemblyError) -> Self {
        SokolBuildError::Assembly(err)
    }
}

impl SokolBuildError {
    /// 缺失环境变量时的错误
    pub fn missing_env(name: &str) -> Self {
        SokolBuildError::Environment(format!("environment variable `{}` is not set", name))
    }

    /// 组装错误的便捷访问，主要用于测试中的模式匹配
    pub fn as_assembly(&self) -> Option<&AssemblyError> {
        match self {
            SokolBuildError::Assembly(e) => Some(e),
            _ => None,
        }
    }
}

