//! 核心功能模块
//!
//! 本模块提供构建配置的基础设施，与具体的后端和 bundle 无关。
//!
//! # 模块组织
//!
//! - `config`：配置管理，支持从 TOML 文件加载并由构建环境覆盖
//! - `env`：cargo 构建脚本环境的快照
//! - `error`：错误处理，定义统一的错误类型
//! - `log`：日志系统，基于 `tracing` 的结构化日志

pub mod config;
pub mod env;
pub mod error;
pub mod log;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use env::BuildEnv;
pub use error::{AssemblyError, ConfigError, Result, SelectionError, SokolBuildError};
