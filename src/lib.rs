//! sokol_build - sokol/cimgui 单一翻译单元构建库
//!
//! 供 `-sys` crate 的构建脚本使用：在构建期选定唯一的图形后端，
//! 为 sokol、cimgui 与 fontstash 生成各自的实现单元和一个只含声明的绑定头，
//! 并在调用 C 编译器之前检查单一定义与开关一致性。
//!
//! # 模块结构
//!
//! - `core`: 配置、构建环境、错误处理与日志
//! - `gfx`: 平台识别与后端选择
//! - `unit`: 头文件计划、bundle、特性开关与翻译单元
//! - `build`: 编译、链接、绑定生成与 cargo 指令
//!
//! # 使用示例
//!
//! ```no_run
//! // build.rs
//! fn main() {
//!     if let Err(e) = sokol_build::build("sokol_build.toml") {
//!         panic!("{}", e);
//!     }
//! }
//! ```
//!
//! 依赖方 crate 的构建脚本可以转发后端选择：
//!
//! ```no_run
//! let backend = sokol_build::build::cargo::forward_backend_cfg()?;
//! eprintln!("selected {}", backend);
//! # Ok::<(), sokol_build::SokolBuildError>(())
//! ```

pub mod build;
pub mod core;
pub mod gfx;
pub mod unit;

use std::path::Path;

pub use crate::build::{Assembly, BuildOutput, Driver};
pub use crate::core::{Config, Result, SokolBuildError};
pub use crate::gfx::{Backend, Platform};
pub use crate::unit::{Bundle, FeatureFlags};

/// 在构建脚本中执行完整流水线
///
/// 配置文件路径相对 `CARGO_MANIFEST_DIR` 解析，文件不存在时使用默认配置。
pub fn build(config_path: impl AsRef<Path>) -> Result<BuildOutput> {
    Driver::from_env(config_path)?.run()
}
