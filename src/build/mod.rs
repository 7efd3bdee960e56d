//! 构建流水线
//!
//! 把组装好的翻译单元交给工具链：
//! - `compile`：每个 bundle 单元编译为一个静态库
//! - `link`：按平台与后端列出系统库
//! - `bindings`：从声明单元生成 FFI 绑定
//! - `cargo`：cargo 指令与 `DEP_SOKOL_GFX` 元数据
//! - `driver`：串联以上步骤

pub mod bindings;
pub mod cargo;
pub mod compile;
pub mod driver;
pub mod link;

pub use bindings::{BindingPlan, BindingTarget};
pub use compile::{CompilePlan, IncludePaths};
pub use driver::{Assembly, BuildOutput, Driver};
pub use link::{LinkKind, LinkLib};
