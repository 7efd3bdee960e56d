//! 图形后端模块
//!
//! 在构建期确定唯一的图形后端与宿主平台：
//! - `platform`：平台标识（Unix、Apple、Windows、其它）
//! - `backend`：后端标识（GLCORE33、GLES3、Metal、D3D11、WebGPU）及选择规则
//!
//! 其余组件都以这里的解析结果为前提。

pub mod backend;
pub mod platform;

pub use backend::{Backend, BackendRequest, BackendSelector, RequestSource, Selection};
pub use platform::Platform;
