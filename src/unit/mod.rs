//! 翻译单元组装
//!
//! - `header`：库头文件、预包含头与有序的头文件计划
//! - `bundle`：实现 bundle 与单一定义宏
//! - `features`：特性开关与一致性指纹
//! - `source`：翻译单元的生成与解析
//! - `registry`：配置阶段的单一定义与开关一致性检查

pub mod bundle;
pub mod features;
pub mod header;
pub mod registry;
pub mod source;

pub use bundle::Bundle;
pub use features::{Define, EntryMode, FeatureFlags, FlagFingerprint, GateSet, UiTypeMode};
pub use header::{HeaderGroup, HeaderPlan, IncludeEntry, LibraryHeader, PreInclude};
pub use registry::{Registry, UnitRecord};
pub use source::{effective_defines, extract_defines, extract_includes, TranslationUnit, UnitMode};
