//! 单一定义登记表
//!
//! 在配置阶段（而不是链接阶段）检查两条不变量：
//!
//! - 每个头文件的实现在整个链接中恰好由一个翻译单元提供；
//!   被声明使用但无人实现的头文件视为未解析符号
//! - 所有单元可见的开关指纹完全一致
//!
//! 登记表既可以由生成的 [`TranslationUnit`] 构造，也可以扫描磁盘上的 C 源码。

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::features::{Define, FlagFingerprint};
use super::header::LibraryHeader;
use super::source::{effective_defines, extract_includes, TranslationUnit};
use crate::core::error::{AssemblyError, Result};

/// 参与扫描的源文件扩展名
const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "m"];

/// 一个翻译单元的实现责任与开关指纹
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    pub name: String,
    pub implements: Vec<LibraryHeader>,
    pub declares: Vec<LibraryHeader>,
    pub fingerprint: FlagFingerprint,
}

impl UnitRecord {
    pub fn from_unit(unit: &TranslationUnit) -> Self {
        Self {
            name: unit.name().to_string(),
            implements: unit.implements().to_vec(),
            declares: unit.declares(),
            fingerprint: unit.fingerprint(),
        }
    }

    /// 从 C 源码推断
    ///
    /// `command_line` 是编排器传给该单元的 `-D` 参数。只有实际包含了的头文件才算实现：
    /// 定义了 `SOKOL_GFX_IMPL` 却没有包含 `sokol_gfx.h` 的文件不产生任何符号。
    /// `SOKOL_IMPL` 会打开所有响应它的 sokol 头。没有包含任何库头文件的源码返回 `None`。
    pub fn from_source(name: impl Into<String>, text: &str, command_line: &[Define]) -> Option<Self> {
        let headers: Vec<LibraryHeader> = extract_includes(text)
            .iter()
            .filter_map(|inc| LibraryHeader::from_file_name(inc))
            .collect();
        if headers.is_empty() {
            return None;
        }

        let defines = effective_defines(text, command_line);
        let defined = |name: &str| defines.iter().any(|d| d.name == name);
        let sokol_impl = defined("SOKOL_IMPL");
        let (implements, declares): (Vec<_>, Vec<_>) = headers.into_iter().partition(|h| {
            (sokol_impl && h.honors_sokol_impl()) || h.impl_macro().map_or(false, |m| defined(m))
        });

        Some(Self {
            name: name.into(),
            implements,
            declares,
            fingerprint: FlagFingerprint::of(&defines),
        })
    }
}

/// 登记表
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: Vec<UnitRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: &TranslationUnit) -> &mut Self {
        self.records.push(UnitRecord::from_unit(unit));
        self
    }

    pub fn add_record(&mut self, record: UnitRecord) -> &mut Self {
        self.records.push(record);
        self
    }

    pub fn records(&self) -> &[UnitRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 扫描目录下的 C 源码，`command_line` 为编排器传给每个单元的 `-D` 参数
    pub fn scan_dir(dir: impl AsRef<Path>, command_line: &[Define]) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let path = entry.path();
            let is_source = path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| SOURCE_EXTENSIONS.contains(&e));
            if !entry.file_type().is_file() || !is_source {
                continue;
            }

            let text = std::fs::read_to_string(path)?;
            let name = path.strip_prefix(dir).unwrap_or(path).display().to_string();
            match UnitRecord::from_source(name.as_str(), &text, command_line) {
                Some(record) => {
                    debug!(unit = %record.name, implements = ?record.implements, "Scanned unit");
                    registry.add_record(record);
                }
                None => debug!(file = %name, "Skipping file without library headers"),
            }
        }

        info!(dir = %dir.display(), units = registry.records.len(), "Scanned source directory");
        Ok(registry)
    }

    /// 每个头文件的实现单元
    pub fn owners(&self) -> BTreeMap<LibraryHeader, Vec<String>> {
        let mut owners: BTreeMap<LibraryHeader, Vec<String>> = BTreeMap::new();
        for record in &self.records {
            for header in &record.implements {
                owners.entry(*header).or_default().push(record.name.clone());
            }
        }
        owners
    }

    /// 检查单一定义
    ///
    /// # 错误
    ///
    /// - `NoBundles`：登记表为空
    /// - `DuplicateDefinition`：同一头文件有多个实现单元
    /// - `Unresolved`：声明的头文件无人实现（没有实现宏的头文件除外）
    pub fn verify_single_definition(&self) -> Result<()> {
        if self.records.is_empty() {
            return Err(AssemblyError::NoBundles.into());
        }

        let owners = self.owners();
        if let Some((header, units)) = owners.iter().find(|(_, units)| units.len() > 1) {
            return Err(AssemblyError::DuplicateDefinition {
                header: header.file_name().to_string(),
                units: units.clone(),
            }
            .into());
        }

        for record in &self.records {
            for header in &record.declares {
                if header.impl_macro().is_some() && !owners.contains_key(header) {
                    return Err(AssemblyError::Unresolved {
                        header: header.file_name().to_string(),
                        unit: record.name.clone(),
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    /// 检查开关指纹一致
    pub fn verify_fingerprints(&self) -> Result<()> {
        let Some(first) = self.records.first() else {
            return Ok(());
        };

        for record in &self.records[1..] {
            if record.fingerprint != first.fingerprint {
                warn!(
                    unit = %record.name,
                    expected = %first.fingerprint,
                    found = %record.fingerprint,
                    "Feature flag drift between translation units"
                );
                return Err(AssemblyError::FlagMismatch {
                    unit: record.name.clone(),
                    expected: format!("{} ({})", first.fingerprint.short(), first.name),
                    found: record.fingerprint.short().to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    pub fn verify(&self) -> Result<()> {
        self.verify_single_definition()?;
        self.verify_fingerprints()
    }
}
