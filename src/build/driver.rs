//! 构建流水线
//!
//! 把各个组件串起来：解析后端 → 生成翻译单元 → 检查顺序、单一定义与开关一致性
//! → 写出源文件 → 编译 → 生成绑定 → 输出链接与元数据指令。
//!
//! 所有检查都发生在编译之前，违反不变量时构建配置阶段直接失败。
//!
//! # 在 `build.rs` 中使用
//!
//! ```no_run
//! fn main() {
//!     if let Err(e) = sokol_build::build::Driver::from_env("sokol_build.toml").and_then(|d| d.run()) {
//!         panic!("{}", e);
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use tracing::{info, info_span};

use super::bindings::BindingPlan;
use super::cargo;
use super::compile::{CompilePlan, IncludePaths};
use super::link::{self, LinkLib};
use crate::core::config::Config;
use crate::core::env::BuildEnv;
use crate::core::error::Result;
use crate::gfx::{Backend, BackendSelector, RequestSource, Selection};
use crate::unit::{Bundle, GateSet, LibraryHeader, Registry, TranslationUnit, UnitRecord};

/// 组装结果：已通过全部检查的翻译单元集合
#[derive(Debug, Clone)]
pub struct Assembly {
    selection: Selection,
    gates: GateSet,
    bundles: Vec<Bundle>,
    units: Vec<TranslationUnit>,
    declarations: TranslationUnit,
    extra_sources: Vec<PathBuf>,
    registry: Registry,
}

impl Assembly {
    /// 根据配置与环境组装
    ///
    /// 读取 `paths.extra_sources` 中的手写单元参与检查，除此之外不接触文件系统。
    pub fn plan(config: &Config, env: &BuildEnv) -> Result<Self> {
        let selector = config.backend_selector(env)?;
        Self::plan_with(config, env, &selector)
    }

    /// 使用调用方补充过请求的选择器组装
    pub fn plan_with(config: &Config, env: &BuildEnv, selector: &BackendSelector) -> Result<Self> {
        config.validate()?;

        let platform = config.platform(env);
        let selection = selector.resolve(platform, env.is_msvc())?;

        let bundles = config.build.bundles.clone();
        let overlay = bundles.contains(&Bundle::Overlay);
        let gates = GateSet::new(selection.backend, config.features, overlay);

        let units: Vec<TranslationUnit> = bundles
            .iter()
            .map(|bundle| TranslationUnit::implementation(*bundle, gates, platform))
            .collect();

        let mut headers: Vec<LibraryHeader> = bundles.iter().flat_map(|b| b.headers()).collect();
        headers.sort();
        headers.dedup();
        let declarations = TranslationUnit::declarations(
            format!("{}.h", config.build.binding_name),
            &headers,
            gates,
            platform,
        );

        let mut registry = Registry::new();
        for unit in units.iter().chain(std::iter::once(&declarations)) {
            unit.validate()?;
            registry.add_unit(unit);
        }

        let command_line = gates.defines();
        for path in &config.paths.extra_sources {
            let text = std::fs::read_to_string(path)?;
            if let Some(record) = UnitRecord::from_source(path.display().to_string(), &text, &command_line) {
                registry.add_record(record);
            }
        }

        registry.verify()?;

        info!(
            backend = %selection.backend,
            platform = %platform,
            bundles = ?bundles,
            fingerprint = %gates.fingerprint().short(),
            "Translation units assembled"
        );

        Ok(Self {
            selection,
            gates,
            bundles,
            units,
            declarations,
            extra_sources: config.paths.extra_sources.clone(),
            registry,
        })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn gates(&self) -> &GateSet {
        &self.gates
    }

    pub fn bundles(&self) -> &[Bundle] {
        &self.bundles
    }

    /// 实现单元
    pub fn units(&self) -> &[TranslationUnit] {
        &self.units
    }

    /// 仅声明单元
    pub fn declarations(&self) -> &TranslationUnit {
        &self.declarations
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// 需要链接的系统库
    pub fn system_libraries(&self) -> Vec<LinkLib> {
        link::system_libraries(self.selection.platform, self.selection.backend, &self.bundles)
    }

    /// 把所有单元写入目录，返回 (单元, 路径)
    pub fn write_units(&self, dir: &Path) -> Result<Vec<(&TranslationUnit, PathBuf)>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.units.len() + 1);
        for unit in self.units.iter().chain(std::iter::once(&self.declarations)) {
            let path = dir.join(unit.name());
            std::fs::write(&path, unit.render())?;
            written.push((unit, path));
        }
        Ok(written)
    }
}

/// 一次构建的输出
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub sources: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub bindings: Vec<PathBuf>,
    pub directives: Vec<String>,
}

/// 构建驱动
#[derive(Debug, Clone)]
pub struct Driver {
    config: Config,
    env: BuildEnv,
    cli_backend: Option<Backend>,
    config_path: Option<PathBuf>,
}

impl Driver {
    pub fn new(mut config: Config, env: BuildEnv) -> Self {
        config.apply_env(&env);
        Self { config, env, cli_backend: None, config_path: None }
    }

    /// 记录配置文件位置，文件变化时 cargo 会重新运行构建脚本
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// 命令行指定的后端，与其它显式请求一起参与一致性检查
    pub fn with_cli_backend(mut self, backend: Backend) -> Self {
        self.cli_backend = Some(backend);
        self
    }

    /// 读取当前进程的构建环境与配置文件（相对 `CARGO_MANIFEST_DIR`）
    pub fn from_env(config_path: impl AsRef<Path>) -> Result<Self> {
        let env = BuildEnv::from_env();
        let path = env.resolve_path(config_path.as_ref());
        let config = Config::from_file_or_default(&path)?;
        // 外层可能已经初始化了日志
        let _ = crate::core::log::init_from_config(&config.logging);
        info!(config = %path.display(), "Loaded build configuration");
        Ok(Self::new(config, env).with_config_path(path))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn env(&self) -> &BuildEnv {
        &self.env
    }

    pub fn assemble(&self) -> Result<Assembly> {
        let mut selector = self.config.backend_selector(&self.env)?;
        if let Some(backend) = self.cli_backend {
            selector.request(RequestSource::Cli, backend);
        }
        Assembly::plan_with(&self.config, &self.env, &selector)
    }

    /// 影响构建结果的文件与目录
    ///
    /// 一旦输出任何 `rerun-if-changed`，cargo 只在这些路径变化时重新运行构建脚本，
    /// 因此配置文件与所有头文件目录都要列出。不存在的配置文件不列出，否则每次构建都会重跑。
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        let mut watched: Vec<PathBuf> = Vec::new();
        if let Some(path) = self.config_path.as_ref().filter(|p| p.exists()) {
            watched.push(path.clone());
        }
        let paths = IncludePaths::from_config(&self.config.paths);
        for dir in [&paths.sokol, &paths.util, &paths.cimgui, &paths.fontstash] {
            watched.push(dir.clone());
        }
        watched.extend(self.config.paths.extra_sources.iter().cloned());

        let mut unique: Vec<PathBuf> = Vec::with_capacity(watched.len());
        for path in watched {
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        unique
    }

    fn out_dir(&self) -> Result<PathBuf> {
        match &self.config.paths.out_dir {
            Some(dir) => Ok(self.env.resolve_path(dir)),
            None => Ok(self.env.out_dir()?.to_path_buf()),
        }
    }

    /// 执行完整流水线并输出 cargo 指令
    pub fn run(&self) -> Result<BuildOutput> {
        let _span = info_span!("sokol_build").entered();
        let assembly = self.assemble()?;
        let out_dir = self.out_dir()?;
        let selection = *assembly.selection();
        let paths = IncludePaths::from_config(&self.config.paths);

        let mut output = BuildOutput::default();
        let watched = self.watched_paths();
        output
            .directives
            .extend(cargo::rerun_directives(watched.iter().map(PathBuf::as_path)));

        let written = assembly.write_units(&out_dir)?;
        for (unit, path) in &written {
            output.sources.push(path.clone());
            if unit.bundle().is_none() {
                continue;
            }
            let plan = CompilePlan::for_unit(unit, path, selection.platform, self.env.is_msvc(), &paths);
            plan.compile()?;
            output.libraries.push(plan.lib_name);
        }

        if !assembly.extra_sources.is_empty() {
            let plan = CompilePlan::for_sources(
                "sokol_extra",
                assembly.extra_sources.clone(),
                assembly.gates(),
                selection.platform,
                self.env.is_msvc(),
                &paths,
            );
            plan.compile()?;
            output.libraries.push(plan.lib_name);
        }

        if self.config.build.bindings {
            let header_path = out_dir.join(assembly.declarations().name());
            let plan = BindingPlan::new(
                &self.config.build.binding_name,
                assembly.declarations(),
                &header_path,
                &paths,
                &out_dir,
            );
            output.bindings = plan.generate()?;
        }

        output
            .directives
            .extend(assembly.system_libraries().iter().map(LinkLib::directive));
        output.directives.extend(cargo::metadata_directives(selection.backend));
        cargo::emit(&output.directives);

        info!(
            libraries = ?output.libraries,
            bindings = output.bindings.len(),
            "Build finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{AssemblyError, SokolBuildError};
    use crate::gfx::{Backend, Platform};

    fn env(vars: &[(&str, &str)]) -> BuildEnv {
        BuildEnv::from_vars(vars.iter().copied())
    }

    #[test]
    fn test_default_linux_assembly() {
        let assembly = Assembly::plan(&Config::default(), &env(&[("CARGO_CFG_TARGET_OS", "linux")])).unwrap();
        assert_eq!(assembly.selection().backend, Backend::GlCore33);
        assert_eq!(assembly.selection().platform, Platform::Unix);
        assert_eq!(assembly.units().len(), 1);
        assert_eq!(assembly.registry().records().len(), 2);
        assert_eq!(assembly.declarations().name(), "sokol_bindings.h");
    }

    #[test]
    fn test_apple_gl_with_windowing_has_no_pre_include() {
        let mut config = Config::default();
        config.build.backend = Some(Backend::GlCore33);
        let assembly = Assembly::plan(&config, &env(&[("CARGO_CFG_TARGET_OS", "macos")])).unwrap();
        assert_eq!(assembly.units()[0].plan().pre_includes().count(), 0);
    }

    #[test]
    fn test_apple_gl_graphics_only_pre_includes_framework() {
        let mut config = Config::default();
        config.build.backend = Some(Backend::GlCore33);
        config.build.bundles = vec![Bundle::Graphics];
        let assembly = Assembly::plan(&config, &env(&[("CARGO_CFG_TARGET_OS", "macos")])).unwrap();
        let text = assembly.units()[0].render();
        assert!(text.contains("#define GL_SILENCE_DEPRECATION"));
        assert!(text.contains("#include <OpenGL/gl3.h>"));
    }

    #[test]
    fn test_graphics_and_platform_rejected_before_compile() {
        let mut config = Config::default();
        config.build.bundles = vec![Bundle::Graphics, Bundle::Platform];
        let err = Assembly::plan(&config, &env(&[("CARGO_CFG_TARGET_OS", "linux")])).unwrap_err();
        assert!(matches!(err.as_assembly(), Some(AssemblyError::DuplicateDefinition { .. })));
    }

    /// 某个 bundle 组合的预期错误（只比较变体）：`None` 表示组装成功
    fn expected_failure(bundles: &[Bundle]) -> Option<AssemblyError> {
        let has = |b: Bundle| bundles.contains(&b);
        let unresolved = AssemblyError::Unresolved { header: String::new(), unit: String::new() };
        if bundles.is_empty() {
            Some(AssemblyError::NoBundles)
        } else if has(Bundle::Graphics) && has(Bundle::Platform) {
            Some(AssemblyError::DuplicateDefinition { header: String::new(), units: Vec::new() })
        } else if has(Bundle::Overlay) && !has(Bundle::Platform) {
            Some(unresolved)
        } else if has(Bundle::Text) && !has(Bundle::Graphics) && !has(Bundle::Platform) {
            Some(unresolved)
        } else {
            None
        }
    }

    #[test]
    fn test_every_bundle_combination() {
        for mask in 0u32..(1 << Bundle::ALL.len()) {
            let bundles: Vec<Bundle> = Bundle::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, b)| *b)
                .collect();

            for platform in Platform::ALL {
                for backend in Backend::ALL {
                    if !backend.supports(platform) {
                        continue;
                    }
                    let mut config = Config::default();
                    config.build.backend = Some(backend);
                    config.build.platform = Some(platform);
                    config.build.bundles = bundles.clone();
                    let result = Assembly::plan(&config, &env(&[]));

                    match (expected_failure(&bundles), result) {
                        (None, Ok(assembly)) => {
                            assert_eq!(assembly.units().len(), bundles.len());
                            for record in assembly.registry().records() {
                                assert_eq!(record.fingerprint, assembly.gates().fingerprint());
                            }
                        }
                        (Some(expected), Err(err)) => {
                            let matched = err
                                .as_assembly()
                                .map_or(false, |e| std::mem::discriminant(e) == std::mem::discriminant(&expected));
                            assert!(matched, "{:?} on {}/{}: unexpected {}", bundles, platform, backend, err);
                        }
                        (None, Err(err)) => {
                            panic!("{:?} on {}/{} failed: {}", bundles, platform, backend, err)
                        }
                        (Some(_), Ok(_)) => {
                            panic!("{:?} on {}/{} should have been rejected", bundles, platform, backend)
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_extra_source_duplicate_detected() {
        let dir = tempfile::tempdir().unwrap();
        let extra = dir.path().join("my_impl.c");
        std::fs::write(&extra, "#define SOKOL_IMPL\n#include \"sokol_gfx.h\"\n").unwrap();

        let mut config = Config::default();
        config.paths.extra_sources = vec![extra];
        let err = Assembly::plan(&config, &env(&[("CARGO_CFG_TARGET_OS", "linux")])).unwrap_err();
        assert!(matches!(err.as_assembly(), Some(AssemblyError::DuplicateDefinition { .. })));
    }

    #[test]
    fn test_extra_source_drift_detected() {
        let dir = tempfile::tempdir().unwrap();
        let extra = dir.path().join("fons_impl.c");
        std::fs::write(
            &extra,
            "#undef SOKOL_TRACE_HOOKS\n#include \"sokol_gfx.h\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.paths.extra_sources = vec![extra];
        let err = Assembly::plan(&config, &env(&[("CARGO_CFG_TARGET_OS", "linux")])).unwrap_err();
        assert!(matches!(err.as_assembly(), Some(AssemblyError::FlagMismatch { .. })));
    }

    #[test]
    fn test_invalid_backend_env_fails() {
        let err = Assembly::plan(&Config::default(), &env(&[("SOKOL_BACKEND", "glide")])).unwrap_err();
        assert!(matches!(err, SokolBuildError::Selection(_)));
    }

    #[test]
    fn test_write_units() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.build.platform = Some(Platform::Windows);
        config.build.backend = Some(Backend::D3D11);
        let assembly = Assembly::plan(&config, &env(&[])).unwrap();
        let written = assembly.write_units(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("sokol_platform_impl.c").exists());
        assert!(dir.path().join("sokol_bindings.h").exists());

        let scanned = Registry::scan_dir(dir.path(), &[]).unwrap();
        assert!(scanned.verify().is_ok());
    }

    #[test]
    fn test_cli_backend_conflicts_with_env() {
        let driver = Driver::new(
            Config::default(),
            env(&[("CARGO_CFG_TARGET_OS", "linux"), ("SOKOL_BACKEND", "gles3")]),
        )
        .with_cli_backend(Backend::GlCore33);
        let err = driver.assemble().unwrap_err();
        assert!(matches!(
            err,
            SokolBuildError::Selection(crate::core::error::SelectionError::ConflictingBackends(_))
        ));

        let driver = Driver::new(Config::default(), env(&[("CARGO_CFG_TARGET_OS", "linux")]))
            .with_cli_backend(Backend::Gles3);
        assert_eq!(driver.assemble().unwrap().selection().backend, Backend::Gles3);
    }

    #[test]
    fn test_rerun_covers_config_and_include_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("sokol_build.toml");
        std::fs::write(&config_path, "[build]\nbackend = \"gles3\"\n").unwrap();

        let mut config = Config::from_file(&config_path).unwrap();
        config.paths.cimgui_dir = PathBuf::from("/vendor/cimgui");
        config.paths.fontstash_dir = Some(PathBuf::from("/vendor/fontstash"));
        let driver = Driver::new(config, env(&[("CARGO_CFG_TARGET_OS", "linux")]))
            .with_config_path(&config_path);

        let lines = cargo::rerun_directives(driver.watched_paths().iter().map(PathBuf::as_path));
        let expect = |path: &Path| format!("cargo:rerun-if-changed={}", path.display());
        assert!(lines.contains(&expect(&config_path)));
        assert!(lines.contains(&expect(Path::new("sokol"))));
        assert!(lines.contains(&expect(Path::new("sokol/util"))));
        assert!(lines.contains(&expect(Path::new("/vendor/cimgui"))));
        assert!(lines.contains(&expect(Path::new("/vendor/fontstash"))));
        // sokol 目录只列一次
        assert_eq!(lines.iter().filter(|l| **l == expect(Path::new("sokol"))).count(), 1);
    }

    #[test]
    fn test_missing_config_file_is_not_watched() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Driver::new(Config::default(), env(&[]))
            .with_config_path(dir.path().join("missing.toml"));
        assert!(!driver.watched_paths().iter().any(|p| p.ends_with("missing.toml")));
    }

    #[test]
    fn test_driver_out_dir_from_env() {
        let driver = Driver::new(Config::default(), env(&[("OUT_DIR", "/tmp/sokol-out")]));
        assert_eq!(driver.out_dir().unwrap(), PathBuf::from("/tmp/sokol-out"));
        let driver = Driver::new(Config::default(), env(&[]));
        assert!(driver.out_dir().is_err());
    }
}
