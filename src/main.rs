//! sokol-build - 翻译单元组装命令行工具
//!
//! 在不运行 cargo 的情况下检查组装结果：
//!
//! ```bash
//! # 查看解析出的后端、每个单元的包含顺序与开关
//! sokol-build plan --backend metal --platform macos --bundle platform --bundle overlay
//!
//! # 把所有单元写到目录中
//! sokol-build emit --out gen
//!
//! # 检查已有的 C 源码目录
//! sokol-build check csrc -D SOKOL_GLCORE33
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use sokol_build::core::log;
use sokol_build::core::BuildEnv;
use sokol_build::unit::{Define, IncludeEntry, Registry, TranslationUnit};
use sokol_build::{Backend, Bundle, Config, Driver, Platform};

#[derive(Parser)]
#[command(name = "sokol-build", version, about, long_about = None)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "sokol_build.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 打印组装计划
    Plan {
        /// 显式指定后端，与配置和环境中的请求一起校验
        #[arg(long)]
        backend: Option<Backend>,
        /// 固定目标平台
        #[arg(long)]
        platform: Option<Platform>,
        /// 替换配置中的 bundle 列表，可重复
        #[arg(long = "bundle")]
        bundles: Vec<Bundle>,
    },
    /// 把所有翻译单元写入目录
    Emit {
        #[arg(long)]
        out: PathBuf,
    },
    /// 扫描 C 源码目录，检查单一定义与开关一致性
    Check {
        dir: PathBuf,
        /// 编排器传给每个单元的宏，`NAME` 或 `NAME=VALUE`
        #[arg(short = 'D', long = "define")]
        defines: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = log::init_from_config(&config.logging) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Plan { backend, platform, bundles } => {
            if platform.is_some() {
                config.build.platform = platform;
            }
            if !bundles.is_empty() {
                config.build.bundles = bundles;
            }
            let mut driver = Driver::new(config, BuildEnv::from_env());
            if let Some(backend) = backend {
                driver = driver.with_cli_backend(backend);
            }
            let assembly = driver.assemble().context("Assembly failed")?;

            let selection = assembly.selection();
            println!(
                "backend: {} ({})",
                selection.backend,
                if selection.explicit { "explicit" } else { "platform default" }
            );
            println!("platform: {}", selection.platform);
            println!("fingerprint: {}", assembly.gates().fingerprint().digest());
            for unit in assembly.units().iter().chain(std::iter::once(assembly.declarations())) {
                print_unit(unit);
            }
            Ok(())
        }
        Commands::Emit { out } => {
            let driver = Driver::new(config, BuildEnv::from_env());
            let assembly = driver.assemble().context("Assembly failed")?;
            std::fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            for (unit, path) in assembly.write_units(&out)? {
                info!(unit = unit.name(), path = %path.display(), "Emitted unit");
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Check { dir, defines } => {
            let command_line: Vec<Define> = defines.iter().map(|d| parse_define(d)).collect();
            let registry = Registry::scan_dir(&dir, &command_line)
                .with_context(|| format!("Failed to scan {}", dir.display()))?;
            if registry.is_empty() {
                info!(dir = %dir.display(), "No units found");
                return Ok(());
            }
            registry.verify().context("Source check failed")?;
            for (header, owners) in registry.owners() {
                println!("{} <- {}", header, owners.join(", "));
            }
            println!("ok: {} units", registry.records().len());
            Ok(())
        }
    }
}

fn parse_define(arg: &str) -> Define {
    match arg.split_once('=') {
        Some((name, value)) => Define::with_value(name.trim(), value.trim()),
        None => Define::flag(arg.trim()),
    }
}

fn print_unit(unit: &TranslationUnit) {
    println!();
    println!("[{}]", unit.name());
    for entry in unit.plan().entries() {
        match entry {
            IncludeEntry::Pre(pre) => {
                for define in pre.defines {
                    println!("  pre  #define {}", define);
                }
                for header in pre.system_headers {
                    println!("  pre  <{}>", header);
                }
            }
            IncludeEntry::Library(header) => {
                let role = if unit.implements().contains(header) { "impl" } else { "decl" };
                println!("  {} {}", role, header);
            }
        }
    }
    let defines: Vec<String> = unit.defines().iter().map(|d| d.canonical()).collect();
    println!("  defines: {}", defines.join(" "));
}
