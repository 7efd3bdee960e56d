//! 系统库链接
//!
//! 每个平台 / 后端组合需要的系统库与 framework。

use std::fmt;

use crate::gfx::{Backend, Platform};
use crate::unit::Bundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Dylib,
    Framework,
}

/// 一个需要链接的系统库
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkLib {
    pub kind: LinkKind,
    pub name: &'static str,
}

impl LinkLib {
    const fn dylib(name: &'static str) -> Self {
        Self { kind: LinkKind::Dylib, name }
    }

    const fn framework(name: &'static str) -> Self {
        Self { kind: LinkKind::Framework, name }
    }

    /// `cargo:rustc-link-lib=...`
    pub fn directive(&self) -> String {
        format!("cargo:rustc-link-lib={}", self)
    }
}

impl fmt::Display for LinkLib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LinkKind::Dylib => write!(f, "dylib={}", self.name),
            LinkKind::Framework => write!(f, "framework={}", self.name),
        }
    }
}

/// 计算需要链接的系统库
pub fn system_libraries(platform: Platform, backend: Backend, bundles: &[Bundle]) -> Vec<LinkLib> {
    let windowing = bundles.iter().any(Bundle::has_windowing);
    let mut libs = Vec::new();

    match platform {
        Platform::Apple => {
            libs.push(LinkLib::framework("Foundation"));
            if windowing {
                libs.push(LinkLib::framework("Cocoa"));
                libs.push(LinkLib::framework("QuartzCore"));
                libs.push(LinkLib::framework("AudioToolbox"));
            }
            match backend {
                Backend::Metal => {
                    libs.push(LinkLib::framework("Metal"));
                    libs.push(LinkLib::framework("MetalKit"));
                }
                Backend::GlCore33 => libs.push(LinkLib::framework("OpenGL")),
                _ => {}
            }
        }
        Platform::Unix => {
            match backend {
                Backend::GlCore33 => libs.push(LinkLib::dylib("GL")),
                Backend::Gles3 => {
                    libs.push(LinkLib::dylib("GLESv2"));
                    libs.push(LinkLib::dylib("EGL"));
                }
                _ => {}
            }
            if windowing {
                libs.push(LinkLib::dylib("X11"));
                libs.push(LinkLib::dylib("Xi"));
                libs.push(LinkLib::dylib("Xcursor"));
            }
            libs.push(LinkLib::dylib("dl"));
            libs.push(LinkLib::dylib("pthread"));
            libs.push(LinkLib::dylib("m"));
        }
        Platform::Windows => {
            libs.push(LinkLib::dylib("kernel32"));
            if windowing {
                libs.push(LinkLib::dylib("user32"));
                libs.push(LinkLib::dylib("gdi32"));
                libs.push(LinkLib::dylib("ole32"));
                libs.push(LinkLib::dylib("shell32"));
            }
            match backend {
                Backend::D3D11 => {
                    libs.push(LinkLib::dylib("d3d11"));
                    libs.push(LinkLib::dylib("dxgi"));
                }
                Backend::GlCore33 => libs.push(LinkLib::dylib("opengl32")),
                _ => {}
            }
        }
        // wasm / Android 等目标；WebGPU 由宿主环境提供，无需链接
        Platform::Other => {
            if backend == Backend::Gles3 {
                libs.push(LinkLib::dylib("GLESv2"));
                libs.push(LinkLib::dylib("EGL"));
            }
        }
    }

    libs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(libs: &[LinkLib]) -> Vec<&'static str> {
        libs.iter().map(|l| l.name).collect()
    }

    #[test]
    fn test_linux_platform_gl() {
        let libs = system_libraries(Platform::Unix, Backend::GlCore33, &[Bundle::Platform]);
        assert_eq!(names(&libs), vec!["GL", "X11", "Xi", "Xcursor", "dl", "pthread", "m"]);
        assert_eq!(libs[0].directive(), "cargo:rustc-link-lib=dylib=GL");
    }

    #[test]
    fn test_linux_graphics_only_skips_x11() {
        let libs = system_libraries(Platform::Unix, Backend::Gles3, &[Bundle::Graphics]);
        assert!(!names(&libs).contains(&"X11"));
        assert!(names(&libs).contains(&"EGL"));
    }

    #[test]
    fn test_macos_metal_frameworks() {
        let libs = system_libraries(Platform::Apple, Backend::Metal, &[Bundle::Platform, Bundle::Overlay]);
        assert!(libs.iter().all(|l| l.kind == LinkKind::Framework));
        assert!(names(&libs).contains(&"MetalKit"));
        assert!(!names(&libs).contains(&"OpenGL"));
        assert_eq!(libs[0].directive(), "cargo:rustc-link-lib=framework=Foundation");
    }

    #[test]
    fn test_other_platform_gles3_links_gles_and_egl() {
        let libs = system_libraries(Platform::Other, Backend::Gles3, &[Bundle::Platform]);
        assert_eq!(names(&libs), vec!["GLESv2", "EGL"]);
        assert!(system_libraries(Platform::Other, Backend::Wgpu, &[Bundle::Graphics]).is_empty());
    }

    #[test]
    fn test_windows_d3d11() {
        let libs = system_libraries(Platform::Windows, Backend::D3D11, &[Bundle::Platform]);
        assert!(names(&libs).contains(&"d3d11"));
        assert!(names(&libs).contains(&"gdi32"));
    }
}
