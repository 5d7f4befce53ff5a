//! Compiler and linker flag synthesis.
//!
//! Flags come from two static, ordered rule tables. Each rule has a guard and
//! an emitter; the table order is the order flags appear on the command line.
//! cl.exe and link.exe are position sensitive, so the tables are the single
//! source of truth for ordering.

use std::path::{Path, PathBuf};

use crate::builder::discovery::{resolve_path, SourceSet};
use crate::builder::toolchain::{kernel_defines, DriverKit};
use crate::core::manifest::{DebugInfo, DriverType, OptLevel, ProjectConfig, ProjectType};
use crate::core::resolve::{Codegen, ResolvedConfig};

/// Which compile a flag set is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileRole {
    /// The main compile, consuming a precompiled header if configured.
    Main,
    /// The stage producing the precompiled header.
    PchCreate,
}

/// Paths involved in precompiled header creation and use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchPaths {
    /// Header name as written in `#include`.
    pub header: String,
    pub source: PathBuf,
    /// The `.pch` file, `<obj>/<header stem>.pch`.
    pub pch: PathBuf,
    /// Object produced alongside the `.pch`, linked into the final artifact.
    pub object: PathBuf,
}

impl PchPaths {
    /// `None` unless PCH is enabled with both a header and a source.
    pub fn for_config(resolved: &ResolvedConfig) -> Option<Self> {
        let config = resolved.config();
        let (header, source) = config.pch.active()?;
        let base = resolve_path(resolved.root(), &config.sources.root);
        let source = resolve_path(&base, source);

        let header_stem = Path::new(header)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| header.to_string());
        let source_stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| header_stem.clone());

        let obj_dir = resolved.obj_dir();
        Some(PchPaths {
            header: header.to_string(),
            pch: obj_dir.join(format!("{}.pch", header_stem)),
            object: obj_dir.join(format!("{}.obj", source_stem)),
            source,
        })
    }
}

/// Everything flag rules may read.
#[derive(Debug, Clone, Copy)]
pub struct FlagContext<'a> {
    pub resolved: &'a ResolvedConfig,
    pub sources: &'a SourceSet,
    pub kit: Option<&'a DriverKit>,
    pub pch: Option<&'a PchPaths>,
    pub role: CompileRole,
    /// Compiled `.res` files to hand to the linker.
    pub resource_outputs: &'a [PathBuf],
}

impl<'a> FlagContext<'a> {
    fn config(&self) -> &'a ProjectConfig {
        self.resolved.config()
    }

    fn codegen(&self) -> Codegen {
        self.resolved.codegen()
    }

    fn is_driver(&self) -> bool {
        self.resolved.is_driver()
    }
}

type Guard = fn(&FlagContext<'_>) -> bool;
type Emit = fn(&FlagContext<'_>, &mut Vec<String>);

/// One entry in a flag table.
#[derive(Clone, Copy)]
pub struct FlagRule {
    pub name: &'static str,
    applies: Guard,
    emit: Emit,
}

impl FlagRule {
    const fn new(name: &'static str, applies: Guard, emit: Emit) -> Self {
        FlagRule {
            name,
            applies,
            emit,
        }
    }
}

fn always(_: &FlagContext<'_>) -> bool {
    true
}

fn driver_only(ctx: &FlagContext<'_>) -> bool {
    ctx.is_driver()
}

fn user_mode_only(ctx: &FlagContext<'_>) -> bool {
    !ctx.is_driver()
}

fn quoted(path: &Path) -> String {
    format!("\"{}\"", path.display())
}

/// Compiler flag rules, in command-line order.
pub const COMPILER_RULES: &[FlagRule] = &[
    FlagRule::new("standard", always, |ctx, out| {
        out.push(format!(
            "/std:{}",
            ctx.config().compiler.standard.as_msvc_flag_value()
        ));
    }),
    FlagRule::new("runtime", user_mode_only, |ctx, out| {
        let runtime = ctx.config().compiler.runtime;
        let flag = if ctx.codegen().debug_runtime {
            runtime.as_debug_flag()
        } else {
            runtime.as_flag()
        };
        out.push(flag.to_string());
    }),
    FlagRule::new("optimization", always, |ctx, out| {
        let flags: &[&str] = match ctx.codegen().optimization {
            OptLevel::None => &["/Od"],
            OptLevel::Size => &["/O1"],
            OptLevel::Speed => &["/O2"],
            OptLevel::Full => &["/O2", "/GL"],
        };
        out.extend(flags.iter().map(|f| f.to_string()));
    }),
    FlagRule::new("debug_info", always, |ctx, out| match ctx.codegen().debug_info {
        DebugInfo::None => {}
        DebugInfo::Minimal => out.push("/Zi".into()),
        DebugInfo::Full => {
            out.push("/Zi".into());
            // runtime checks need the user-mode CRT
            if !ctx.is_driver() {
                out.push("/RTC1".into());
            }
        }
    }),
    FlagRule::new("warnings", always, |ctx, out| {
        let warnings = &ctx.config().compiler.warnings;
        out.push(format!("/W{}", warnings.level));
        if warnings.as_errors {
            out.push("/WX".into());
        }
        out.extend(warnings.disabled.iter().map(|w| format!("/wd{}", w)));
    }),
    FlagRule::new("exceptions_rtti", always, |ctx, out| {
        let compiler = &ctx.config().compiler;
        if compiler.exceptions && !ctx.is_driver() {
            out.push("/EHsc".into());
        }
        if !compiler.rtti || ctx.is_driver() {
            out.push("/GR-".into());
        }
    }),
    FlagRule::new("code_model", always, |ctx, out| {
        let compiler = &ctx.config().compiler;
        out.push(compiler.floating_point.as_flag().into());
        out.push(compiler.calling_convention.as_flag().into());
        out.extend(
            compiler
                .character_set
                .defines()
                .iter()
                .map(|d| format!("/D{}", d)),
        );
    }),
    FlagRule::new("conformance", always, |ctx, out| {
        let conformance = ctx.config().compiler.conformance;
        if !conformance.permissive {
            out.push("/permissive-".into());
        }
        if conformance.cplusplus_macro {
            out.push("/Zc:__cplusplus".into());
        }
        out.push("/utf-8".into());
    }),
    FlagRule::new("security", user_mode_only, |ctx, out| {
        let security = ctx.config().compiler.security;
        let gs = if security.buffer_checks { "/GS" } else { "/GS-" };
        out.push(gs.to_string());
        if security.control_flow_guard {
            out.push("/guard:cf".into());
        }
    }),
    FlagRule::new("kernel", driver_only, |ctx, out| {
        out.extend(["/kernel", "/GS", "/Gy", "/Zp8"].iter().map(|f| f.to_string()));
        let arch = ctx.config().project.architecture;
        out.extend(
            kernel_defines(arch, &ctx.config().driver)
                .into_iter()
                .map(|d| format!("/D{}", d)),
        );
    }),
    FlagRule::new(
        "parallel",
        |ctx| ctx.config().compiler.parallel,
        |_, out| out.push("/MP".into()),
    ),
    FlagRule::new("defines", always, |ctx, out| {
        out.extend(
            ctx.config()
                .compiler
                .defines
                .iter()
                .map(|d| format!("/D{}", d)),
        );
    }),
    FlagRule::new("additional", always, |ctx, out| {
        out.extend(ctx.config().compiler.additional_flags.iter().cloned());
    }),
    FlagRule::new(
        "pch_use",
        |ctx| ctx.role == CompileRole::Main && ctx.pch.is_some(),
        |ctx, out| {
            if let Some(pch) = ctx.pch {
                out.push(format!("/Yu\"{}\"", pch.header));
                out.push(format!("/Fp{}", quoted(&pch.pch)));
            }
        },
    ),
    FlagRule::new("includes", always, |ctx, out| {
        out.extend(
            ctx.sources
                .include_dirs
                .iter()
                .map(|dir| format!("/I{}", quoted(dir))),
        );
        if let (true, Some(kit)) = (ctx.is_driver(), ctx.kit) {
            out.extend(
                kit.include_dirs(&ctx.config().driver)
                    .iter()
                    .map(|dir| format!("/I{}", quoted(dir))),
            );
        }
    }),
    FlagRule::new("output_locations", always, |ctx, out| {
        // the doubled backslash keeps cl from reading `\"` as an escaped quote
        out.push(format!("/Fo\"{}\\\\\"", ctx.resolved.obj_dir().display()));
        out.push(format!(
            "/Fd\"{}\\vc.pdb\"",
            ctx.resolved.output_dir().display()
        ));
    }),
];

const KERNEL_LIBS: &[&str] = &[
    "ntoskrnl.lib",
    "hal.lib",
    "wmilib.lib",
    "BufferOverflowFastFailK.lib",
];

const KMDF_LIBS: &[&str] = &["WdfLdr.lib", "WdfDriverEntry.lib"];

/// Entry point the KMDF loader stub calls before the driver's own.
const KMDF_ENTRY: &str = "FxDriverEntry";

/// Linker flag rules, in command-line order.
pub const LINKER_RULES: &[FlagRule] = &[
    FlagRule::new(
        "debug",
        |ctx| ctx.codegen().debug_info != DebugInfo::None,
        |_, out| out.push("/DEBUG".into()),
    ),
    FlagRule::new("security", user_mode_only, |ctx, out| {
        let security = ctx.config().linker.security;
        if security.aslr {
            out.push("/DYNAMICBASE".into());
        }
        if security.dep {
            out.push("/NXCOMPAT".into());
        }
        if security.cfg {
            out.push("/guard:cf".into());
        }
    }),
    FlagRule::new(
        "lto",
        |ctx| ctx.codegen().lto,
        |_, out| out.push("/LTCG".into()),
    ),
    FlagRule::new(
        "strip_unreferenced",
        |ctx| ctx.codegen().strip_unreferenced,
        |_, out| out.extend(["/OPT:REF".to_string(), "/OPT:ICF".to_string()]),
    ),
    FlagRule::new("subsystem", always, |ctx, out| {
        let config = ctx.config();
        if config.project.kind == ProjectType::Dll {
            out.push("/DLL".into());
        }
        let subsystem = if ctx.is_driver() {
            "NATIVE"
        } else {
            config.linker.subsystem.as_linker_value()
        };
        out.push(format!("/SUBSYSTEM:{}", subsystem));
    }),
    FlagRule::new("driver", driver_only, |ctx, out| {
        let driver = &ctx.config().driver;
        let entry = match driver.kind {
            DriverType::Kmdf => KMDF_ENTRY,
            DriverType::Wdm => driver.entry_point.as_str(),
        };
        out.push("/DRIVER".into());
        out.push("/NODEFAULTLIB".into());
        out.push(format!("/ENTRY:{}", entry));
        if driver.integrity_check {
            out.push("/INTEGRITYCHECK".into());
        }
        out.push("/MERGE:_TEXT=.text;_PAGE=PAGE".into());
        out.push("/SECTION:INIT,d".into());

        if let Some(kit) = ctx.kit {
            let arch = ctx.config().project.architecture;
            out.extend(
                kit.lib_dirs(arch, driver)
                    .iter()
                    .map(|dir| format!("/LIBPATH:{}", quoted(dir))),
            );
        }
        out.extend(KERNEL_LIBS.iter().map(|l| l.to_string()));
        if driver.kind == DriverType::Kmdf {
            out.extend(KMDF_LIBS.iter().map(|l| l.to_string()));
        }
        if driver.minifilter {
            out.push("fltMgr.lib".into());
        }
    }),
    FlagRule::new("entry_point", user_mode_only, |ctx, out| {
        if let Some(entry) = &ctx.config().linker.entry_point {
            out.push(format!("/ENTRY:{}", entry));
        }
    }),
    FlagRule::new("def_file", always, |ctx, out| {
        if let Some(def) = &ctx.config().linker.def_file {
            out.push(format!("/DEF:{}", quoted(def)));
        }
    }),
    FlagRule::new("stack_heap", always, |ctx, out| {
        let linker = &ctx.config().linker;
        if let Some(stack) = linker.stack_size {
            out.push(format!("/STACK:{}", stack));
        }
        if let Some(heap) = linker.heap_size {
            out.push(format!("/HEAP:{}", heap));
        }
    }),
    FlagRule::new(
        "map",
        |ctx| ctx.config().linker.generate_map,
        |ctx, out| {
            let map = ctx
                .resolved
                .output_dir()
                .join(format!("{}.map", ctx.resolved.name()));
            out.push(format!("/MAP:{}", quoted(&map)));
        },
    ),
    FlagRule::new("libraries", always, |ctx, out| {
        out.extend(ctx.config().linker.libraries.iter().cloned());
    }),
    FlagRule::new("library_paths", always, |ctx, out| {
        out.extend(
            ctx.config()
                .linker
                .library_paths
                .iter()
                .map(|p| format!("/LIBPATH:{}", quoted(p))),
        );
    }),
    FlagRule::new("additional", always, |ctx, out| {
        let mut extra: Vec<String> = ctx.config().linker.additional_flags.clone();
        for res in ctx.resource_outputs {
            let flag = quoted(res);
            if !extra.contains(&flag) {
                extra.push(flag);
            }
        }
        out.extend(extra);
    }),
    FlagRule::new("output", always, |ctx, out| {
        out.push(format!("/OUT:{}", quoted(&ctx.resolved.output_path())));
    }),
];

fn evaluate(rules: &[FlagRule], ctx: &FlagContext<'_>) -> Vec<String> {
    let mut flags = Vec::new();
    for rule in rules {
        if (rule.applies)(ctx) {
            (rule.emit)(ctx, &mut flags);
        }
    }
    flags
}

/// Compiler flags for `ctx`, in table order.
pub fn compiler_flags(ctx: &FlagContext<'_>) -> Vec<String> {
    evaluate(COMPILER_RULES, ctx)
}

/// Linker flags for `ctx`, in table order.
pub fn linker_flags(ctx: &FlagContext<'_>) -> Vec<String> {
    evaluate(LINKER_RULES, ctx)
}

/// Names of the rules that fire for `ctx`.
pub fn active_rules(rules: &[FlagRule], ctx: &FlagContext<'_>) -> Vec<&'static str> {
    rules
        .iter()
        .filter(|rule| (rule.applies)(ctx))
        .map(|rule| rule.name)
        .collect()
}
