//! `vcbuild build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use vcbuild::core::CliOverrides;
use vcbuild::ops::vcbuild_build::{build, BuildOptions};
use vcbuild::util::{GlobalContext, Shell};

pub fn execute(args: BuildArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;

    let opts = BuildOptions {
        profile: args.profile,
        overrides: CliOverrides {
            defines: args.defines,
            architecture: args.arch,
            standard: args.standard,
            output_name: args.output,
        },
        rebuild: args.rebuild,
        dry_run: args.dry_run,
    };

    build(&ctx, &opts, shell)?;
    Ok(())
}
