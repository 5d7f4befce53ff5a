//! `vcbuild config` command

use anyhow::Result;

use crate::cli::ConfigArgs;
use vcbuild::core::resolve::load;
use vcbuild::core::CliOverrides;
use vcbuild::util::GlobalContext;

pub fn execute(args: ConfigArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let resolved = load(
        ctx.project_root(),
        &ctx.config_path(),
        &args.profile,
        &CliOverrides::default(),
    )?;
    println!("{}", resolved.to_json_pretty());
    Ok(())
}
