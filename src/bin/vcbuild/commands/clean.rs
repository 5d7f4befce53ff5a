//! `vcbuild clean` command

use anyhow::Result;

use vcbuild::ops::vcbuild_clean::clean;
use vcbuild::util::{GlobalContext, Shell};

pub fn execute(shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    clean(&ctx, shell)?;
    Ok(())
}
