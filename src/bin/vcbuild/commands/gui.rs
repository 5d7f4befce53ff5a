//! `vcbuild gui` command

use anyhow::Result;

use vcbuild::ops::config_gui::launch_gui;
use vcbuild::util::shell::{Shell, Status};
use vcbuild::util::GlobalContext;

pub fn execute(shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let config_path = ctx.config_path();
    let gui = launch_gui(&config_path)?;
    shell.status(Status::Launching, gui.display());
    Ok(())
}
