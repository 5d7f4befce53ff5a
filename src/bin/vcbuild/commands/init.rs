//! `vcbuild init` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::InitArgs;
use vcbuild::ops::vcbuild_init::init_project;
use vcbuild::util::shell::{Shell, Status};

pub fn execute(args: InitArgs, shell: &Shell) -> Result<()> {
    let root = args.path.unwrap_or_else(|| PathBuf::from("."));
    let dest = init_project(&root)?;
    shell.status(Status::Created, dest.display());
    Ok(())
}
