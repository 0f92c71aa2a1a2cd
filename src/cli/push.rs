//! orgsync push command implementation.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{load_config, resolve_org_file};
use crate::conflict::AutoMerge;
use crate::error::{Error, Result};
use crate::org;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::remote;
use crate::storage::JsonTaskService;

pub struct PushOptions {
    pub file: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct PushData {
    file: PathBuf,
    erased: usize,
    pushed: usize,
}

pub fn run(options: PushOptions) -> Result<()> {
    let config = load_config(options.config.as_ref())?;
    let store = config.store_path(options.store.as_ref())?;
    let file = resolve_org_file(options.file, &config)?;
    if !file.exists() {
        return Err(Error::FileNotFound(file));
    }

    let text = std::fs::read_to_string(&file)?;
    let mut tree = org::parse(&text)?;

    let mut service = JsonTaskService::open(&store)?;
    let erased = remote::erase_all(&mut service)?;
    let pushed = remote::push_tree(&mut service, &mut tree, &mut AutoMerge)?;
    service.save()?;

    let data = PushData {
        file: file.clone(),
        erased,
        pushed,
    };

    let mut human = HumanOutput::new(format!(
        "Pushed {} task(s) from {}",
        pushed,
        file.display()
    ));
    human.push_summary("store", store.display().to_string());
    human.push_summary("replaced tasks", erased.to_string());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "push",
        &data,
        Some(&human),
    )
}
