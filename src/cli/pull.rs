//! orgsync pull command implementation.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::load_config;
use crate::error::Result;
use crate::lock;
use crate::org;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::remote;
use crate::remote::TaskService;
use crate::storage::JsonTaskService;

pub struct PullOptions {
    pub file: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct PullData {
    tasks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<PathBuf>,
    /// Org text, included when no file was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

pub fn run(options: PullOptions) -> Result<()> {
    let config = load_config(options.config.as_ref())?;
    let store = config.store_path(options.store.as_ref())?;

    let mut service = JsonTaskService::open(&store)?;
    let tree = remote::listing_to_tree(service.list()?)?;
    let text = org::serialize(&tree);

    let target = options.file.or_else(|| config.org_file.clone());
    match &target {
        Some(path) => lock::write_atomic_str(path, &text)?,
        None if !options.json => {
            // The org text itself is the output.
            print!("{text}");
            return Ok(());
        }
        None => {}
    }

    let data = PullData {
        tasks: tree.len(),
        file: target.clone(),
        text: target.is_none().then_some(text),
    };

    let mut human = HumanOutput::new(match &target {
        Some(path) => format!("Pulled {} task(s) into {}", data.tasks, path.display()),
        None => format!("Pulled {} task(s)", data.tasks),
    });
    human.push_summary("store", store.display().to_string());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "pull",
        &data,
        Some(&human),
    )
}
