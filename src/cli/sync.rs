//! orgsync sync command implementation.
//!
//! The whole merge runs against a locked store: parse both sides, merge
//! into the local tree, replace the remote listing with the merged
//! tree, then rewrite the org file atomically.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::{load_config, resolve_org_file};
use crate::conflict::{AutoMerge, InteractiveMerge, MergeStrategy};
use crate::error::{Error, Result};
use crate::lock;
use crate::merge::{merge_trees, MergeReport};
use crate::org;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::remote;
use crate::remote::TaskService;
use crate::storage::JsonTaskService;

pub struct SyncOptions {
    pub file: Option<PathBuf>,
    pub interactive: bool,
    pub store: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct SyncData {
    file: PathBuf,
    #[serde(flatten)]
    report: MergeReport,
    pushed: usize,
}

pub fn run(options: SyncOptions) -> Result<()> {
    let config = load_config(options.config.as_ref())?;
    let store = config.store_path(options.store.as_ref())?;
    let file = resolve_org_file(options.file, &config)?;
    if !file.exists() {
        return Err(Error::FileNotFound(file));
    }

    let text = std::fs::read_to_string(&file)?;
    let mut local = org::parse(&text)?;

    let mut service = JsonTaskService::open(&store)?;
    let remote_tree = remote::listing_to_tree(service.list()?)?;

    let mut strategy: Box<dyn MergeStrategy> = if options.interactive {
        Box::new(InteractiveMerge::new())
    } else {
        Box::new(AutoMerge)
    };

    let report = merge_trees(&mut local, &remote_tree, &config.merge, strategy.as_mut());

    remote::erase_all(&mut service)?;
    let pushed = remote::push_tree(&mut service, &mut local, strategy.as_mut())?;
    service.save()?;

    lock::write_atomic_str(&file, &org::serialize(&local))?;

    let data = SyncData {
        file: file.clone(),
        report,
        pushed,
    };

    let mut human = HumanOutput::new(format!("Synced {}", file.display()));
    human.push_summary("store", store.display().to_string());
    human.push_summary(
        "matched",
        format!("{} exact, {} fuzzy", report.exact, report.fuzzy),
    );
    human.push_summary("grafted", report.grafted.to_string());
    if report.discarded > 0 {
        human.push_summary("discarded", report.discarded.to_string());
    }
    human.push_detail(format!("pushed {pushed} task(s) back to the store"));
    if report.orphaned > 0 {
        human.push_warning(format!(
            "{} task(s) grafted at top level; their remote parents could not be resolved",
            report.orphaned
        ));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "sync",
        &data,
        Some(&human),
    )
}
