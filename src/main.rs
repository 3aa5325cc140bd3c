//! pointtag command line entry point.
//!
//! ```text
//! pointtag <config.json>
//! ```
//!
//! Canvas input is read from stdin, one event per line (`key r`,
//! `click left 12.5 3.0`, `click right`).

use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use serde::Serialize;

use pointtag::canvas::ScriptFactory;
use pointtag::data::LoaderRegistry;
use pointtag::transforms::{GroupedPoints, Postprocess, PostprocessKind, gather_categories};
use pointtag::{AnnotateError, AppConfig, BatchBuilder, BatchController, DataUnit};

fn main() -> ExitCode {
    let Some(config_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: pointtag <config.json>");
        return ExitCode::FAILURE;
    };

    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to read {:?}: {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.to_level_filter().as_str()),
    )
    .init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> Result<(), AnnotateError> {
    config.validate()?;

    for line in config.key_bindings()?.help_lines() {
        println!("{}", line);
    }

    let batch = BatchController::builder(&config.batch.sink)
        .append(config.batch.append)
        .skip_completed(config.batch.skip_completed)
        .labels(config.label_set()?)
        .finish_key(config.finish_key)
        .preprocess(config.batch.preprocess.transform());

    match config.batch.postprocess {
        PostprocessKind::Identity => drive(batch, config),
        PostprocessKind::GatherCategories => {
            let gather: Postprocess<GroupedPoints> = Rc::new(gather_categories);
            drive(batch.postprocess(gather), config)
        }
    }
}

fn drive<R: Serialize>(builder: BatchBuilder<R>, config: &AppConfig) -> Result<(), AnnotateError> {
    let registry = LoaderRegistry::new();
    let items = config
        .batch
        .items
        .iter()
        .map(|path| {
            let known = path
                .file_name()
                .and_then(|f| f.to_str())
                .is_some_and(|f| registry.is_supported_file(f));
            if !known {
                log::warn!("{:?}: unknown extension, detecting format from content", path);
            }
            DataUnit::load(path, &registry)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let factory = ScriptFactory::new(BufReader::new(std::io::stdin()));
    let mut batch = builder.build(items, Box::new(factory))?;
    let summary = batch.run()?;

    log::info!(
        "Done: {} completed, {} skipped{}",
        summary.completed,
        summary.skipped,
        if summary.finished { "" } else { " (stopped early)" }
    );
    Ok(())
}
