use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use xcat::facade::Rpq;
use xcat::settings::{OutputFormat, Settings};
use xcat::store::Store;
use xcat::views;
use xcat::{Result, XcatError};

const MAX_DEPTH: usize = 16;

fn run(settings: Settings, view: Option<String>) -> Result<()> {
    let store = Arc::new(Store::new(settings.store.persistence())?);
    let rpq = Rpq::new(store, settings.write_mode)?
        .with_source_priority(settings.unify.source_priority.clone());

    if let Some(bootstrap) = &settings.bootstrap {
        let script = std::fs::read_to_string(bootstrap)
            .map_err(|e| XcatError::Config(format!("cannot read {}: {}", bootstrap.display(), e)))?;
        let batches = rpq.load_statements(&script)?;
        info!(path = %bootstrap.display(), batches, "bootstrap loaded");
    }

    let root = match view.as_deref() {
        None | Some("classes") => rpq.query(views::class_hierarchy(None)?),
        Some("artists") => rpq.query_chain(views::artist_releases()?)?,
        Some(class) if class.starts_with("instances=") => {
            rpq.query(views::instance_list(&class["instances=".len()..])?)
        }
        Some(resource) if resource.starts_with("properties=") => {
            rpq.query(views::instance_properties(&resource["properties=".len()..])?)
        }
        Some(other) => {
            return Err(XcatError::Config(format!(
                "unknown view {}, expected classes, artists, \
                 instances=<class> or properties=<resource>",
                other
            )));
        }
    };
    info!(query = %root.template().map(|t| t.to_string()).unwrap_or_default(), "browsing");

    match settings.output {
        OutputFormat::Tree => print!("{}", views::render_tree(&root, MAX_DEPTH)?),
        OutputFormat::Json => {
            let tree = views::tree_json(&root, MAX_DEPTH)?;
            let text = serde_json::to_string_pretty(&tree)
                .map_err(|e| XcatError::Invariant(e.to_string()))?;
            println!("{}", text);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let view = std::env::args().nth(1);
    match run(settings, view) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "xcat failed");
            ExitCode::FAILURE
        }
    }
}

