//! CV Builder CLI - edit, validate and export the stored CV
//!
//! Commands: init, show, apply, validate, templates, render, export, import, reset
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when `validate` finds errors

use base64::Engine as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cvbuilder_core::{
    Config, CvAction, CvStore, ExportPipeline, FileStore, IdGenerator, TemplateRegistry,
    ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "cvbuilder-cli")]
#[command(about = "CV Builder CLI - edit, validate and export a CV")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the stored CV (overrides CVBUILDER_STORE_DIR)
    #[arg(short, long)]
    store_dir: Option<PathBuf>,

    /// Storage slot name (overrides CVBUILDER_STORAGE_KEY)
    #[arg(short, long)]
    key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the stored CV if missing and print it
    Init,

    /// Print the stored CV
    Show,

    /// Apply one action, e.g. '{"type":"ADD_SKILL","payload":{"id":"","name":"Rust"}}'.
    /// Blank ids on added entries are filled in.
    Apply {
        #[arg(short, long)]
        action: String,
    },

    /// Validate the stored CV and report completion
    Validate,

    /// List available templates
    Templates,

    /// Render the stored CV as a print-ready HTML page
    Render {
        /// Template ID (defaults to the CV's own selection)
        #[arg(short, long)]
        template: Option<String>,
    },

    /// Write the HTML print document and the JSON export to a directory
    Export {
        #[arg(short, long)]
        out: PathBuf,

        #[arg(short, long)]
        template: Option<String>,
    },

    /// Replace the stored CV with a JSON export
    Import {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Replace the stored CV with an empty one
    Reset,
}

fn emit<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&format!("Failed to encode output: {}", e)),
    }
}

fn fail(message: &str) -> ExitCode {
    error!("{message}");
    println!("{}", serde_json::json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

/// Fills blank entry ids on add actions so hand-written JSON can leave them empty.
fn with_ids(action: CvAction, ids: &dyn IdGenerator) -> CvAction {
    fn fill(id: &mut String, ids: &dyn IdGenerator) {
        if id.trim().is_empty() {
            *id = ids.next_id();
        }
    }

    let mut action = action;
    match &mut action {
        CvAction::AddExperience(e) => fill(&mut e.id, ids),
        CvAction::AddEducation(e) => fill(&mut e.id, ids),
        CvAction::AddSkill(e) => fill(&mut e.id, ids),
        CvAction::AddProject(e) => fill(&mut e.id, ids),
        CvAction::AddLanguage(e) => fill(&mut e.id, ids),
        CvAction::AddCertification(e) => fill(&mut e.id, ids),
        CvAction::AddReference(e) => fill(&mut e.id, ids),
        CvAction::ResetDocument { id } => fill(id, ids),
        _ => {}
    }
    action
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => return fail(&format!("Invalid configuration: {}", e)),
    };
    if let Some(dir) = cli.store_dir {
        config.store_dir = dir;
    }
    if let Some(key) = cli.key {
        config.storage_key = key;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("cvbuilder-cli v{} using {}", ENGINE_VERSION, config.store_dir.display());

    let mut store = CvStore::open(&config, FileStore::new(&config.store_dir));
    let pipeline = ExportPipeline::new(TemplateRegistry::with_builtin());

    match cli.command {
        Commands::Init => {
            if !store.flush() {
                return fail("Failed to write the CV to storage");
            }
            emit(store.document())
        }

        Commands::Show => emit(store.document()),

        Commands::Apply { action } => {
            let action: CvAction = match serde_json::from_str(&action) {
                Ok(a) => a,
                Err(e) => return fail(&format!("Invalid action: {}", e)),
            };
            let action = with_ids(action, store.ids());
            store.dispatch(action);
            if !store.flush() {
                return fail("Failed to write the CV to storage");
            }
            emit(store.document())
        }

        Commands::Validate => {
            let report = pipeline.validate(store.document());
            let output = serde_json::json!({
                "validation": report,
                "completion": store.completion(),
            });
            let code = emit(&output);
            if report.valid {
                code
            } else {
                ExitCode::from(2) // Validation failure
            }
        }

        Commands::Templates => emit(&pipeline.list_templates()),

        Commands::Render { template } => {
            let template = template.unwrap_or_else(|| store.document().template.clone());
            match pipeline.export(store.document(), &template, chrono::Utc::now()) {
                Ok(bundle) => emit(&bundle.print),
                Err(e) => fail(&e.to_string()),
            }
        }

        Commands::Export { out, template } => {
            let template = template.unwrap_or_else(|| store.document().template.clone());
            let bundle = match pipeline.export(store.document(), &template, chrono::Utc::now()) {
                Ok(b) => b,
                Err(e) => return fail(&e.to_string()),
            };
            if let Err(e) = std::fs::create_dir_all(&out) {
                return fail(&format!("Cannot create {}: {}", out.display(), e));
            }

            let mut written = vec![];
            for file in &bundle.files {
                let data = match base64::engine::general_purpose::STANDARD.decode(&file.data_base64) {
                    Ok(d) => d,
                    Err(e) => return fail(&format!("Corrupt export {}: {}", file.filename, e)),
                };
                let path = out.join(&file.filename);
                if let Err(e) = std::fs::write(&path, data) {
                    return fail(&format!("Cannot write {}: {}", path.display(), e));
                }
                written.push(serde_json::json!({
                    "path": path,
                    "hash": file.hash,
                    "sizeBytes": file.size_bytes,
                }));
            }

            emit(&serde_json::json!({
                "success": true,
                "templateId": bundle.template_id,
                "contentHash": bundle.content_hash,
                "validation": bundle.validation,
                "files": written,
            }))
        }

        Commands::Import { file } => {
            let text = match std::fs::read_to_string(&file) {
                Ok(t) => t,
                Err(e) => return fail(&format!("Cannot read {}: {}", file.display(), e)),
            };
            if let Err(e) = store.import_json(&text) {
                return fail(&e.to_string());
            }
            if !store.flush() {
                return fail("Failed to write the CV to storage");
            }
            emit(store.document())
        }

        Commands::Reset => {
            store.reset();
            if !store.flush() {
                return fail("Failed to write the CV to storage");
            }
            emit(store.document())
        }
    }
}
