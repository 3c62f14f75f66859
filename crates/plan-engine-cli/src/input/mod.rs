pub mod file;
pub mod stdin;

use plan_engine_core::ingest::PlanDocument;

/// Load a plan document from `--input` (JSON or YAML by extension) or, when
/// no path is given, from piped stdin JSON.
pub fn load_document(path: &Option<String>) -> Result<PlanDocument, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_document(path);
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Err("no --input file given and nothing piped on stdin".into()),
    }
}
