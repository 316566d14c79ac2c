use super::{json_pretty, resolve_app_dir, EXIT_DETECT_FAIL, EXIT_SUCCESS};
use movepack_core::detect;
use std::path::Path;

pub fn run(app_dir: &Path, plan_path: Option<&Path>, json: bool) -> Result<u8, String> {
    let app_dir = resolve_app_dir(app_dir)?;
    let result = detect(&app_dir).map_err(|e| e.to_string())?;

    if let Some(path) = plan_path {
        result
            .write_plan(path)
            .map_err(|e| format!("unable to write build plan {}: {e}", path.display()))?;
    }

    if json {
        println!("{}", json_pretty(&result)?);
    }

    Ok(if result.pass {
        EXIT_SUCCESS
    } else {
        EXIT_DETECT_FAIL
    })
}
