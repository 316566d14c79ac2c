pub mod build;
pub mod detect;

use console::Style;
use movepack_schema::BuildpackDescriptor;
use std::path::{Path, PathBuf};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
/// Detection did not apply; the host moves on to the next buildpack.
pub const EXIT_DETECT_FAIL: u8 = 100;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Resolve the application directory to an absolute, symlink-free path.
///
/// The lifecycle runs buildpacks from inside the application directory
/// without `CNB_APP_DIR`, and paths derived from it end up in launch-time
/// environment files.
pub fn resolve_app_dir(app_dir: &Path) -> Result<PathBuf, String> {
    std::fs::canonicalize(app_dir).map_err(|e| {
        format!(
            "unable to resolve application directory {}: {e}",
            app_dir.display()
        )
    })
}

/// Heading printed before the build log: name, version, and homepage.
pub fn title(descriptor: &BuildpackDescriptor) -> String {
    let mut line = format!(
        "{} {}",
        Style::new().bold().apply_to(descriptor.display_name()),
        Style::new().cyan().apply_to(&descriptor.buildpack.version)
    );
    if let Some(homepage) = &descriptor.buildpack.homepage {
        line.push('\n');
        line.push_str(&format!("  {}", Style::new().dim().apply_to(homepage)));
    }
    line
}
