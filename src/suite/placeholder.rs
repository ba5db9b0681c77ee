// Placeholder substitution in sample files

use crate::config::SuiteConfig;
use crate::suite::{Replacement, Result, SuiteError};
use std::path::Path;
use tracing::{debug, warn};

/// Expand `{zone}` and `{project}` against the suite configuration
pub fn expand(template: &str, config: &SuiteConfig) -> String {
    template
        .replace("{zone}", &config.default_zone)
        .replace("{project}", config.project())
}

/// Replace every occurrence of the search string in the target file, keeping
/// the original content next to it as `<file>.backup`.
///
/// Returns the number of occurrences replaced.
pub fn apply(
    samples_root: &Path,
    replacement: &Replacement,
    config: &SuiteConfig,
) -> Result<usize> {
    let file = samples_root.join(&replacement.file);
    let io_err = |source| SuiteError::Placeholder {
        file: file.clone(),
        source,
    };

    let original = std::fs::read_to_string(&file).map_err(io_err)?;
    let count = original.matches(replacement.search.as_str()).count();
    if count == 0 {
        warn!(
            file = %file.display(),
            search = %replacement.search,
            "placeholder not found"
        );
        return Ok(0);
    }

    let mut backup = file.clone().into_os_string();
    backup.push(".backup");
    std::fs::write(&backup, &original).map_err(io_err)?;

    let replace = expand(&replacement.replace, config);
    std::fs::write(&file, original.replace(replacement.search.as_str(), &replace)).map_err(io_err)?;

    debug!(
        file = %file.display(),
        search = %replacement.search,
        replace = %replace,
        occurrences = count,
        "substituted placeholder"
    );
    Ok(count)
}
