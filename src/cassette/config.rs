//! Opening a cassette for `BANNERGEN_REPLAY`.

use std::path::Path;

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Read and parse the YAML cassette at `path`.
///
/// # Errors
///
/// Returns a message naming the path if it cannot be read or is not a cassette.
pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, String> {
    let yaml = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read cassette {}: {e}", path.display()))?;
    let cassette: Cassette = serde_yaml::from_str(&yaml)
        .map_err(|e| format!("{} is not a valid cassette: {e}", path.display()))?;
    tracing::debug!(
        name = %cassette.name,
        commit = %cassette.commit,
        interactions = cassette.interactions.len(),
        "cassette loaded"
    );
    Ok(CassetteReplayer::new(&cassette))
}
