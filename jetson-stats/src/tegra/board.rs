//! Board identity and power profile.
//!
//! - L4T release from `etc/nv_tegra_release`
//! - JetPack release looked up from the L4T release
//! - Model and serial number from the device tree
//! - Active nvpmodel profile from `var/lib/nvpmodel/status` and `etc/nvpmodel.conf`

use std::path::Path;

use tracing::debug;

use crate::snapshot::{BoardInfo, NOT_AVAILABLE};

pub(crate) const MODEL_PATH: &str = "proc/device-tree/model";
const SERIAL_PATH: &str = "proc/device-tree/serial-number";
const RELEASE_PATH: &str = "etc/nv_tegra_release";
const NVPMODEL_STATUS_PATH: &str = "var/lib/nvpmodel/status";
const NVPMODEL_CONF_PATH: &str = "etc/nvpmodel.conf";

/// Known L4T releases and the JetPack they ship with.
const JETPACK_RELEASES: &[(&str, &str)] = &[
    ("36.4.3", "6.2"),
    ("36.4.0", "6.1"),
    ("36.3.0", "6.0"),
    ("36.2.0", "6.0 DP"),
    ("35.6.0", "5.1.4"),
    ("35.5.0", "5.1.3"),
    ("35.4.1", "5.1.2"),
    ("35.3.1", "5.1.1"),
    ("35.2.1", "5.1"),
    ("35.1.0", "5.0.2"),
    ("34.1.1", "5.0.1 DP"),
    ("34.1.0", "5.0 DP"),
    ("32.7.6", "4.6.6"),
    ("32.7.5", "4.6.5"),
    ("32.7.4", "4.6.4"),
    ("32.7.3", "4.6.3"),
    ("32.7.2", "4.6.2"),
    ("32.7.1", "4.6.1"),
    ("32.6.1", "4.6"),
    ("32.5.1", "4.5.1"),
    ("32.5.0", "4.5"),
    ("32.4.4", "4.4.1"),
    ("32.4.3", "4.4"),
    ("32.3.1", "4.3"),
];

/// Read board identity. Unreadable fields fall back to [`NOT_AVAILABLE`].
pub fn read_board(root: &Path) -> BoardInfo {
    let l4t_version = std::fs::read_to_string(root.join(RELEASE_PATH))
        .ok()
        .and_then(|content| parse_l4t_release(&content));

    let jetpack_version = l4t_version
        .as_deref()
        .and_then(jetpack_for_l4t)
        .map(str::to_string);

    BoardInfo {
        jetpack_version: jetpack_version.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        l4t_version: l4t_version.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        model: read_device_tree_string(&root.join(MODEL_PATH))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        serial_number: read_device_tree_string(&root.join(SERIAL_PATH))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    }
}

/// Read the name of the active power profile.
pub fn read_power_mode(root: &Path) -> Option<String> {
    let status = std::fs::read_to_string(root.join(NVPMODEL_STATUS_PATH)).ok()?;
    let id = parse_nvpmodel_status(&status)?;
    let conf = std::fs::read_to_string(root.join(NVPMODEL_CONF_PATH)).ok()?;
    let name = parse_nvpmodel_name(&conf, id);
    if name.is_none() {
        debug!(id, "Power mode id not found in nvpmodel.conf");
    }
    name
}

/// Read a NUL-terminated device tree string property.
pub fn read_device_tree_string(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let value = String::from_utf8_lossy(&bytes)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Parse the L4T release from `nv_tegra_release`.
///
/// `# R35 (release), REVISION: 1.0, GCID: ...` becomes `35.1.0`.
pub fn parse_l4t_release(content: &str) -> Option<String> {
    let line = content.lines().next()?;
    let major = line
        .trim_start_matches('#')
        .trim()
        .strip_prefix('R')?
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .filter(|s| !s.is_empty())?;

    let revision = line
        .split(',')
        .find_map(|part| part.trim().strip_prefix("REVISION:"))?
        .trim();

    if revision.is_empty() {
        return None;
    }

    Some(format!("{}.{}", major, revision))
}

/// Look up the JetPack release for an L4T release.
pub fn jetpack_for_l4t(l4t: &str) -> Option<&'static str> {
    JETPACK_RELEASES
        .iter()
        .find(|(release, _)| *release == l4t)
        .map(|(_, jetpack)| *jetpack)
}

/// Parse the active power mode id from the nvpmodel status file (`pmode:0002 fmode:quiet`).
pub fn parse_nvpmodel_status(content: &str) -> Option<u32> {
    content
        .split_whitespace()
        .find_map(|token| token.strip_prefix("pmode:"))
        .and_then(|id| id.parse().ok())
}

/// Find the name of power model `id` in `nvpmodel.conf`.
///
/// Matches lines of the form `< POWER_MODEL ID=2 NAME=15W >`.
pub fn parse_nvpmodel_name(conf: &str, id: u32) -> Option<String> {
    conf.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('<') && line.contains("POWER_MODEL"))
        .find_map(|line| {
            let tokens: Vec<&str> = line
                .trim_matches(|c| c == '<' || c == '>')
                .split_whitespace()
                .collect();

            let line_id = tokens
                .iter()
                .find_map(|t| t.strip_prefix("ID="))
                .and_then(|v| v.parse::<u32>().ok())?;

            if line_id != id {
                return None;
            }

            tokens
                .iter()
                .find_map(|t| t.strip_prefix("NAME="))
                .map(str::to_string)
        })
}
