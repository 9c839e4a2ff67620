//! Companion script lookup for a media file.
//!
//! For `dir/name.ext` the stroke script is `dir/name.funscript` and each
//! rotational axis has its own `dir/name.<infix>.funscript`.

use std::path::{Path, PathBuf};

use crate::axis::{AXIS_COUNT, AxisId};
use crate::error::ScriptError;
use crate::script::{ScriptSet, load_script};

pub const SCRIPT_EXTENSION: &str = "funscript";

/// Script path that would belong to `axis` for `media`.
pub fn candidate_path(media: &Path, axis: AxisId) -> PathBuf {
    let mut name = media.file_stem().unwrap_or_default().to_os_string();
    if let Some(infix) = axis.script_infix() {
        name.push(".");
        name.push(infix);
    }
    name.push(".");
    name.push(SCRIPT_EXTENSION);
    media.with_file_name(name)
}

/// Existing script files per axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedScripts {
    paths: [Option<PathBuf>; AXIS_COUNT],
}

impl MatchedScripts {
    pub fn get(&self, axis: AxisId) -> Option<&Path> {
        self.paths[axis.index()].as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AxisId, &Path)> {
        AxisId::ALL
            .into_iter()
            .filter_map(|a| self.get(a).map(|p| (a, p)))
    }
}

/// Look for every axis's script next to `media`. No file is opened.
pub fn match_scripts(media: &Path) -> MatchedScripts {
    let mut found = MatchedScripts::default();
    for axis in AxisId::ALL {
        let path = candidate_path(media, axis);
        if path.is_file() {
            tracing::debug!(%axis, path = %path.display(), "script matched");
            found.paths[axis.index()] = Some(path);
        }
    }
    found
}

/// Tracks loaded for a media file plus the files that failed to load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub scripts: ScriptSet,
    pub matched: MatchedScripts,
    pub failures: Vec<(AxisId, ScriptError)>,
}

/// Match and parse every companion script of `media`.
///
/// The stroke file is loaded first; if it is a multi-axis container its
/// extra axes are used only where no dedicated file exists. A file that fails
/// to load leaves its axis without a track and is reported in `failures`.
pub fn load_for_media(media: &Path) -> LoadReport {
    let matched = match_scripts(media);
    let mut report = LoadReport::default();

    for (axis, path) in matched.iter() {
        match load_script(path, axis) {
            Ok(set) if axis == AxisId::Stroke => report.scripts.merge_missing(set),
            Ok(mut set) => {
                // A dedicated file only speaks for its own axis.
                if let Some(track) = set.take(axis) {
                    report.scripts.put(axis, track);
                }
            }
            Err(e) => {
                tracing::warn!(%axis, path = %path.display(), error = %e, "script load failed");
                report.failures.push((axis, e));
            }
        }
    }
    report.matched = matched;
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_follow_naming_convention() {
        let media = Path::new("/videos/scene.one.mp4");
        assert_eq!(
            candidate_path(media, AxisId::Stroke),
            PathBuf::from("/videos/scene.one.funscript")
        );
        assert_eq!(
            candidate_path(media, AxisId::Twist),
            PathBuf::from("/videos/scene.one.twist.funscript")
        );
        assert_eq!(
            candidate_path(media, AxisId::Pitch),
            PathBuf::from("/videos/scene.one.pitch.funscript")
        );
    }

    #[test]
    fn relative_media_without_directory() {
        assert_eq!(
            candidate_path(Path::new("clip.mkv"), AxisId::Roll),
            PathBuf::from("clip.roll.funscript")
        );
    }
}
