//! Phase hooks.
//!
//! User-supplied script files run at the pack/place/route phase boundaries.
//! Each file's lines are fed through the embedded console's line parser so
//! multi-line statements behave exactly as they would interactively; the
//! statements are dispatched to whatever [`Runtime`] the embedder provides.

use kestrel_console::{ExecResult, Runtime, Session};
use std::path::{Path, PathBuf};

/// The phase boundaries a hook can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    /// Before the packer runs.
    PrePack,
    /// After packing, before placement.
    PrePlace,
    /// After routing and the post-route pass.
    PostRoute,
}

/// The script files attached to each phase boundary.
#[derive(Debug, Clone, Default)]
pub struct HookScripts {
    /// `--pre-pack FILE`.
    pub pre_pack: Option<PathBuf>,
    /// `--pre-place FILE`.
    pub pre_place: Option<PathBuf>,
    /// `--post-route FILE`.
    pub post_route: Option<PathBuf>,
}

impl HookScripts {
    /// Returns the script attached to `phase`, if any.
    pub fn script_for(&self, phase: HookPhase) -> Option<&Path> {
        match phase {
            HookPhase::PrePack => self.pre_pack.as_deref(),
            HookPhase::PrePlace => self.pre_place.as_deref(),
            HookPhase::PostRoute => self.post_route.as_deref(),
        }
    }
}

/// Runs one hook script through the console, returning each statement's
/// result. The first erroring statement stops execution.
pub fn run_hook<R: Runtime>(path: &Path, runtime: R) -> std::io::Result<Vec<ExecResult>> {
    let text = std::fs::read_to_string(path)?;
    let mut session = Session::new(runtime);
    let mut results = Vec::new();
    for line in text.lines() {
        for result in session.feed_line(line) {
            let failed = result.is_error;
            results.push(result);
            if failed {
                return Ok(results);
            }
        }
    }
    if let Some(result) = session.finish() {
        results.push(result);
    }
    Ok(results)
}
