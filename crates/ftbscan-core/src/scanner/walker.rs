/// Recursive directory walker that turns a search root into plugin candidates.
///
/// Uses `jwalk` in serial, sorted mode: validation loads third-party code
/// one file at a time on the scanning thread, so directory reads gain
/// nothing from a thread pool, and a sorted walk keeps catalog order stable
/// between runs.
///
/// Symlinks are never followed as directories. A symlink that resolves to a
/// regular file is classified like the file itself; one that resolves to
/// nothing is reported as an error.
use crate::model::{FormatMask, PluginFormat};
use crate::scanner::classify::classify;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Something the walk found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// A regular file whose extension matches an enabled format.
    Candidate { path: PathBuf, format: PluginFormat },
    /// An entry that could not be read. The walk carries on without it.
    Error {
        path: Option<PathBuf>,
        message: String,
    },
}

/// Totals for one walked root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    pub candidates: usize,
    pub errors: usize,
    /// The stop flag ended the walk early.
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectoryWalker {
    mask: FormatMask,
}

impl DirectoryWalker {
    pub fn new(mask: FormatMask) -> Self {
        Self { mask }
    }

    /// Walk `root`, calling `on_event` for every candidate and error.
    ///
    /// `stop` is checked before every entry. A root that does not exist is
    /// skipped without any event.
    pub fn walk<F>(&self, root: &Path, stop: &AtomicBool, mut on_event: F) -> WalkOutcome
    where
        F: FnMut(WalkEvent),
    {
        let mut outcome = WalkOutcome::default();

        if !root.exists() {
            debug!("Skipping missing search path {}", root.display());
            return outcome;
        }
        if self.mask.is_empty() {
            return outcome;
        }

        let walker = jwalk::WalkDir::new(root)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .parallelism(jwalk::Parallelism::Serial);

        for entry_result in walker {
            if stop.load(Ordering::Relaxed) {
                outcome.stopped = true;
                break;
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(err) => {
                    outcome.errors += 1;
                    let path = err.path().map(Path::to_path_buf);
                    warn!("Walk error under {}: {err}", root.display());
                    on_event(WalkEvent::Error {
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let path = entry.path();
            if file_type.is_symlink() {
                match std::fs::metadata(&path) {
                    Ok(meta) if meta.is_file() => {}
                    Ok(_) => continue,
                    Err(err) => {
                        outcome.errors += 1;
                        warn!("Unresolvable link {}: {err}", path.display());
                        on_event(WalkEvent::Error {
                            message: format!("{}: {err}", path.display()),
                            path: Some(path),
                        });
                        continue;
                    }
                }
            } else if !file_type.is_file() {
                continue;
            }

            if let Some(format) = classify(&path, self.mask) {
                outcome.candidates += 1;
                on_event(WalkEvent::Candidate { path, format });
            }
        }

        outcome
    }
}
