/// Default plugin search locations for the current platform.
///
/// System-wide folders come first, then per-user folders, then any entries
/// from the `CLAP_PATH` environment variable. Folders that do not exist are
/// still returned; the walker skips missing roots silently.
use std::path::PathBuf;

/// Environment variable listing extra CLAP folders, separated like `PATH`.
pub const CLAP_PATH_ENV: &str = "CLAP_PATH";

/// Returns the built-in search roots a fresh scan configuration starts with.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = system_paths();
    paths.extend(user_paths());
    if let Some(value) = std::env::var_os(CLAP_PATH_ENV) {
        paths.extend(std::env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()));
    }
    paths
}

#[cfg(windows)]
fn system_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(r"C:\Program Files\Common Files\VST3"),
        PathBuf::from(r"C:\Program Files\Common Files\VST2"),
        PathBuf::from(r"C:\Program Files\Common Files\CLAP"),
    ]
}

#[cfg(windows)]
fn user_paths() -> Vec<PathBuf> {
    let Some(local) = std::env::var_os("LOCALAPPDATA") else {
        return Vec::new();
    };
    let common = PathBuf::from(local).join("Programs").join("Common");
    vec![common.join("VST3"), common.join("CLAP")]
}

#[cfg(target_os = "macos")]
fn system_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/Library/Audio/Plug-Ins/VST"),
        PathBuf::from("/Library/Audio/Plug-Ins/VST3"),
        PathBuf::from("/Library/Audio/Plug-Ins/CLAP"),
    ]
}

#[cfg(target_os = "macos")]
fn user_paths() -> Vec<PathBuf> {
    let Some(home) = std::env::var_os("HOME") else {
        return Vec::new();
    };
    let base = PathBuf::from(home).join("Library/Audio/Plug-Ins");
    vec![base.join("VST"), base.join("VST3"), base.join("CLAP")]
}

#[cfg(all(not(windows), not(target_os = "macos")))]
fn system_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/lib/vst"),
        PathBuf::from("/usr/lib/vst3"),
        PathBuf::from("/usr/lib/clap"),
        PathBuf::from("/usr/local/lib/vst"),
        PathBuf::from("/usr/local/lib/vst3"),
        PathBuf::from("/usr/local/lib/clap"),
    ]
}

#[cfg(all(not(windows), not(target_os = "macos")))]
fn user_paths() -> Vec<PathBuf> {
    let Some(home) = std::env::var_os("HOME") else {
        return Vec::new();
    };
    let home = PathBuf::from(home);
    vec![home.join(".vst"), home.join(".vst3"), home.join(".clap")]
}
