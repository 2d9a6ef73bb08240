/// CLAP validation by direct ABI probing.
///
/// Loads the candidate with the platform loader, resolves the exported
/// `clap_entry` object and runs the entry/factory/descriptor protocol:
///
/// 1. load fails: error, nothing to release;
/// 2. no entry, incompatible version, `init` fails or no plugin factory:
///    error, library released (and the entry de-initialised if `init` ran);
/// 3. factory has no plugins or no descriptor for index 0: error, entry
///    de-initialised, library released;
/// 4. success: descriptor copied, entry de-initialised, library released.
///
/// Only the first plugin of a multi-plugin binary is described.
use super::library::LoadedLibrary;
use super::{panic_message, ValidationError};
use crate::model::{sanitize_text, PluginId, PluginRecord};
use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Name of the exported entry object, NUL-terminated for symbol lookup.
pub const CLAP_ENTRY_SYMBOL: &[u8] = b"clap_entry\0";
pub const CLAP_PLUGIN_FACTORY_ID: &CStr = c"clap.plugin-factory";
pub const FEATURE_INSTRUMENT: &str = "instrument";
pub const FEATURE_AUDIO_EFFECT: &str = "audio-effect";

/// Upper bound on feature strings read from one descriptor. The array is
/// NUL-terminated by contract; this stops a broken plugin from running the
/// loop off into unrelated memory forever.
const MAX_FEATURES: usize = 256;

// ── C ABI ────────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClapVersion {
    pub major: u32,
    pub minor: u32,
    pub revision: u32,
}

impl ClapVersion {
    /// Any 1.x version is ABI compatible with this host.
    pub fn is_compatible(self) -> bool {
        self.major >= 1
    }
}

#[repr(C)]
pub struct ClapPluginEntry {
    pub clap_version: ClapVersion,
    pub init: Option<unsafe extern "C" fn(plugin_path: *const c_char) -> bool>,
    pub deinit: Option<unsafe extern "C" fn()>,
    pub get_factory: Option<unsafe extern "C" fn(factory_id: *const c_char) -> *const c_void>,
}

#[repr(C)]
pub struct ClapPluginFactory {
    pub get_plugin_count: Option<unsafe extern "C" fn(factory: *const ClapPluginFactory) -> u32>,
    pub get_plugin_descriptor: Option<
        unsafe extern "C" fn(factory: *const ClapPluginFactory, index: u32) -> *const ClapPluginDescriptor,
    >,
    pub create_plugin: Option<
        unsafe extern "C" fn(
            factory: *const ClapPluginFactory,
            host: *const c_void,
            plugin_id: *const c_char,
        ) -> *const c_void,
    >,
}

#[repr(C)]
pub struct ClapPluginDescriptor {
    pub clap_version: ClapVersion,
    pub id: *const c_char,
    pub name: *const c_char,
    pub vendor: *const c_char,
    pub url: *const c_char,
    pub manual_url: *const c_char,
    pub support_url: *const c_char,
    pub version: *const c_char,
    pub description: *const c_char,
    pub features: *const *const c_char,
}

// ── Probe ────────────────────────────────────────────────────────────────────

/// What the probe learned from the first descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClapInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub vendor: String,
    pub features: Vec<String>,
    pub is_synth: bool,
    pub is_effect: bool,
}

impl ClapInfo {
    /// Copy the probe result onto a record and mark it valid.
    pub fn apply_to(self, record: &mut PluginRecord) {
        record.name = self.name;
        record.version = self.version;
        record.vendor = self.vendor;
        record.unique_id = Some(PluginId::Text(self.id));
        record.features = self.features;
        record.is_synth = self.is_synth;
        record.is_effect = self.is_effect;
        record.is_valid = true;
        record.error = None;
    }
}

/// Load `path` as a CLAP binary and describe its first plugin.
pub fn validate_clap(path: &Path) -> Result<ClapInfo, ValidationError> {
    // SAFETY: loading runs foreign initialisers; that is the point of a
    // scanner and the reason this runs behind `catch_unwind` below.
    let library =
        unsafe { LoadedLibrary::open(path) }.map_err(|err| ValidationError::Load(err.to_string()))?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: `clap_entry` is a `const clap_plugin_entry_t` by the CLAP ABI.
        let entry = unsafe { library.data::<ClapPluginEntry>(CLAP_ENTRY_SYMBOL) }
            .ok_or(ValidationError::MissingEntry)?;
        let plugin_path = CString::new(path.to_string_lossy().into_owned())
            .map_err(|_| ValidationError::Load("path contains a NUL byte".into()))?;
        // SAFETY: the entry pointer stays valid while `library` is loaded,
        // which outlives this closure.
        unsafe { probe_entry(&*entry, &plugin_path) }
    }));

    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(ValidationError::ProbePanicked(panic_message(payload))),
    };
    library.release();
    result
}

/// Run steps 2–4 of the protocol against an already resolved entry.
///
/// # Safety
///
/// `entry` must point at a CLAP entry object whose function pointers and
/// returned factory/descriptor pointers obey the CLAP ABI.
pub unsafe fn probe_entry(
    entry: &ClapPluginEntry,
    plugin_path: &CStr,
) -> Result<ClapInfo, ValidationError> {
    let version = entry.clap_version;
    if !version.is_compatible() {
        return Err(ValidationError::IncompatibleVersion {
            major: version.major,
            minor: version.minor,
            revision: version.revision,
        });
    }

    let init = entry.init.ok_or(ValidationError::InitFailed)?;
    if !init(plugin_path.as_ptr()) {
        return Err(ValidationError::InitFailed);
    }
    // From here on every exit path must deinit the entry.
    let _initialized = EntryGuard(entry);

    let get_factory = entry.get_factory.ok_or(ValidationError::NoFactory)?;
    let factory = get_factory(CLAP_PLUGIN_FACTORY_ID.as_ptr()) as *const ClapPluginFactory;
    if factory.is_null() {
        return Err(ValidationError::NoFactory);
    }

    let count = match (*factory).get_plugin_count {
        Some(get_count) => get_count(factory),
        None => 0,
    };
    if count == 0 {
        return Err(ValidationError::NoPlugins);
    }

    let descriptor = match (*factory).get_plugin_descriptor {
        Some(get_descriptor) => get_descriptor(factory, 0),
        None => std::ptr::null(),
    };
    if descriptor.is_null() {
        return Err(ValidationError::NoDescriptor);
    }

    Ok(read_descriptor(&*descriptor))
}

/// Copy the strings out of a descriptor and classify its features.
///
/// # Safety
///
/// Every non-null string pointer must be NUL-terminated and `features`, if
/// non-null, must be a NUL-terminated array of such strings.
unsafe fn read_descriptor(desc: &ClapPluginDescriptor) -> ClapInfo {
    let mut info = ClapInfo {
        id: c_string(desc.id),
        name: c_string(desc.name),
        version: c_string(desc.version),
        vendor: c_string(desc.vendor),
        ..ClapInfo::default()
    };

    if !desc.features.is_null() {
        let mut cursor = desc.features;
        while !(*cursor).is_null() && info.features.len() < MAX_FEATURES {
            let feature = c_string(*cursor);
            if feature == FEATURE_INSTRUMENT {
                info.is_synth = true;
            }
            if feature == FEATURE_AUDIO_EFFECT {
                info.is_effect = true;
            }
            info.features.push(feature);
            cursor = cursor.add(1);
        }
    }
    info
}

unsafe fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        sanitize_text(&CStr::from_ptr(ptr).to_string_lossy()).into_owned()
    }
}

/// Calls the entry's `deinit` when dropped.
struct EntryGuard<'a>(&'a ClapPluginEntry);

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        if let Some(deinit) = self.0.deinit {
            // SAFETY: only constructed after a successful `init`.
            unsafe { deinit() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    const V1: ClapVersion = ClapVersion {
        major: 1,
        minor: 2,
        revision: 2,
    };

    // ── Fake plugin ──────────────────────────────────────────────────────────

    struct FakeDescriptor {
        desc: ClapPluginDescriptor,
        _features: Box<[*const c_char]>,
    }

    // SAFETY: every pointer refers to 'static C string literals.
    unsafe impl Sync for FakeDescriptor {}
    unsafe impl Send for FakeDescriptor {}

    fn descriptor() -> &'static FakeDescriptor {
        static DESCRIPTOR: OnceLock<FakeDescriptor> = OnceLock::new();
        DESCRIPTOR.get_or_init(|| {
            let features: Box<[*const c_char]> = vec![
                c"instrument".as_ptr(),
                c"synthesizer".as_ptr(),
                c"stereo".as_ptr(),
                ptr::null(),
            ]
            .into_boxed_slice();
            FakeDescriptor {
                desc: ClapPluginDescriptor {
                    clap_version: V1,
                    id: c"org.example.fake-synth".as_ptr(),
                    name: c"Fake Synth".as_ptr(),
                    vendor: c"Example Audio".as_ptr(),
                    url: ptr::null(),
                    manual_url: ptr::null(),
                    support_url: ptr::null(),
                    version: c"0.9.1".as_ptr(),
                    description: ptr::null(),
                    features: features.as_ptr(),
                },
                _features: features,
            }
        })
    }

    unsafe extern "C" fn one_plugin(_: *const ClapPluginFactory) -> u32 {
        1
    }

    unsafe extern "C" fn no_plugins(_: *const ClapPluginFactory) -> u32 {
        0
    }

    unsafe extern "C" fn first_descriptor(
        _: *const ClapPluginFactory,
        index: u32,
    ) -> *const ClapPluginDescriptor {
        if index == 0 {
            &descriptor().desc
        } else {
            ptr::null()
        }
    }

    static FACTORY: ClapPluginFactory = ClapPluginFactory {
        get_plugin_count: Some(one_plugin),
        get_plugin_descriptor: Some(first_descriptor),
        create_plugin: None,
    };

    static EMPTY_FACTORY: ClapPluginFactory = ClapPluginFactory {
        get_plugin_count: Some(no_plugins),
        get_plugin_descriptor: Some(first_descriptor),
        create_plugin: None,
    };

    unsafe extern "C" fn init_ok(_: *const c_char) -> bool {
        true
    }

    unsafe extern "C" fn init_fails(_: *const c_char) -> bool {
        false
    }

    unsafe extern "C" fn factory_for(id: *const c_char) -> *const c_void {
        if CStr::from_ptr(id) == CLAP_PLUGIN_FACTORY_ID {
            &FACTORY as *const ClapPluginFactory as *const c_void
        } else {
            ptr::null()
        }
    }

    unsafe extern "C" fn empty_factory(_: *const c_char) -> *const c_void {
        &EMPTY_FACTORY as *const ClapPluginFactory as *const c_void
    }

    unsafe extern "C" fn no_factory(_: *const c_char) -> *const c_void {
        ptr::null()
    }

    // One deinit counter per scenario; tests run in parallel.
    static DEINIT_OK: AtomicUsize = AtomicUsize::new(0);
    static DEINIT_INIT_FAILS: AtomicUsize = AtomicUsize::new(0);
    static DEINIT_NO_FACTORY: AtomicUsize = AtomicUsize::new(0);
    static DEINIT_EMPTY: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn deinit_ok() {
        DEINIT_OK.fetch_add(1, Ordering::SeqCst);
    }
    unsafe extern "C" fn deinit_init_fails() {
        DEINIT_INIT_FAILS.fetch_add(1, Ordering::SeqCst);
    }
    unsafe extern "C" fn deinit_no_factory() {
        DEINIT_NO_FACTORY.fetch_add(1, Ordering::SeqCst);
    }
    unsafe extern "C" fn deinit_empty() {
        DEINIT_EMPTY.fetch_add(1, Ordering::SeqCst);
    }

    fn probe(entry: &ClapPluginEntry) -> Result<ClapInfo, ValidationError> {
        unsafe { probe_entry(entry, c"/plugins/fake.clap") }
    }

    // ── Protocol ─────────────────────────────────────────────────────────────

    #[test]
    fn first_descriptor_is_read_and_features_classified() {
        let entry = ClapPluginEntry {
            clap_version: V1,
            init: Some(init_ok),
            deinit: Some(deinit_ok),
            get_factory: Some(factory_for),
        };

        let info = probe(&entry).unwrap();
        assert_eq!(info.id, "org.example.fake-synth");
        assert_eq!(info.name, "Fake Synth");
        assert_eq!(info.vendor, "Example Audio");
        assert_eq!(info.version, "0.9.1");
        assert_eq!(info.features, vec!["instrument", "synthesizer", "stereo"]);
        assert!(info.is_synth);
        assert!(!info.is_effect);
        assert_eq!(DEINIT_OK.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_init_is_not_deinitialised() {
        let entry = ClapPluginEntry {
            clap_version: V1,
            init: Some(init_fails),
            deinit: Some(deinit_init_fails),
            get_factory: Some(factory_for),
        };
        assert!(matches!(probe(&entry), Err(ValidationError::InitFailed)));
        assert_eq!(DEINIT_INIT_FAILS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_factory_deinitialises_entry() {
        let entry = ClapPluginEntry {
            clap_version: V1,
            init: Some(init_ok),
            deinit: Some(deinit_no_factory),
            get_factory: Some(no_factory),
        };
        assert!(matches!(probe(&entry), Err(ValidationError::NoFactory)));
        assert_eq!(DEINIT_NO_FACTORY.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_factory_is_rejected() {
        let entry = ClapPluginEntry {
            clap_version: V1,
            init: Some(init_ok),
            deinit: Some(deinit_empty),
            get_factory: Some(empty_factory),
        };
        let err = probe(&entry).unwrap_err();
        assert_eq!(err.to_string(), "No CLAP plugins found in factory");
        assert_eq!(DEINIT_EMPTY.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pre_release_versions_are_incompatible() {
        let entry = ClapPluginEntry {
            clap_version: ClapVersion {
                major: 0,
                minor: 26,
                revision: 0,
            },
            init: Some(init_ok),
            deinit: None,
            get_factory: Some(factory_for),
        };
        let err = probe(&entry).unwrap_err();
        assert_eq!(err.to_string(), "Incompatible CLAP version 0.26.0");
    }

    #[test]
    fn info_is_applied_as_text_id() {
        let mut record = PluginRecord::new(
            "fake.clap",
            crate::model::PluginFormat::Clap,
            crate::model::Architecture::X86_64,
        );
        ClapInfo {
            id: "org.example.fx".into(),
            name: "Fx".into(),
            version: "1".into(),
            vendor: "Ex".into(),
            features: vec!["audio-effect".into()],
            is_synth: false,
            is_effect: true,
        }
        .apply_to(&mut record);
        assert!(record.is_valid);
        assert_eq!(record.unique_id, Some(PluginId::Text("org.example.fx".into())));
        assert!(record.is_effect);
    }

    // ── Real loader ──────────────────────────────────────────────────────────

    #[test]
    fn unloadable_file_reports_loader_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("garbage.clap");
        std::fs::write(&path, b"not an executable image").unwrap();

        let err = validate_clap(&path).unwrap_err();
        assert!(matches!(err, ValidationError::Load(_)), "{err}");
    }

    /// A real shared library with no `clap_entry` must be rejected and
    /// released. Uses a library the test process already has mapped, so
    /// loading it again only bumps the loader's reference count.
    #[cfg(target_os = "linux")]
    #[test]
    fn library_without_entry_is_released() {
        let maps = std::fs::read_to_string("/proc/self/maps").unwrap();
        let Some(lib) = maps
            .lines()
            .filter_map(|line| line.split_whitespace().nth(5))
            .find(|p| p.starts_with('/') && p.contains(".so"))
        else {
            return;
        };

        let before = crate::validate::live_library_count();
        for _ in 0..3 {
            let err = validate_clap(Path::new(lib)).unwrap_err();
            assert!(matches!(err, ValidationError::MissingEntry), "{err}");
        }
        assert_eq!(crate::validate::live_library_count(), before);
    }
}
