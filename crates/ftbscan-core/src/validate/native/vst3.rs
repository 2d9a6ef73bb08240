/// VST3 description through the plugin factory interfaces.
///
/// Only the factory is touched: classes are enumerated and described, but
/// no component is ever created. Channel counts are therefore reported as 0.
use super::fixed_c_str;
use crate::validate::host::{HostError, PluginDescription};
use crate::validate::library::LoadedLibrary;
use std::ffi::{c_char, c_void};
use std::path::Path;
use tracing::debug;

pub type Tuid = [c_char; 16];
pub type TResult = i32;

pub const RESULT_OK: TResult = 0;

/// Class category of processing components.
pub const AUDIO_MODULE_CLASS: &str = "Audio Module Class";

const INSTRUMENT_SUBCATEGORY: &str = "Instrument";

/// `IPluginFactory2` interface id.
pub const IPLUGIN_FACTORY2_IID: Tuid = tuid(0x0007_B650, 0xF24B_4C0B, 0xA464_EDB9, 0xF00B_2ABB);

/// Build an interface id from its four 32-bit words, in the byte order the
/// platform's SDK uses (COM layout on Windows, big-endian elsewhere).
pub const fn tuid(l1: u32, l2: u32, l3: u32, l4: u32) -> Tuid {
    let a = if cfg!(windows) {
        l1.to_le_bytes()
    } else {
        l1.to_be_bytes()
    };
    let b = l2.to_be_bytes();
    let b = if cfg!(windows) {
        [b[1], b[0], b[3], b[2]]
    } else {
        b
    };
    let c = l3.to_be_bytes();
    let d = l4.to_be_bytes();
    let bytes = [
        a[0], a[1], a[2], a[3], b[0], b[1], b[2], b[3], c[0], c[1], c[2], c[3], d[0], d[1], d[2],
        d[3],
    ];
    let mut out = [0 as c_char; 16];
    let mut i = 0;
    while i < 16 {
        out[i] = bytes[i] as c_char;
        i += 1;
    }
    out
}

/// Fold a 16-byte class id into the numeric id hosts expect.
pub fn fold_class_id(cid: &Tuid) -> i32 {
    cid.chunks_exact(4)
        .map(|chunk| {
            i32::from_be_bytes([chunk[0] as u8, chunk[1] as u8, chunk[2] as u8, chunk[3] as u8])
        })
        .fold(0, |acc, word| acc ^ word)
}

#[repr(C)]
pub struct PFactoryInfo {
    pub vendor: [c_char; 64],
    pub url: [c_char; 256],
    pub email: [c_char; 128],
    pub flags: i32,
}

#[repr(C)]
pub struct PClassInfo {
    pub cid: Tuid,
    pub cardinality: i32,
    pub category: [c_char; 32],
    pub name: [c_char; 64],
}

#[repr(C)]
pub struct PClassInfo2 {
    pub cid: Tuid,
    pub cardinality: i32,
    pub category: [c_char; 32],
    pub name: [c_char; 64],
    pub class_flags: u32,
    pub sub_categories: [c_char; 128],
    pub vendor: [c_char; 64],
    pub version: [c_char; 64],
    pub sdk_version: [c_char; 64],
}

/// `IPluginFactory` object: a pointer to its vtable.
#[repr(C)]
pub struct FactoryObject {
    pub vtbl: *const IPluginFactoryVtbl,
}

#[repr(C)]
pub struct IPluginFactoryVtbl {
    pub query_interface: unsafe extern "system" fn(
        this: *mut FactoryObject,
        iid: *const Tuid,
        obj: *mut *mut c_void,
    ) -> TResult,
    pub add_ref: unsafe extern "system" fn(this: *mut FactoryObject) -> u32,
    pub release: unsafe extern "system" fn(this: *mut FactoryObject) -> u32,
    pub get_factory_info:
        unsafe extern "system" fn(this: *mut FactoryObject, info: *mut PFactoryInfo) -> TResult,
    pub count_classes: unsafe extern "system" fn(this: *mut FactoryObject) -> i32,
    pub get_class_info: unsafe extern "system" fn(
        this: *mut FactoryObject,
        index: i32,
        info: *mut PClassInfo,
    ) -> TResult,
    pub create_instance: unsafe extern "system" fn(
        this: *mut FactoryObject,
        cid: *const Tuid,
        iid: *const Tuid,
        obj: *mut *mut c_void,
    ) -> TResult,
}

/// `IPluginFactory2` extends the base vtable with one method.
#[repr(C)]
pub struct IPluginFactory2Vtbl {
    pub base: IPluginFactoryVtbl,
    pub get_class_info2: unsafe extern "system" fn(
        this: *mut FactoryObject,
        index: i32,
        info: *mut PClassInfo2,
    ) -> TResult,
}

type GetPluginFactoryProc = unsafe extern "system" fn() -> *mut FactoryObject;

#[cfg(windows)]
type InitDllProc = unsafe extern "system" fn() -> bool;
#[cfg(windows)]
type ExitDllProc = unsafe extern "system" fn() -> bool;
#[cfg(all(unix, not(target_os = "macos")))]
type ModuleEntryProc = unsafe extern "C" fn(handle: *mut c_void) -> bool;
#[cfg(all(unix, not(target_os = "macos")))]
type ModuleExitProc = unsafe extern "C" fn() -> bool;

/// Owned reference to a factory interface; released on drop.
struct FactoryRef(*mut FactoryObject);

impl FactoryRef {
    unsafe fn vtbl(&self) -> &IPluginFactoryVtbl {
        &*(*self.0).vtbl
    }
}

impl Drop for FactoryRef {
    fn drop(&mut self) {
        // SAFETY: the pointer was non-null and owned one reference.
        unsafe {
            (self.vtbl().release)(self.0);
        }
    }
}

/// Describe every audio module class in a VST3 library.
pub fn describe(path: &Path) -> Result<Vec<PluginDescription>, HostError> {
    // SAFETY: see `LoadedLibrary::open`; the caller isolates panics.
    let library =
        unsafe { LoadedLibrary::open(path) }.map_err(|err| HostError::Load(err.to_string()))?;

    // SAFETY: the module entry points have these signatures.
    unsafe { enter_module(&library)? };

    // SAFETY: `GetPluginFactory` has this signature; the factory is
    // released inside `probe_factory` before the module exits.
    let result = unsafe {
        match library.function::<GetPluginFactoryProc>(b"GetPluginFactory\0") {
            Some(get_factory) => probe_factory(get_factory()),
            None => Err(HostError::MissingSymbol("GetPluginFactory")),
        }
    };

    // SAFETY: as above.
    unsafe { exit_module(&library) };
    library.release();
    result
}

#[cfg(windows)]
unsafe fn enter_module(library: &LoadedLibrary) -> Result<(), HostError> {
    if let Some(init) = library.function::<InitDllProc>(b"InitDll\0") {
        if !init() {
            return Err(HostError::Plugin("InitDll failed".into()));
        }
    }
    Ok(())
}

#[cfg(windows)]
unsafe fn exit_module(library: &LoadedLibrary) {
    if let Some(exit) = library.function::<ExitDllProc>(b"ExitDll\0") {
        exit();
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
unsafe fn enter_module(library: &LoadedLibrary) -> Result<(), HostError> {
    if let Some(entry) = library.function::<ModuleEntryProc>(b"ModuleEntry\0") {
        if !entry(library.native_handle()) {
            return Err(HostError::Plugin("ModuleEntry failed".into()));
        }
    }
    Ok(())
}

#[cfg(all(unix, not(target_os = "macos")))]
unsafe fn exit_module(library: &LoadedLibrary) {
    if let Some(exit) = library.function::<ModuleExitProc>(b"ModuleExit\0") {
        exit();
    }
}

// macOS bundles are entered through `bundleEntry(CFBundleRef)`, which needs
// a CoreFoundation bundle; plain binaries are probed without it.
#[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
unsafe fn enter_module(_library: &LoadedLibrary) -> Result<(), HostError> {
    Ok(())
}

#[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
unsafe fn exit_module(_library: &LoadedLibrary) {}

/// Describe the audio module classes of a factory and release it.
///
/// # Safety
///
/// `factory` must be null or an `IPluginFactory` carrying one reference
/// owned by the caller.
pub unsafe fn probe_factory(factory: *mut FactoryObject) -> Result<Vec<PluginDescription>, HostError> {
    if factory.is_null() {
        return Err(HostError::Plugin("GetPluginFactory returned no factory".into()));
    }
    let factory = FactoryRef(factory);
    let vtbl = factory.vtbl();

    let mut factory_info: PFactoryInfo = std::mem::zeroed();
    let factory_vendor = if (vtbl.get_factory_info)(factory.0, &mut factory_info) == RESULT_OK {
        fixed_c_str(&factory_info.vendor)
    } else {
        String::new()
    };

    let mut raw2: *mut c_void = std::ptr::null_mut();
    let factory2 = if (vtbl.query_interface)(factory.0, &IPLUGIN_FACTORY2_IID, &mut raw2)
        == RESULT_OK
        && !raw2.is_null()
    {
        Some(FactoryRef(raw2 as *mut FactoryObject))
    } else {
        None
    };

    let count = (vtbl.count_classes)(factory.0).max(0);
    let mut found = Vec::new();
    for index in 0..count {
        let mut info: PClassInfo = std::mem::zeroed();
        if (vtbl.get_class_info)(factory.0, index, &mut info) != RESULT_OK {
            continue;
        }
        if fixed_c_str(&info.category) != AUDIO_MODULE_CLASS {
            continue;
        }

        let mut desc = PluginDescription {
            name: fixed_c_str(&info.name),
            manufacturer: factory_vendor.clone(),
            unique_id: fold_class_id(&info.cid),
            ..PluginDescription::default()
        };

        if let Some(f2) = &factory2 {
            let vtbl2 = &*((*f2.0).vtbl as *const IPluginFactory2Vtbl);
            let mut info2: PClassInfo2 = std::mem::zeroed();
            if (vtbl2.get_class_info2)(f2.0, index, &mut info2) == RESULT_OK {
                let sub_categories = fixed_c_str(&info2.sub_categories);
                let vendor = fixed_c_str(&info2.vendor);
                if !vendor.is_empty() {
                    desc.manufacturer = vendor;
                }
                desc.version = fixed_c_str(&info2.version);
                desc.is_instrument = sub_categories
                    .split('|')
                    .any(|part| part == INSTRUMENT_SUBCATEGORY);
                desc.category = sub_categories;
            }
        }

        debug!("VST3 class {index}: {}", desc.name);
        found.push(desc);
    }
    Ok(found)
}
