/// VST2 description through the `AEffect` C ABI.
///
/// The plugin main function is called with a minimal host callback, the
/// returned effect is opened, queried through its dispatcher and closed
/// again. Nothing is processed.
use super::fixed_c_str;
use crate::model::name_from_path;
use crate::validate::host::{HostError, PluginDescription};
use crate::validate::library::LoadedLibrary;
use std::ffi::{c_char, c_void};
use std::path::Path;

/// `'VstP'`
pub const VST_MAGIC: i32 = i32::from_be_bytes(*b"VstP");

/// Host version reported through `audioMasterVersion`.
const HOST_VST_VERSION: isize = 2400;

const AUDIO_MASTER_VERSION: i32 = 1;

const EFF_OPEN: i32 = 0;
const EFF_CLOSE: i32 = 1;
const EFF_GET_PLUG_CATEGORY: i32 = 35;
const EFF_GET_EFFECT_NAME: i32 = 45;
const EFF_GET_VENDOR_STRING: i32 = 47;
const EFF_GET_PRODUCT_STRING: i32 = 48;
const EFF_GET_VENDOR_VERSION: i32 = 49;

const EFF_FLAGS_IS_SYNTH: i32 = 1 << 8;

const PLUG_CATEGORY_SYNTH: isize = 2;

/// Plugins are known to overrun the documented 32/64-byte string limits.
const STRING_BUFFER_LEN: usize = 256;

pub type DispatcherProc = unsafe extern "C" fn(
    effect: *mut AEffect,
    opcode: i32,
    index: i32,
    value: isize,
    ptr: *mut c_void,
    opt: f32,
) -> isize;

pub type HostCallback = DispatcherProc;

pub type PluginMain = unsafe extern "C" fn(callback: HostCallback) -> *mut AEffect;

#[repr(C)]
pub struct AEffect {
    pub magic: i32,
    pub dispatcher: Option<DispatcherProc>,
    pub process: *const c_void,
    pub set_parameter: *const c_void,
    pub get_parameter: *const c_void,
    pub num_programs: i32,
    pub num_params: i32,
    pub num_inputs: i32,
    pub num_outputs: i32,
    pub flags: i32,
    pub reserved1: isize,
    pub reserved2: isize,
    pub initial_delay: i32,
    pub real_qualities: i32,
    pub off_qualities: i32,
    pub io_ratio: f32,
    pub object: *mut c_void,
    pub user: *mut c_void,
    pub unique_id: i32,
    pub version: i32,
    pub process_replacing: *const c_void,
    pub process_double_replacing: *const c_void,
    pub future: [u8; 56],
}

/// Describe the plugin in a VST2 library.
pub fn describe(path: &Path) -> Result<PluginDescription, HostError> {
    // SAFETY: see `LoadedLibrary::open`; the caller isolates panics.
    let library =
        unsafe { LoadedLibrary::open(path) }.map_err(|err| HostError::Load(err.to_string()))?;

    // SAFETY: both names are the documented VST2 entry points with this
    // signature.
    let main = unsafe {
        library
            .function::<PluginMain>(b"VSTPluginMain\0")
            .or_else(|| library.function::<PluginMain>(b"main\0"))
    }
    .ok_or(HostError::MissingSymbol("VSTPluginMain"))?;

    // SAFETY: `main` came from this library, which stays loaded until
    // `release` below.
    let mut desc = unsafe { probe_main(main) }?;
    library.release();

    if desc.name.is_empty() {
        desc.name = name_from_path(path);
    }
    Ok(desc)
}

/// Instantiate the effect through `main`, read its identity and close it.
///
/// # Safety
///
/// `main` must be a VST2 plugin main function.
pub unsafe fn probe_main(main: PluginMain) -> Result<PluginDescription, HostError> {
    let effect = main(host_callback);
    if effect.is_null() {
        return Err(HostError::Plugin("plugin main returned no effect".into()));
    }
    if (*effect).magic != VST_MAGIC {
        return Err(HostError::Plugin("bad AEffect magic".into()));
    }
    let dispatcher = (*effect)
        .dispatcher
        .ok_or_else(|| HostError::Plugin("effect has no dispatcher".into()))?;

    dispatcher(effect, EFF_OPEN, 0, 0, std::ptr::null_mut(), 0.0);

    let mut name = dispatch_string(dispatcher, effect, EFF_GET_EFFECT_NAME);
    if name.is_empty() {
        name = dispatch_string(dispatcher, effect, EFF_GET_PRODUCT_STRING);
    }
    let manufacturer = dispatch_string(dispatcher, effect, EFF_GET_VENDOR_STRING);
    let mut vendor_version =
        dispatcher(effect, EFF_GET_VENDOR_VERSION, 0, 0, std::ptr::null_mut(), 0.0) as i32;
    if vendor_version == 0 || vendor_version == -1 {
        vendor_version = (*effect).version;
    }
    let category = dispatcher(effect, EFF_GET_PLUG_CATEGORY, 0, 0, std::ptr::null_mut(), 0.0);

    let flags = (*effect).flags;
    let desc = PluginDescription {
        name,
        version: format_vendor_version(vendor_version),
        manufacturer,
        category: category_name(category).to_string(),
        unique_id: (*effect).unique_id,
        num_inputs: (*effect).num_inputs.max(0) as u32,
        num_outputs: (*effect).num_outputs.max(0) as u32,
        is_instrument: flags & EFF_FLAGS_IS_SYNTH != 0 || category == PLUG_CATEGORY_SYNTH,
    };

    // The effect frees itself on close; nothing may touch it afterwards.
    dispatcher(effect, EFF_CLOSE, 0, 0, std::ptr::null_mut(), 0.0);
    Ok(desc)
}

unsafe fn dispatch_string(dispatcher: DispatcherProc, effect: *mut AEffect, opcode: i32) -> String {
    let mut buf = [0 as c_char; STRING_BUFFER_LEN];
    dispatcher(effect, opcode, 0, 0, buf.as_mut_ptr() as *mut c_void, 0.0);
    fixed_c_str(&buf)
}

/// Answers the only question a plugin needs during a scan: the host version.
unsafe extern "C" fn host_callback(
    _effect: *mut AEffect,
    opcode: i32,
    _index: i32,
    _value: isize,
    _ptr: *mut c_void,
    _opt: f32,
) -> isize {
    match opcode {
        AUDIO_MASTER_VERSION => HOST_VST_VERSION,
        _ => 0,
    }
}

/// Render a vendor version number.
///
/// Small values are decimal-coded (`1200` is `1.2.0.0`); anything with more
/// than four decimal digits is treated as byte-coded (`0x01020300` is
/// `1.2.3.0`). Zero means unknown.
pub fn format_vendor_version(version: i32) -> String {
    if version == 0 || version == -1 {
        return String::new();
    }
    let v = version as u32;

    let mut parts: Vec<u32> = Vec::new();
    let mut rest = v;
    while rest != 0 {
        parts.push(rest % 10);
        rest /= 10;
    }
    if parts.len() > 4 {
        parts = v.to_be_bytes().iter().map(|&b| u32::from(b)).collect();
        while parts.first() == Some(&0) && parts.len() > 1 {
            parts.remove(0);
        }
    } else {
        parts.reverse();
    }

    parts
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Human-readable name for an `effGetPlugCategory` answer.
pub fn category_name(category: isize) -> &'static str {
    match category {
        1 => "Effect",
        2 => "Synth",
        3 => "Analysis",
        4 => "Mastering",
        5 => "Spacializer",
        6 => "RoomFx",
        7 => "SurroundFx",
        8 => "Restoration",
        9 => "OfflineProcess",
        10 => "Shell",
        11 => "Generator",
        _ => "",
    }
}
