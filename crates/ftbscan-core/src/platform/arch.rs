/// Host processor architecture detection.
///
/// Queries the OS rather than `cfg!(target_arch)`: a 32-bit or emulated
/// build running on a 64-bit machine should still report the native
/// processor, since that is what decides which plugin binaries can load.
use crate::model::Architecture;

/// Detect the architecture of the machine the scanner runs on.
///
/// Side-effect free and safe to call before any scanner exists.
#[cfg(windows)]
pub fn detect_architecture() -> Architecture {
    use windows::Win32::System::SystemInformation::{
        GetNativeSystemInfo, PROCESSOR_ARCHITECTURE_AMD64, PROCESSOR_ARCHITECTURE_ARM,
        PROCESSOR_ARCHITECTURE_ARM64, PROCESSOR_ARCHITECTURE_INTEL, SYSTEM_INFO,
    };

    let mut info = SYSTEM_INFO::default();
    // SAFETY: `info` is a valid out-pointer; the union arm read below is the
    // one GetNativeSystemInfo always fills.
    let arch = unsafe {
        GetNativeSystemInfo(&mut info);
        info.Anonymous.Anonymous.wProcessorArchitecture
    };

    if arch == PROCESSOR_ARCHITECTURE_AMD64 {
        Architecture::X86_64
    } else if arch == PROCESSOR_ARCHITECTURE_ARM64 {
        Architecture::Arm64
    } else if arch == PROCESSOR_ARCHITECTURE_INTEL {
        Architecture::X86
    } else if arch == PROCESSOR_ARCHITECTURE_ARM {
        Architecture::Arm32
    } else {
        Architecture::Unknown
    }
}

/// Detect the architecture of the machine the scanner runs on.
///
/// Apple only ships two architectures; `hw.optional.arm64` tells them apart
/// even for a Rosetta-translated process.
#[cfg(target_os = "macos")]
pub fn detect_architecture() -> Architecture {
    let mut value: libc::c_int = 0;
    let mut size = std::mem::size_of::<libc::c_int>();
    // SAFETY: name is NUL-terminated, out-pointers are valid for `size` bytes.
    let rc = unsafe {
        libc::sysctlbyname(
            c"hw.optional.arm64".as_ptr(),
            &mut value as *mut libc::c_int as *mut libc::c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    if rc == 0 && value == 1 {
        Architecture::Arm64
    } else {
        Architecture::X86_64
    }
}

/// Detect the architecture of the machine the scanner runs on.
#[cfg(all(unix, not(target_os = "macos")))]
pub fn detect_architecture() -> Architecture {
    // SAFETY: utsname is plain old data; uname fills it or returns -1.
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } == -1 {
        return Architecture::Unknown;
    }
    // SAFETY: the kernel NUL-terminates every utsname field.
    let machine = unsafe { std::ffi::CStr::from_ptr(uts.machine.as_ptr()) };
    architecture_from_machine(&machine.to_string_lossy())
}

#[cfg(not(any(unix, windows)))]
pub fn detect_architecture() -> Architecture {
    Architecture::Unknown
}

/// Map a `uname -m` machine string onto an [`Architecture`].
pub fn architecture_from_machine(machine: &str) -> Architecture {
    let machine = machine.trim().to_ascii_lowercase();
    match machine.as_str() {
        "x86_64" | "amd64" => Architecture::X86_64,
        "i386" | "i486" | "i586" | "i686" | "x86" => Architecture::X86,
        m if m.contains("aarch64") || m.contains("arm64") => Architecture::Arm64,
        m if m.contains("arm") => Architecture::Arm32,
        _ => Architecture::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_strings_map_to_tags() {
        assert_eq!(architecture_from_machine("x86_64"), Architecture::X86_64);
        assert_eq!(architecture_from_machine("amd64"), Architecture::X86_64);
        assert_eq!(architecture_from_machine("i686"), Architecture::X86);
        assert_eq!(architecture_from_machine("aarch64"), Architecture::Arm64);
        assert_eq!(architecture_from_machine("arm64"), Architecture::Arm64);
        assert_eq!(architecture_from_machine("armv7l"), Architecture::Arm32);
        assert_eq!(architecture_from_machine("riscv64"), Architecture::Unknown);
        assert_eq!(architecture_from_machine(""), Architecture::Unknown);
    }

    /// Whatever the host is, detection must not panic and must be stable.
    #[test]
    fn detection_is_stable() {
        assert_eq!(detect_architecture(), detect_architecture());
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn detects_x86_64_linux_host() {
        assert_eq!(detect_architecture(), Architecture::X86_64);
    }
}
