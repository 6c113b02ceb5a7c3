//! Accessibility/input-monitoring trust check
//!
//! The gesture interceptor cannot install its event tap without the user
//! granting accessibility access. The prompting variant raises the system
//! remediation dialog on first call.

/// Check if the process is trusted for accessibility access.
/// Uses native Accessibility API (AXIsProcessTrusted).
#[cfg(target_os = "macos")]
pub fn is_trusted(prompt: bool) -> bool {
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
    use core_foundation::string::{CFString, CFStringRef};

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
        fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
        static kAXTrustedCheckOptionPrompt: CFStringRef;
    }

    unsafe {
        if !prompt {
            return AXIsProcessTrusted();
        }

        let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
        let options = CFDictionary::from_CFType_pairs(&[(
            key.as_CFType(),
            CFBoolean::true_value().as_CFType(),
        )]);
        AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef())
    }
}

/// No accessibility concept off macOS; the tap is unavailable either way.
#[cfg(not(target_os = "macos"))]
pub fn is_trusted(_prompt: bool) -> bool {
    false
}
