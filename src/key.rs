//! Identification of physically distinct power supply units.

use core::fmt;

/// USB path of the Heinzinger PSU (30 kV, no relay).
///
/// Paths stay valid only while the supplies remain in the same physical
/// ports.
pub const USB_PATH_HEINZINGER: &str = "@00110000";

/// USB path of the FUG PSU (50 kV, with relay).
pub const USB_PATH_FUG: &str = "@00120000";

/// Key identifying one physical PSU in the registry.
///
/// A device is addressed either by enumeration order (`Index`) or by its
/// USB topology path (`UsbPath`), which survives re-enumeration and is the
/// preferred form when more than one identical supply is attached.
///
/// Two keys are equal iff they have the same variant and the same value.
/// The registry does not check that two different keys refer to two
/// different physical units; that is caller discipline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceKey {
    /// Logical slot by enumeration order, 0 for the first device found.
    Index(u32),
    /// USB topology path, e.g. `"@00110000"`.
    UsbPath(String),
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKey::Index(index) => write!(f, "{index}"),
            DeviceKey::UsbPath(path) => f.write_str(path),
        }
    }
}

impl From<u32> for DeviceKey {
    fn from(index: u32) -> Self {
        DeviceKey::Index(index)
    }
}

impl From<&str> for DeviceKey {
    fn from(path: &str) -> Self {
        DeviceKey::UsbPath(path.to_owned())
    }
}

impl From<String> for DeviceKey {
    fn from(path: String) -> Self {
        DeviceKey::UsbPath(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_by_variant_and_value() {
        assert_eq!(DeviceKey::Index(0), DeviceKey::from(0u32));
        assert_ne!(DeviceKey::Index(0), DeviceKey::Index(1));
        assert_eq!(
            DeviceKey::from(USB_PATH_FUG),
            DeviceKey::UsbPath(USB_PATH_FUG.to_owned())
        );
        // An index never equals a path, whatever the rendering.
        assert_ne!(DeviceKey::Index(0), DeviceKey::UsbPath("0".to_owned()));
    }

    #[test]
    fn display_renders_the_raw_identifier() {
        assert_eq!(DeviceKey::Index(3).to_string(), "3");
        assert_eq!(DeviceKey::from("@00110000").to_string(), "@00110000");
    }
}
