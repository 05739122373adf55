//! Service descriptors and the legacy textual compatibility form.

use crate::error::RouterError;
use serde::{Deserialize, Serialize};

/// Maximum length of a service descriptor string.
pub const SERVICE_DESCRIPTOR_MAX_LEN: usize = 127;

/// Wire format of a published service's payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceFormat {
    Custom,
    Aidl,
    PwRpcProtobuf,
}

/// A service an endpoint exposes, looked up by name during session open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub descriptor: String,
    pub major: u32,
    pub minor: u32,
    pub format: ServiceFormat,
}

impl ServiceInfo {
    pub fn new(
        descriptor: impl Into<String>,
        major: u32,
        minor: u32,
        format: ServiceFormat,
    ) -> Result<Self, RouterError> {
        let descriptor = descriptor.into();
        if descriptor.is_empty() {
            return Err(RouterError::EmptyName);
        }
        if descriptor.len() > SERVICE_DESCRIPTOR_MAX_LEN {
            return Err(RouterError::DescriptorTooLong {
                max: SERVICE_DESCRIPTOR_MAX_LEN,
            });
        }
        Ok(Self {
            descriptor,
            major,
            minor,
            format,
        })
    }

    /// True when the descriptor matches the legacy
    /// `chre.nanoapp_0x<16hex>.service_0x<16hex>` textual form.
    pub fn is_legacy_format(&self) -> bool {
        parse_legacy_service_descriptor(&self.descriptor).is_some()
    }
}

const LEGACY_PREFIX: &str = "chre.nanoapp_0x";
const LEGACY_SEPARATOR: &str = ".service_0x";
const LEGACY_TOTAL_LEN: usize =
    LEGACY_PREFIX.len() + 16 + LEGACY_SEPARATOR.len() + 16;

/// Parse the legacy descriptor form into `(nanoapp_id, service_id)`.
///
/// Only strings whose total length matches exactly and whose prefix,
/// separator and hex encodings are exact are accepted; anything else is
/// rejected (returns `None`), never panics.
pub fn parse_legacy_service_descriptor(descriptor: &str) -> Option<(u64, u64)> {
    if descriptor.len() != LEGACY_TOTAL_LEN || !descriptor.is_ascii() {
        return None;
    }
    if !descriptor.starts_with(LEGACY_PREFIX) {
        return None;
    }
    let after_prefix = &descriptor[LEGACY_PREFIX.len()..];
    let (nanoapp_hex, rest) = after_prefix.split_at(16);
    if !rest.starts_with(LEGACY_SEPARATOR) {
        return None;
    }
    let service_hex = &rest[LEGACY_SEPARATOR.len()..];
    if service_hex.len() != 16 {
        return None;
    }

    let nanoapp_id = u64::from_str_radix(nanoapp_hex, 16).ok()?;
    let service_id = u64::from_str_radix(service_hex, 16).ok()?;
    Some((nanoapp_id, service_id))
}

/// Format `(nanoapp_id, service_id)` as the legacy textual descriptor.
pub fn format_legacy_service_descriptor(nanoapp_id: u64, service_id: u64) -> String {
    format!("chre.nanoapp_0x{nanoapp_id:016x}.service_0x{service_id:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_legacy_descriptor() {
        let descriptor = format_legacy_service_descriptor(0xdead_beef, 0x1234_5678_9abc_def0);
        assert_eq!(descriptor.len(), LEGACY_TOTAL_LEN);
        let (nanoapp, service) = parse_legacy_service_descriptor(&descriptor).unwrap();
        assert_eq!(nanoapp, 0xdead_beef);
        assert_eq!(service, 0x1234_5678_9abc_def0);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(parse_legacy_service_descriptor("chre.nanoapp_0xdeadbeef.service_0x00").is_none());
    }

    #[test]
    fn rejects_bad_prefix() {
        let mut descriptor = format_legacy_service_descriptor(1, 2);
        descriptor.replace_range(0..4, "xxxx");
        assert!(parse_legacy_service_descriptor(&descriptor).is_none());
    }

    #[test]
    fn rejects_non_hex() {
        let bad = "chre.nanoapp_0xZZZZZZZZZZZZZZZZ.service_0x0000000000000000";
        assert_eq!(bad.len(), LEGACY_TOTAL_LEN);
        assert!(parse_legacy_service_descriptor(bad).is_none());
    }

    #[test]
    fn custom_descriptor_is_not_legacy() {
        let info = ServiceInfo::new("com.example.myservice", 1, 0, ServiceFormat::Aidl).unwrap();
        assert!(!info.is_legacy_format());
    }

    #[test]
    fn rejects_overlong_descriptor() {
        let descriptor = "x".repeat(SERVICE_DESCRIPTOR_MAX_LEN + 1);
        let err = ServiceInfo::new(descriptor, 1, 0, ServiceFormat::Custom).unwrap_err();
        assert_eq!(
            err,
            RouterError::DescriptorTooLong {
                max: SERVICE_DESCRIPTOR_MAX_LEN
            }
        );
    }
}
