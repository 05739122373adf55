//! The local hub's own service table, keyed by the endpoint that published
//! each entry.

use hub_types::{parse_legacy_service_descriptor, EndpointId, ServiceInfo};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("service descriptor {0:?} uses the legacy compatibility format and cannot be published directly")]
    LegacyFormat(String),
    #[error("service descriptor {0:?} duplicated within a single publish call")]
    DuplicateInBatch(String),
    #[error("service descriptor {0:?} already published")]
    AlreadyPublished(String),
}

/// Mutex-guarded set of `(endpoint, ServiceInfo)` published by applications
/// hosted on this hub. Backs the router's service-discovery callbacks for
/// this hub (`get_endpoint_for_service`, `does_endpoint_have_service`,
/// `for_each_service`).
#[derive(Default)]
pub struct PublishedServices {
    entries: Mutex<Vec<(EndpointId, ServiceInfo)>>,
}

impl PublishedServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a batch of services published by one endpoint.
    /// All-or-nothing: if any entry fails validation, none are appended.
    pub fn publish(
        &self,
        endpoint: EndpointId,
        services: Vec<ServiceInfo>,
    ) -> Result<(), PublishError> {
        let mut entries = self.entries.lock().unwrap();

        for (i, svc) in services.iter().enumerate() {
            if parse_legacy_service_descriptor(&svc.descriptor).is_some() {
                return Err(PublishError::LegacyFormat(svc.descriptor.clone()));
            }
            if services[..i].iter().any(|s| s.descriptor == svc.descriptor) {
                return Err(PublishError::DuplicateInBatch(svc.descriptor.clone()));
            }
            if entries.iter().any(|(_, s)| s.descriptor == svc.descriptor) {
                return Err(PublishError::AlreadyPublished(svc.descriptor.clone()));
            }
        }

        entries.extend(services.into_iter().map(|svc| (endpoint, svc)));
        Ok(())
    }

    pub fn remove_all_for_endpoint(&self, endpoint: EndpointId) {
        self.entries.lock().unwrap().retain(|(ep, _)| *ep != endpoint);
    }

    pub fn get_endpoint_for_service(&self, descriptor: &str) -> Option<EndpointId> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|(_, svc)| svc.descriptor == descriptor)
            .map(|(ep, _)| *ep)
    }

    pub fn does_endpoint_have_service(&self, endpoint: EndpointId, descriptor: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|(ep, svc)| *ep == endpoint && svc.descriptor == descriptor)
    }

    pub fn for_each(&self, mut f: impl FnMut(EndpointId, &ServiceInfo)) {
        for (ep, svc) in self.entries.lock().unwrap().iter() {
            f(*ep, svc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_types::ServiceFormat;

    fn svc(descriptor: &str) -> ServiceInfo {
        ServiceInfo::new(descriptor, 1, 0, ServiceFormat::Custom).unwrap()
    }

    #[test]
    fn rejects_duplicate_within_batch() {
        let table = PublishedServices::new();
        let err = table
            .publish(EndpointId(1), vec![svc("a.b"), svc("a.b")])
            .unwrap_err();
        assert_eq!(err, PublishError::DuplicateInBatch("a.b".into()));
    }

    #[test]
    fn rejects_already_published() {
        let table = PublishedServices::new();
        table.publish(EndpointId(1), vec![svc("a.b")]).unwrap();
        let err = table.publish(EndpointId(2), vec![svc("a.b")]).unwrap_err();
        assert_eq!(err, PublishError::AlreadyPublished("a.b".into()));
    }

    #[test]
    fn rejects_legacy_format() {
        let table = PublishedServices::new();
        let legacy = "chre.nanoapp_0x0011223344556677.service_0x8899aabbccddeeff";
        let err = table
            .publish(EndpointId(1), vec![svc(legacy)])
            .unwrap_err();
        assert_eq!(err, PublishError::LegacyFormat(legacy.into()));
    }

    #[test]
    fn removes_by_endpoint() {
        let table = PublishedServices::new();
        table.publish(EndpointId(1), vec![svc("a.b")]).unwrap();
        table.remove_all_for_endpoint(EndpointId(1));
        assert!(table.get_endpoint_for_service("a.b").is_none());
    }
}
