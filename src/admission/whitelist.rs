use std::collections::HashSet;

use url::Url;

use super::{AdmissionDecision, AdmissionSubject};

/// Permits URLs whose host is exactly one of the configured domains.
///
/// There is no subdomain matching: `www.example.com` does not match an
/// entry of `example.com`.
#[derive(Debug, Clone, Default)]
pub struct WhitelistGate {
    domains: HashSet<String>,
}

impl WhitelistGate {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|domain| domain.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn check(&self, url: &str) -> AdmissionDecision {
        let host = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_default();

        let subject = AdmissionSubject::Domain(host.clone());
        if !host.is_empty() && self.domains.contains(&host) {
            AdmissionDecision::admit(subject)
        } else {
            AdmissionDecision::reject(subject)
        }
    }

    pub fn allowed(&self, url: &str) -> bool {
        self.check(url).admitted
    }
}
