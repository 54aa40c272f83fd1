//! Flags transient registrations whose implementation needs disposal.
//!
//! Transient instances have no owner: neither a scope nor the container keeps
//! them, so nothing ever calls their disposal contract.

use std::sync::Arc;

use super::{DiagnosticKind, DiagnosticResult, DiagnosticRule};
use crate::lifestyle::Lifestyle;
use crate::registration::Registration;

#[derive(Debug, Default, Clone, Copy)]
pub struct DisposableTransientComponentRule;

impl DiagnosticRule for DisposableTransientComponentRule {
    fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::DisposableTransientComponent
    }

    fn analyze(&self, registrations: &[Arc<Registration>]) -> Vec<DiagnosticResult> {
        registrations
            .iter()
            .filter(|reg| reg.lifestyle() == Lifestyle::Transient)
            .filter_map(|reg| {
                let contract = reg.implementation().capabilities.contract_name()?;
                Some(DiagnosticResult::new(
                    self.kind(),
                    describe(reg, contract),
                    vec![reg.clone()],
                ))
            })
            .collect()
    }
}

fn describe(reg: &Registration, contract: &str) -> String {
    let implementation = reg.implementation().friendly_name();
    if reg.is_self_bound() {
        format!("{implementation} is registered as transient, but implements {contract}.")
    } else {
        format!(
            "{implementation} is registered for {} as transient, but implements {contract}.",
            reg.service_key().friendly_name()
        )
    }
}
