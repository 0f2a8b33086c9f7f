//! Field-level comparison helpers used by every resource kind.
//!
//! - [`Drift`] collects the names of fields whose desired and observed values differ.
//! - [`LateInit`] copies provider-chosen values into unset optional fields.
//! - [`ensure_unchanged`] guards immutable fields before an update.

use super::LifecycleError;

/// Names of fields whose desired value differs from the observed one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    fields: Vec<&'static str>,
}

impl Drift {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a required field.
    pub fn field<T: PartialEq + ?Sized>(mut self, name: &'static str, desired: &T, observed: &T) -> Self {
        if desired != observed {
            self.fields.push(name);
        }
        self
    }

    /// Compare an optional field; an unset desired value defaults to the
    /// observed one and never drifts.
    pub fn optional<T: PartialEq + ?Sized>(
        self,
        name: &'static str,
        desired: Option<&T>,
        observed: &T,
    ) -> Self {
        self.field(name, desired.unwrap_or(observed), observed)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }
}

/// Names of optional fields filled in from the observed state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LateInit {
    fields: Vec<&'static str>,
}

impl LateInit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt the observed string when the desired one is unset and the
    /// observed one is non-empty.
    pub fn string(mut self, name: &'static str, desired: &mut Option<String>, observed: &str) -> Self {
        if desired.is_none() && !observed.is_empty() {
            *desired = Some(observed.to_string());
            self.fields.push(name);
        }
        self
    }

    /// Adopt the observed value whenever the desired one is unset. For
    /// fields with no "empty" representation (flags, priorities).
    pub fn value<T: Clone>(mut self, name: &'static str, desired: &mut Option<T>, observed: &T) -> Self {
        if desired.is_none() {
            *desired = Some(observed.clone());
            self.fields.push(name);
        }
        self
    }

    pub fn changed(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }
}

/// Fail with [`LifecycleError::ImmutableField`] if an immutable field changed.
pub fn ensure_unchanged<T: PartialEq + ?Sized>(
    kind: &'static str,
    field: &'static str,
    desired: &T,
    observed: &T,
) -> Result<(), LifecycleError> {
    if desired != observed {
        tracing::warn!("Refusing to change immutable field {} of {}", field, kind);
        return Err(LifecycleError::ImmutableField { kind, field });
    }
    Ok(())
}
