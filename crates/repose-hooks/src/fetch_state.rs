use crate::error::RequestError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Lifecycle of one logical request: the active phase plus the last data,
/// last error and the params of the last run.
///
/// Values are never patched in place; every transition builds the next state
/// from the previous one.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchState<P, R> {
    phase: Phase,
    data: Option<R>,
    error: Option<RequestError>,
    params: Option<P>,
}

impl<P, R> Default for FetchState<P, R> {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            data: None,
            error: None,
            params: None,
        }
    }
}

impl<P: Clone, R: Clone> FetchState<P, R> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn data(&self) -> Option<&R> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&RequestError> {
        self.error.as_ref()
    }

    pub fn params(&self) -> Option<&P> {
        self.params.as_ref()
    }

    pub fn into_data(self) -> Option<R> {
        self.data
    }

    /// Initial-state builder for `on_init` contributions.
    pub fn with_phase(self, phase: Phase) -> Self {
        Self { phase, ..self }
    }

    /// Initial-state builder for `on_init` contributions.
    pub fn with_data(self, data: R) -> Self {
        Self {
            data: Some(data),
            ..self
        }
    }

    /// Stale data and error stay visible while loading.
    pub(crate) fn loading(&self, params: P) -> Self {
        Self {
            phase: Phase::Loading,
            data: self.data.clone(),
            error: self.error.clone(),
            params: Some(params),
        }
    }

    pub(crate) fn succeeded(&self, data: R) -> Self {
        Self {
            phase: Phase::Success,
            data: Some(data),
            error: None,
            params: self.params.clone(),
        }
    }

    /// Data from before the failing run is preserved.
    pub(crate) fn failed(&self, error: RequestError) -> Self {
        Self {
            phase: Phase::Error,
            data: self.data.clone(),
            error: Some(error),
            params: self.params.clone(),
        }
    }
}
