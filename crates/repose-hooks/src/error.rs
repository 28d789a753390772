use std::fmt;
use std::rc::Rc;

/// Misconfiguration detected at a hook call site. These are programming
/// mistakes in how hooks are wired together, reported instead of silently
/// doing nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("no store provider in scope; wrap the content in `redux_provider`")]
    MissingProvider,

    #[error("state type `{0}` is not registered in the store")]
    UnregisteredState(&'static str),

    #[error("action type `{0}` is not registered in the store")]
    UnregisteredAction(&'static str),

    #[error("alias `{0}` is not registered in the store")]
    UnknownAlias(String),

    #[error("alias `{alias}` holds `{actual}`, not `{requested}`")]
    AliasTypeMismatch {
        alias: String,
        requested: &'static str,
        actual: &'static str,
    },

    #[error("task could not be spawned: {0}")]
    Spawn(String),
}

impl From<repose_runtime::RuntimeError> for HookError {
    fn from(e: repose_runtime::RuntimeError) -> Self {
        HookError::Spawn(e.to_string())
    }
}

/// Failure of a request's work function. Cheap to clone so it can live in
/// `FetchState` and be handed to every plugin.
#[derive(Clone)]
pub struct RequestError(Rc<anyhow::Error>);

impl RequestError {
    pub fn new(e: anyhow::Error) -> Self {
        Self(Rc::new(e))
    }

    pub fn msg(msg: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::new(anyhow::Error::msg(msg))
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }

    pub fn downcast_ref<E: fmt::Display + fmt::Debug + Send + Sync + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl From<anyhow::Error> for RequestError {
    fn from(e: anyhow::Error) -> Self {
        Self::new(e)
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Errors compare equal by identity or by message.
impl PartialEq for RequestError {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.to_string() == other.to_string()
    }
}
