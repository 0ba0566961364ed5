//! Path namespacing
//!
//! A client may be configured with a namespace: a root under which every path
//! it touches lives. Callers use paths relative to that root and the client
//! prefixes them on the way out ("fix") and strips the prefix from paths it
//! reports back ("unfix"). The namespace root is created on first use.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;
use turbokeeper_session::{Acl, CreateMode, KeeperError, KeeperResult, ResultCode, SessionClient};

/// Path separator
pub const PATH_SEPARATOR: &str = "/";

/// Join a parent and a child path with exactly one separator between them.
///
/// The result always starts with `/`, never ends with `/` unless it is the
/// root itself, and never contains `//` at the join point.
///
/// ```
/// use turbokeeper::namespace::make_path;
///
/// assert_eq!(make_path("app", "/locks"), "/app/locks");
/// assert_eq!(make_path("/app/", "locks/"), "/app/locks");
/// assert_eq!(make_path("/", ""), "/");
/// ```
#[must_use]
pub fn make_path(parent: &str, child: &str) -> String {
    let mut path = String::with_capacity(parent.len() + child.len() + 2);

    if !parent.starts_with(PATH_SEPARATOR) {
        path.push_str(PATH_SEPARATOR);
    }
    path.push_str(parent.trim_end_matches('/'));

    let child = child.trim_start_matches('/').trim_end_matches('/');
    if !child.is_empty() {
        path.push_str(PATH_SEPARATOR);
        path.push_str(child);
    }

    if path.is_empty() {
        path.push_str(PATH_SEPARATOR);
    }
    path
}

/// Prefix `path` with `namespace`; identity when there is no namespace.
#[must_use]
pub fn fix_for_namespace(namespace: Option<&str>, path: &str) -> String {
    match namespace {
        Some(namespace) => make_path(namespace, path),
        None => path.to_string(),
    }
}

/// Idempotently creates every node along a path.
///
/// The first successful [`EnsurePath::ensure`] latches; later calls return
/// immediately without touching the session.
pub struct EnsurePath {
    path: String,
    ensured: AtomicBool,
    lock: Mutex<()>,
}

impl fmt::Debug for EnsurePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnsurePath")
            .field("path", &self.path)
            .field("ensured", &self.ensured.load(Ordering::Acquire))
            .finish()
    }
}

impl EnsurePath {
    /// Create a helper for `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ensured: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    /// The absolute path this helper creates
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the path has already been ensured
    pub fn is_ensured(&self) -> bool {
        self.ensured.load(Ordering::Acquire)
    }

    /// Create any missing node along the path, retrying per the session's policy.
    pub fn ensure(&self, session: &dyn SessionClient) -> KeeperResult<()> {
        if self.is_ensured() {
            return Ok(());
        }

        let _guard = self.lock.lock();
        if self.is_ensured() {
            return Ok(());
        }

        session
            .new_retry_loop()
            .call(|| make_dirs(session, &self.path))?;
        self.ensured.store(true, Ordering::Release);
        debug!("Ensured path {}", self.path);
        Ok(())
    }
}

fn make_dirs(session: &dyn SessionClient, path: &str) -> KeeperResult<()> {
    let mut current = String::with_capacity(path.len());
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);

        if session.exists(&current, false)?.is_some() {
            continue;
        }
        match session.create(&current, &[], &Acl::open_unsafe(), CreateMode::Persistent) {
            Ok(_) => {}
            Err(e) if e.code() == Some(ResultCode::NodeExists) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// A validated namespace and the lazily created root node behind it.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    name: Option<Arc<str>>,
    ensure: Option<Arc<EnsurePath>>,
}

impl Namespace {
    /// Validate `name`.
    ///
    /// Leading and trailing separators are ignored and an empty name means no
    /// namespace. Interior empty segments are rejected.
    pub fn new(name: Option<&str>) -> KeeperResult<Self> {
        let Some(trimmed) = name.map(|n| n.trim_matches('/')).filter(|n| !n.is_empty()) else {
            return Ok(Self::none());
        };

        if trimmed.split('/').any(str::is_empty) {
            return Err(KeeperError::configuration(format!(
                "invalid namespace {trimmed:?}: empty path segment"
            )));
        }

        Ok(Self {
            name: Some(Arc::from(trimmed)),
            ensure: Some(Arc::new(EnsurePath::new(make_path(PATH_SEPARATOR, trimmed)))),
        })
    }

    /// No namespace: fix and unfix are identities
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The namespace, without leading or trailing separators
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The helper that creates the namespace root
    pub fn ensure_path(&self) -> Option<&Arc<EnsurePath>> {
        self.ensure.as_ref()
    }

    /// Prefix `path` with the namespace.
    pub fn fix(&self, path: &str) -> String {
        fix_for_namespace(self.name(), path)
    }

    /// Strip the namespace prefix from `path`.
    ///
    /// Only a strict `/<namespace>/` prefix is stripped (or the namespace root
    /// itself, which becomes `/`). Any other path is returned unchanged.
    pub fn unfix(&self, path: &str) -> String {
        let Some(root) = self.ensure.as_ref().map(|e| e.path()) else {
            return path.to_string();
        };

        if path == root {
            return PATH_SEPARATOR.to_string();
        }
        match path.strip_prefix(root) {
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path.to_string(),
        }
    }
}
