//! Request-scoped, immutable key/value context.
//!
//! A [`Context`] is a persistent singly-linked list. Deriving a child with
//! [`Context::with_value`] allocates one node that points at the parent, so
//! every layer of a chain can add bindings without copying or mutating what
//! the layers above it see:
//!
//! ```text
//! background ← ("user", 42) ← ("trace", "abc") ← ("user", 7)
//!     ↑               ↑                                ↑
//!   root       outer middleware                inner middleware
//! ```
//!
//! Lookups walk from the newest node to the root, so a later binding shadows
//! an earlier one with the same key. Cloning is a single `Arc` increment.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An immutable snapshot of request-scoped values.
///
/// ```rust
/// use ctxchain::Context;
///
/// let root = Context::background();
/// let ctx = root.with_value("user", 42_u32);
///
/// assert_eq!(ctx.value::<u32>("user"), Some(&42));
/// assert!(root.value::<u32>("user").is_none());
/// ```
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

struct Node {
    key: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

impl Context {
    /// The empty root context every top-level request starts from.
    pub fn background() -> Self {
        Self { head: None }
    }

    /// Derives a child context binding `key` to `value`.
    ///
    /// `self` is left untouched. An existing binding for `key` is shadowed in
    /// the child, not replaced.
    pub fn with_value<T>(&self, key: &'static str, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let node = Node {
            key,
            value: Arc::new(value),
            parent: self.head.clone(),
        };
        Self { head: Some(Arc::new(node)) }
    }

    /// Returns the newest value bound to `key`, if it has type `T`.
    ///
    /// A binding of another type yields `None`; older bindings of the same
    /// key are not consulted once a newer one is found.
    pub fn value<T: 'static>(&self, key: &str) -> Option<&T> {
        self.nodes()
            .find(|node| node.key == key)
            .and_then(|node| node.value.downcast_ref::<T>())
    }

    /// Whether any binding for `key` is visible.
    pub fn contains(&self, key: &str) -> bool {
        self.nodes().any(|node| node.key == key)
    }

    /// Number of bindings, shadowed ones included.
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        let mut cursor = self.head.as_deref();
        std::iter::from_fn(move || {
            let node = cursor?;
            cursor = node.parent.as_deref();
            Some(node)
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut seen: Vec<&str> = Vec::new();
        for node in self.nodes() {
            if !seen.contains(&node.key) {
                seen.push(node.key);
            }
        }
        f.debug_struct("Context").field("keys", &seen).finish()
    }
}
