use std::ops::{Deref, DerefMut};

use crate::middleware::MiddlewareSpec;

use super::RouteTable;

/// Prefix and middlewares applied to every route registered while a group is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupContext {
    /// Raw concatenation of every open group's prefix, outermost first
    pub prefix: String,
    /// Middlewares of every open group, outermost first
    pub middlewares: Vec<MiddlewareSpec>,
}

impl GroupContext {
    /// Context for a group nested inside `self`.
    #[must_use]
    pub fn nested(&self, prefix: &str, middlewares: &[MiddlewareSpec]) -> Self {
        let mut nested = self.clone();
        nested.prefix.push_str(prefix);
        nested.middlewares.extend_from_slice(middlewares);
        nested
    }
}

/// An open group.
///
/// Derefs to the route table so the group body registers through the usual API.
/// Dropping the scope restores the context that was active when it opened, also when
/// the body returns early with an error or unwinds.
pub struct GroupScope<'a> {
    table: &'a mut RouteTable,
    saved: Option<GroupContext>,
}

impl<'a> GroupScope<'a> {
    pub(crate) fn enter(
        table: &'a mut RouteTable,
        prefix: &str,
        middlewares: &[MiddlewareSpec],
    ) -> Self {
        let nested = table.context().nested(prefix, middlewares);
        let saved = table.replace_context(nested);
        Self {
            table,
            saved: Some(saved),
        }
    }
}

impl Deref for GroupScope<'_> {
    type Target = RouteTable;

    fn deref(&self) -> &RouteTable {
        self.table
    }
}

impl DerefMut for GroupScope<'_> {
    fn deref_mut(&mut self) -> &mut RouteTable {
        self.table
    }
}

impl Drop for GroupScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.table.replace_context(saved);
        }
    }
}
