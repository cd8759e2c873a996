// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque method-invocation context handed in by the binding layer.
//!
//! Carries the authenticated unix username and the `a{sv}` options bag.
//! Authorization is delegated to an [`AuthorizationChecker`] the daemon
//! installs; the engine only names the actions it requires.

use crate::attrs::{AttrValue, Attributes};

/// Polkit-style action ids consulted before engine mutations.
pub mod actions {
    pub const JOB_ADD: &str = "org.freedesktop.printerd.job-add";
    pub const JOB_CANCEL: &str = "org.freedesktop.printerd.job-cancel";
    pub const ALL_EDIT: &str = "org.freedesktop.printerd.all-edit";
    pub const PRINTER_MODIFY: &str = "org.freedesktop.printerd.printer-modify";
}

/// An authenticated method invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    username: String,
    options: Attributes,
}

impl Invocation {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            options: Attributes::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Authenticated unix username of the caller.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn options(&self) -> &Attributes {
        &self.options
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(AttrValue::as_str)
    }
}

/// Authorization hook. The caller is allowed when any of the listed
/// actions is granted.
pub trait AuthorizationChecker: Send + Sync {
    fn check(&self, invocation: &Invocation, action_ids: &[&str]) -> bool;
}

/// Grants everything. The daemon substitutes the real policy checker.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AuthorizationChecker for AllowAll {
    fn check(&self, _invocation: &Invocation, _action_ids: &[&str]) -> bool {
        true
    }
}
