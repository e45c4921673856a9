//! Capability implementations

pub(crate) mod container;
pub(crate) mod files;
pub(crate) mod http;
pub(crate) mod process;
pub(crate) mod remote;
pub(crate) mod schedule;
pub(crate) mod scrape;
pub(crate) mod sql;
pub(crate) mod vcs;
