//! Web and command-line front ends for `lca_report`.

pub mod server;
