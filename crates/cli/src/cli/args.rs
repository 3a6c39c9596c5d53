// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument structs for CLI commands.
//!
//! These structs are used with `#[command(flatten)]` to reduce duplication
//! across commands that take the same options.

use clap::Args;

/// Record fields given as `-f key=value`.
#[derive(Args, Clone, Debug, Default, PartialEq)]
pub struct FieldArgs {
    /// Field to set, as key=value (repeatable; JSON values keep their type)
    #[arg(long = "field", short = 'f', value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

/// Resource of the target record.
#[derive(Args, Clone, Debug, Default, PartialEq)]
pub struct ResourceArgs {
    /// Resource type (default: default_resource from config)
    #[arg(long, short = 'r')]
    pub resource: Option<String>,
}
