// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod config;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod highlight;
pub mod params;
pub mod prefs;
pub mod request;
pub mod response;
pub mod run;
pub mod session;
pub mod variables;

#[cfg(test)]
pub mod test_support;
