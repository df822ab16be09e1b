// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./meetlr.toml` > `~/.config/meetlr/meetlr.toml` > `/etc/meetlr/meetlr.toml`,
//! with `MEETLR_` environment variables applied last.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MeetlrConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/meetlr/meetlr.toml";
pub(crate) const LOCAL_CONFIG: &str = "meetlr.toml";

/// Sections that environment variables may address. A variable like
/// `MEETLR_POLLER_LEASE_TTL_SECS` maps to `poller.lease_ttl_secs`.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "storage",
    "poller",
    "tasks",
    "booking",
    "credits",
    "providers",
    "prometheus",
];

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("meetlr/meetlr.toml"))
        .unwrap_or_default()
}

/// Build the full layered Figment without extracting it.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MeetlrConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<MeetlrConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over compiled defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<MeetlrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MeetlrConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MeetlrConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MeetlrConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Map `MEETLR_<SECTION>_<KEY>` onto `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys themselves
/// contain underscores (`lease_ttl_secs`).
fn env_provider() -> Env {
    Env::prefixed("MEETLR_").map(|key| {
        let key_str = key.as_str().to_ascii_lowercase();
        for section in ENV_SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.into()
    })
}
