// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;

use serde::{Deserialize, Serialize};

/// Authentication method negotiated during the session handshake.
///
/// Serialized as the lowercase keywords used by the text endpoint format;
/// common spelling variants are accepted on input.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    #[serde(rename = "none", alias = "None", alias = "NONE")]
    #[default]
    None,
    #[serde(rename = "token", alias = "Token", alias = "TOKEN")]
    Token,
    #[serde(rename = "psk", alias = "Psk", alias = "PSK")]
    Psk,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuthMethod::None => "none",
            AuthMethod::Token => "token",
            AuthMethod::Psk => "psk",
        })
    }
}

impl AuthMethod {
    /// Parses an endpoint-format field. The empty string maps to `token`,
    /// which is what legacy descriptors without the method line mean.
    pub fn parse_field(s: &str) -> Option<Self> {
        match s {
            "" | "token" => Some(AuthMethod::Token),
            "none" => Some(AuthMethod::None),
            "psk" => Some(AuthMethod::Psk),
            _ => None,
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, AuthMethod::None)
    }
}
