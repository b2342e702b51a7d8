// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::options::{OptionKind, UciOption};

const TYPES: [&str; 5] = ["check", "spin", "combo", "button", "string"];
const ATTRS: [&str; 4] = ["default", "min", "max", "var"];

/// Parses a single `option name <Name> type <kind> …` declaration line.
///
/// The name consumes the longest run of tokens before the `type` keyword;
/// `default` and `var` values may themselves span several tokens, up to the
/// next recognized keyword or the end of the line. Malformed input yields
/// `None`, never a partially built option.
pub fn parse_option_line(line: &str) -> Option<UciOption> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut it = tokens.iter().copied().peekable();
    if it.next()? != "option" || it.next()? != "name" {
        return None;
    }

    let mut name_tokens: Vec<&str> = Vec::new();
    let mut kind_word: Option<&str> = None;
    while let Some(tok) = it.next() {
        if tok == "type"
            && let Some(next) = it.peek()
            && TYPES.contains(next)
        {
            kind_word = it.next();
            break;
        }
        name_tokens.push(tok);
    }
    let kind_word = kind_word?;
    if name_tokens.is_empty() {
        return None;
    }
    let name = name_tokens.join(" ");

    let mut default_value: Option<String> = None;
    let mut min: Option<i64> = None;
    let mut max: Option<i64> = None;
    let mut vars: Vec<String> = Vec::new();

    while let Some(attr) = it.next() {
        match attr {
            "default" => default_value = Some(take_value(&mut it)),
            "min" => min = Some(it.next()?.parse().ok()?),
            "max" => max = Some(it.next()?.parse().ok()?),
            "var" => vars.push(take_value(&mut it)),
            _ => return None,
        }
    }

    let kind = match kind_word {
        "check" => {
            let default = match default_value?.as_str() {
                "true" => true,
                "false" => false,
                _ => return None,
            };
            OptionKind::Check {
                default,
                value: default,
            }
        },
        "spin" => {
            let default: i64 = default_value?.parse().ok()?;
            let min = min.unwrap_or(i64::MIN);
            let max = max.unwrap_or(i64::MAX);
            if min > max || default < min || default > max {
                return None;
            }
            OptionKind::Spin {
                default,
                value: default,
                min,
                max,
            }
        },
        "combo" => {
            if vars.is_empty() {
                return None;
            }
            let wanted = default_value?;
            // Canonical case comes from the declared choice set.
            let default = vars
                .iter()
                .find(|v| v.eq_ignore_ascii_case(&wanted))?
                .clone();
            OptionKind::Combo {
                value: default.clone(),
                default,
                choices: vars,
            }
        },
        "button" => OptionKind::Button,
        "string" => {
            let mut default = default_value.unwrap_or_default();
            if default == "<empty>" {
                default.clear();
            }
            OptionKind::String {
                value: default.clone(),
                default,
            }
        },
        _ => return None,
    };

    Some(UciOption::new(name, kind))
}

/// Collects tokens until the next recognized attribute keyword, joining them
/// with single spaces. May legitimately be empty.
fn take_value<'a, I>(it: &mut std::iter::Peekable<I>) -> String
where
    I: Iterator<Item = &'a str>,
{
    let mut parts: Vec<&str> = Vec::new();
    while let Some(tok) = it.peek() {
        if ATTRS.contains(tok) {
            break;
        }
        parts.push(tok);
        let _ = it.next();
    }
    parts.join(" ")
}
