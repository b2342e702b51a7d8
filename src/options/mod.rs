// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

pub mod parse;

/// Typed payload of a UCI option declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    Check {
        default: bool,
        value: bool,
    },
    Spin {
        default: i64,
        value: i64,
        min: i64,
        max: i64,
    },
    Combo {
        default: String,
        value: String,
        /// Allowed values in declaration order, original case preserved.
        choices: Vec<String>,
    },
    /// Valueless action trigger.
    Button,
    String {
        default: String,
        value: String,
    },
}

/// Result of assigning a textual value to an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The value changed.
    Updated,
    /// The assigned value equals the current one; nothing was touched.
    Unchanged,
    /// The value was invalid for this option; nothing was touched.
    Rejected,
}

/// One engine option: case-preserving name, typed default/current value, and
/// a `modified` flag tracking divergence from the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UciOption {
    name: String,
    pub kind: OptionKind,
    visible: bool,
    modified: bool,
}

impl UciOption {
    pub fn new(name: impl Into<String>, kind: OptionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visible: true,
            modified: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the host exposes this option in its editor UI.
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// True once the current value diverged from the default.
    pub fn modified(&self) -> bool {
        self.modified
    }

    /// Assigns a value from its text form, enforcing the per-variant rules:
    /// out-of-range spins and unknown combo choices are rejected without
    /// mutation, and assigning the current value is a no-op.
    pub fn set_from_string(&mut self, raw: &str) -> SetOutcome {
        let outcome = match &mut self.kind {
            OptionKind::Check { value, .. } => match raw.to_ascii_lowercase().as_str() {
                "true" => assign(value, true),
                "false" => assign(value, false),
                _ => SetOutcome::Rejected,
            },
            OptionKind::Spin {
                value, min, max, ..
            } => match raw.trim().parse::<i64>() {
                Ok(v) if v >= *min && v <= *max => assign(value, v),
                _ => SetOutcome::Rejected,
            },
            OptionKind::Combo { value, choices, .. } => {
                match choices.iter().find(|c| c.eq_ignore_ascii_case(raw)) {
                    Some(canonical) if canonical == value => SetOutcome::Unchanged,
                    Some(canonical) => {
                        *value = canonical.clone();
                        SetOutcome::Updated
                    },
                    None => SetOutcome::Rejected,
                }
            },
            OptionKind::Button => SetOutcome::Unchanged,
            OptionKind::String { value, .. } => {
                if value == raw {
                    SetOutcome::Unchanged
                } else {
                    raw.clone_into(value);
                    SetOutcome::Updated
                }
            },
        };
        if outcome == SetOutcome::Updated {
            self.modified = self.diverged();
        }
        outcome
    }

    fn diverged(&self) -> bool {
        match &self.kind {
            OptionKind::Check { default, value } => default != value,
            OptionKind::Spin { default, value, .. } => default != value,
            OptionKind::Combo { default, value, .. } => default != value,
            OptionKind::Button => false,
            OptionKind::String { default, value } => default != value,
        }
    }

    /// Current value in its text form (`""` for buttons).
    pub fn string_value(&self) -> String {
        match &self.kind {
            OptionKind::Check { value, .. } => value.to_string(),
            OptionKind::Spin { value, .. } => value.to_string(),
            OptionKind::Combo { value, .. } => value.clone(),
            OptionKind::Button => String::new(),
            OptionKind::String { value, .. } => value.clone(),
        }
    }
}

fn assign<T: PartialEq>(slot: &mut T, v: T) -> SetOutcome {
    if *slot == v {
        SetOutcome::Unchanged
    } else {
        *slot = v;
        SetOutcome::Updated
    }
}

/// Insertion-ordered, case-insensitive registry of engine options.
#[derive(Debug, Clone, Default)]
pub struct OptionsRegistry {
    /// Lowercased names in insertion order.
    order: Vec<String>,
    by_name: HashMap<String, UciOption>,
}

impl OptionsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an option. Re-registering an existing name replaces the
    /// option but keeps its original position.
    pub fn register(&mut self, option: UciOption) {
        let key = option.name().to_lowercase();
        if self.by_name.insert(key.clone(), option).is_none() {
            self.order.push(key);
        }
    }

    pub fn get(&self, name: &str) -> Option<&UciOption> {
        self.by_name.get(&name.to_lowercase())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut UciOption> {
        self.by_name.get_mut(&name.to_lowercase())
    }

    /// Lowercased names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &UciOption> {
        self.order.iter().filter_map(|k| self.by_name.get(k))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.by_name.clear();
    }
}
