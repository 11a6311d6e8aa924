use std::fmt;

use serde::Serialize;

/// A single class of inline transformation.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionKind {
    InlinePassthrough,
    SpecialCharacters,
    Attributes,
    Quotes,
    Replacements,
    Macros,
    PostReplacements,
    Callouts,
}

impl SubstitutionKind {
    pub const ALL: [SubstitutionKind; 8] = [
        Self::InlinePassthrough,
        Self::SpecialCharacters,
        Self::Attributes,
        Self::Quotes,
        Self::Replacements,
        Self::Macros,
        Self::PostReplacements,
        Self::Callouts,
    ];

    fn bit(self) -> u16 {
        match self {
            Self::InlinePassthrough => 1,
            Self::SpecialCharacters => 1 << 1,
            Self::Attributes => 1 << 2,
            Self::Quotes => 1 << 3,
            Self::Replacements => 1 << 4,
            Self::Macros => 1 << 5,
            Self::PostReplacements => 1 << 6,
            Self::Callouts => 1 << 7,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::InlinePassthrough => "inline_passthrough",
            Self::SpecialCharacters => "specialchars",
            Self::Attributes => "attributes",
            Self::Quotes => "quotes",
            Self::Replacements => "replacements",
            Self::Macros => "macros",
            Self::PostReplacements => "post_replacements",
            Self::Callouts => "callouts",
        }
    }
}

/// A set of enabled [`SubstitutionKind`]s.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct SubstitutionKinds(u16);

impl SubstitutionKinds {
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn of(kinds: &[SubstitutionKind]) -> Self {
        Self(kinds.iter().fold(0, |bits, kind| bits | kind.bit()))
    }

    #[must_use]
    pub fn contains(self, kind: SubstitutionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[must_use]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = SubstitutionKind> {
        SubstitutionKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl fmt::Debug for SubstitutionKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(SubstitutionKind::name)).finish()
    }
}

/// A named aggregate of substitution kinds, as written in a `subs` attribute.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionGroup {
    Normal,
    Verbatim,
    Header,
    Attributes,
    ElementAttributes,
    Macros,
    Quotes,
    Replacements,
    PostReplacements,
    SpecialCharacters,
    Callouts,
    InlinePassthrough,
    None,
}

/// Substitution groups keyed by the name authors use, with the kinds each
/// enables. The order inside a group is the order the kinds apply in.
const GROUPS: &[(SubstitutionGroup, &str, &[SubstitutionKind])] = &[
    (
        SubstitutionGroup::Normal,
        "normal",
        &[
            SubstitutionKind::InlinePassthrough,
            SubstitutionKind::SpecialCharacters,
            SubstitutionKind::Attributes,
            SubstitutionKind::Quotes,
            SubstitutionKind::Replacements,
            SubstitutionKind::Macros,
            SubstitutionKind::PostReplacements,
        ],
    ),
    (
        SubstitutionGroup::Verbatim,
        "verbatim",
        &[
            SubstitutionKind::SpecialCharacters,
            SubstitutionKind::Callouts,
        ],
    ),
    (
        SubstitutionGroup::Header,
        "header",
        &[
            SubstitutionKind::InlinePassthrough,
            SubstitutionKind::SpecialCharacters,
            SubstitutionKind::Attributes,
        ],
    ),
    (
        SubstitutionGroup::Attributes,
        "attributes",
        &[
            SubstitutionKind::InlinePassthrough,
            SubstitutionKind::Attributes,
        ],
    ),
    (
        SubstitutionGroup::ElementAttributes,
        "element_attributes",
        &[
            SubstitutionKind::InlinePassthrough,
            SubstitutionKind::Attributes,
            SubstitutionKind::Quotes,
            SubstitutionKind::SpecialCharacters,
        ],
    ),
    (
        SubstitutionGroup::Macros,
        "macros",
        &[SubstitutionKind::Macros],
    ),
    (
        SubstitutionGroup::Quotes,
        "quotes",
        &[SubstitutionKind::Quotes],
    ),
    (
        SubstitutionGroup::Replacements,
        "replacements",
        &[SubstitutionKind::Replacements],
    ),
    (
        SubstitutionGroup::PostReplacements,
        "post_replacements",
        &[SubstitutionKind::PostReplacements],
    ),
    (
        SubstitutionGroup::SpecialCharacters,
        "specialchars",
        &[SubstitutionKind::SpecialCharacters],
    ),
    (
        SubstitutionGroup::Callouts,
        "callouts",
        &[SubstitutionKind::Callouts],
    ),
    (
        SubstitutionGroup::InlinePassthrough,
        "inline_passthrough",
        &[SubstitutionKind::InlinePassthrough],
    ),
    (SubstitutionGroup::None, "none", &[]),
];

impl SubstitutionGroup {
    /// Looks a group up by name. Single-letter forms are the ones accepted by
    /// the `pass:` macro.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = match name {
            "n" => "normal",
            "v" => "verbatim",
            "a" => "attributes",
            "m" => "macros",
            "q" => "quotes",
            "r" => "replacements",
            "p" => "post_replacements",
            "c" | "specialcharacters" => "specialchars",
            other => other,
        };
        GROUPS
            .iter()
            .find_map(|(group, group_name, _)| (*group_name == name).then_some(*group))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        GROUPS
            .iter()
            .find_map(|(group, name, _)| (*group == self).then_some(*name))
            .unwrap_or("none")
    }

    #[must_use]
    pub fn kinds(self) -> SubstitutionKinds {
        GROUPS
            .iter()
            .find_map(|(group, _, kinds)| (*group == self).then(|| SubstitutionKinds::of(kinds)))
            .unwrap_or_default()
    }
}

/// One step of a [`SubstitutionPlan`]: a group and the kinds still enabled
/// for it once `-x` removals are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubstitutionStep {
    pub group: SubstitutionGroup,
    pub kinds: SubstitutionKinds,
}

impl From<SubstitutionGroup> for SubstitutionStep {
    fn from(group: SubstitutionGroup) -> Self {
        Self {
            group,
            kinds: group.kinds(),
        }
    }
}

/// Why a `subs` value could not be turned into a plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanError {
    Unsupported(String),
    Mixed(String),
}

/// The ordered substitution steps applied to one block's inline content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubstitutionPlan {
    pub steps: Vec<SubstitutionStep>,
}

impl SubstitutionPlan {
    #[must_use]
    pub fn from_group(group: SubstitutionGroup) -> Self {
        let steps = if group == SubstitutionGroup::None {
            Vec::new()
        } else {
            vec![SubstitutionStep::from(group)]
        };
        Self { steps }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolves the plan for a block from its default group and an optional
    /// author-supplied `subs` value.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Unsupported`] for an unknown name and
    /// [`PlanError::Mixed`] when absolute and incremental entries are combined.
    pub fn resolve(default: SubstitutionGroup, subs: Option<&str>) -> Result<Self, PlanError> {
        let Some(subs) = subs else {
            return Ok(Self::from_group(default));
        };
        let entries = subs
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                if let Some(name) = entry.strip_prefix('+') {
                    (Modifier::Prepend, name)
                } else if let Some(name) = entry.strip_suffix('+') {
                    (Modifier::Append, name)
                } else if let Some(name) = entry.strip_prefix('-') {
                    (Modifier::Remove, name)
                } else {
                    (Modifier::Absolute, entry)
                }
            })
            .collect::<Vec<_>>();

        let absolute = entries
            .iter()
            .filter(|(modifier, _)| *modifier == Modifier::Absolute)
            .count();
        if absolute > 0 && absolute < entries.len() {
            return Err(PlanError::Mixed(subs.to_string()));
        }

        let mut plan = if absolute > 0 {
            Self::default()
        } else {
            Self::from_group(default)
        };
        for (modifier, name) in entries {
            let group = SubstitutionGroup::from_name(name)
                .ok_or_else(|| PlanError::Unsupported(name.to_string()))?;
            match modifier {
                Modifier::Absolute | Modifier::Append => {
                    if group != SubstitutionGroup::None {
                        plan.steps.push(group.into());
                    }
                }
                Modifier::Prepend => {
                    if group != SubstitutionGroup::None {
                        plan.steps.insert(0, group.into());
                    }
                }
                Modifier::Remove => {
                    let removed = group.kinds();
                    for step in &mut plan.steps {
                        step.kinds = step.kinds.difference(removed);
                    }
                    plan.steps.retain(|step| !step.kinds.is_empty());
                }
            }
        }
        tracing::trace!(?plan, %subs, "resolved custom substitutions");
        Ok(plan)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Modifier {
    Absolute,
    Prepend,
    Append,
    Remove,
}
