//! npm-style version requirements
//!
//! Supports the range syntax found in `engines.node`:
//! - `18.2.3`, `v18.2.3`, `=18.2.3` - exact match
//! - `18`, `18.2`, `18.x`, `18.2.x`, `*` - partial versions and wildcards
//! - `^18.2.3` - compatible with version (>=18.2.3 <19.0.0)
//! - `~18.2.3` - approximately equivalent (>=18.2.3 <18.3.0)
//! - `>=18`, `>18`, `<=18`, `<18` - comparison operators
//! - `16 - 18` - hyphen range
//! - `>=18.0.0 <20.0.0` - space-separated, all must satisfy
//! - `^18 || ^20` - any must satisfy
//!
//! Every range is desugared into plain comparators, the way npm does it, so a
//! partial upper bound such as `<=18` becomes `<19.0.0-0`.

use std::fmt;
use std::str::FromStr;

use semver::{Prerelease, Version};

use crate::runtime::error::RequirementError;

/// A parsed version requirement such as `>=18.0.0 <20.0.0` or `^18 || ^20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    raw: String,
    sets: Vec<ComparatorSet>,
}

impl VersionRequirement {
    pub fn parse(requirement: &str) -> Result<Self, RequirementError> {
        let sets = requirement
            .split("||")
            .map(ComparatorSet::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| RequirementError::Invalid {
                requirement: requirement.to_string(),
                reason,
            })?;

        Ok(Self {
            raw: requirement.trim().to_string(),
            sets,
        })
    }

    /// Returns the requirement as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Check if a version satisfies any of the alternatives
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }
}

impl FromStr for VersionRequirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            f.write_str("*")
        } else {
            f.write_str(&self.raw)
        }
    }
}

/// AND of comparators. An empty set matches every release version.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComparatorSet(Vec<Comparator>);

impl ComparatorSet {
    fn parse(range: &str) -> Result<Self, String> {
        let words: Vec<&str> = range.split_whitespace().collect();
        let mut comparators = Vec::new();
        let mut i = 0;

        while i < words.len() {
            // Hyphen range: "16 - 18"
            if words.get(i + 1) == Some(&"-") {
                let to = words
                    .get(i + 2)
                    .ok_or_else(|| format!("hyphen range '{} -' has no upper bound", words[i]))?;
                comparators.extend(hyphen(Partial::parse(words[i])?, Partial::parse(to)?)?);
                i += 3;
                continue;
            }

            // Operators may be separated from their version: ">= 18"
            let token = if is_operator(words[i]) {
                let version = words
                    .get(i + 1)
                    .ok_or_else(|| format!("operator '{}' has no version", words[i]))?;
                i += 2;
                format!("{}{}", words[i - 2], version)
            } else {
                i += 1;
                words[i - 1].to_string()
            };

            comparators.extend(parse_comparator(&token)?);
        }

        Ok(Self(comparators))
    }

    fn matches(&self, version: &Version) -> bool {
        if !self.0.iter().all(|c| c.matches(version)) {
            return false;
        }

        if version.pre.is_empty() {
            return true;
        }

        // A prerelease only matches when the set names a prerelease of the same release
        self.0.iter().any(|c| {
            let bound = c.version();
            !bound.pre.is_empty()
                && bound.major == version.major
                && bound.minor == version.minor
                && bound.patch == version.patch
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    Eq(Version),
    Gt(Version),
    Gte(Version),
    Lt(Version),
    Lte(Version),
}

impl Comparator {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Eq(v) => version == v,
            Comparator::Gt(v) => version > v,
            Comparator::Gte(v) => version >= v,
            Comparator::Lt(v) => version < v,
            Comparator::Lte(v) => version <= v,
        }
    }

    fn version(&self) -> &Version {
        match self {
            Comparator::Eq(v)
            | Comparator::Gt(v)
            | Comparator::Gte(v)
            | Comparator::Lt(v)
            | Comparator::Lte(v) => v,
        }
    }
}

/// A version as written in a range; missing or wildcard parts are `None`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        // Build metadata never affects matching
        let trimmed = trimmed.split('+').next().unwrap_or(trimmed);

        let (core, pre) = match trimmed.split_once('-') {
            Some((core, pre)) => (core, pre),
            None => (trimmed, ""),
        };

        if core.is_empty() {
            return Err(format!("invalid version '{}'", input));
        }

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > 3 {
            return Err(format!("invalid version '{}'", input));
        }

        let mut numbers = [None; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if matches!(*part, "x" | "X" | "*") {
                break;
            }
            let number = part
                .parse::<u64>()
                .map_err(|_| format!("invalid version '{}'", input))?;
            *slot = Some(number);
        }

        let pre = Prerelease::new(pre).map_err(|e| format!("invalid prerelease in '{}': {}", input, e))?;
        let [major, minor, patch] = numbers;

        if !pre.is_empty() && patch.is_none() {
            return Err(format!("prerelease needs a full version in '{}'", input));
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// Lowest version described, with missing parts set to zero
    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
            build: Default::default(),
        }
    }

    /// Exclusive upper bound of the wildcard parts, `None` for a full version or `*`
    fn ceiling(&self) -> Result<Option<Version>, String> {
        Ok(match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Some(exclusive(bump(major)?, 0, 0)),
            (Some(major), Some(minor), None) => Some(exclusive(major, bump(minor)?, 0)),
            _ => None,
        })
    }

    fn is_any(&self) -> bool {
        self.major.is_none()
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }
}

/// `major.minor.patch-0`, the lowest version of that release including prereleases
fn exclusive(major: u64, minor: u64, patch: u64) -> Version {
    Version {
        major,
        minor,
        patch,
        pre: Prerelease::new("0").expect("'0' is a valid prerelease"),
        build: Default::default(),
    }
}

fn is_operator(word: &str) -> bool {
    matches!(word, ">=" | "<=" | ">" | "<" | "=" | "^" | "~" | "~>")
}

fn parse_comparator(token: &str) -> Result<Vec<Comparator>, String> {
    if token == "*" || token.eq_ignore_ascii_case("x") {
        return Ok(Vec::new());
    }

    if let Some(rest) = token.strip_prefix(">=") {
        let p = Partial::parse(rest)?;
        Ok(if p.is_any() { Vec::new() } else { vec![Comparator::Gte(p.floor())] })
    } else if let Some(rest) = token.strip_prefix("<=") {
        let p = Partial::parse(rest)?;
        Ok(match p.ceiling()? {
            _ if p.is_any() => Vec::new(),
            Some(ceiling) => vec![Comparator::Lt(ceiling)],
            None => vec![Comparator::Lte(p.floor())],
        })
    } else if let Some(rest) = token.strip_prefix("~>") {
        tilde(Partial::parse(rest)?)
    } else if let Some(rest) = token.strip_prefix('>') {
        let p = Partial::parse(rest)?;
        Ok(match (p.major, p.minor, p.patch) {
            (None, _, _) => vec![Comparator::Lt(exclusive(0, 0, 0))],
            (Some(major), None, _) => vec![Comparator::Gte(Version::new(bump(major)?, 0, 0))],
            (Some(major), Some(minor), None) => {
                vec![Comparator::Gte(Version::new(major, bump(minor)?, 0))]
            }
            _ => vec![Comparator::Gt(p.floor())],
        })
    } else if let Some(rest) = token.strip_prefix('<') {
        let p = Partial::parse(rest)?;
        Ok(match p.major {
            None => vec![Comparator::Lt(exclusive(0, 0, 0))],
            Some(_) if p.is_full() => vec![Comparator::Lt(p.floor())],
            Some(_) => {
                let floor = p.floor();
                vec![Comparator::Lt(exclusive(floor.major, floor.minor, floor.patch))]
            }
        })
    } else if let Some(rest) = token.strip_prefix('=') {
        x_range(Partial::parse(rest)?)
    } else if let Some(rest) = token.strip_prefix('^') {
        caret(Partial::parse(rest)?)
    } else if let Some(rest) = token.strip_prefix('~') {
        tilde(Partial::parse(rest)?)
    } else {
        x_range(Partial::parse(token)?)
    }
}

fn x_range(p: Partial) -> Result<Vec<Comparator>, String> {
    if p.is_any() {
        return Ok(Vec::new());
    }
    Ok(match p.ceiling()? {
        Some(ceiling) => vec![Comparator::Gte(p.floor()), Comparator::Lt(ceiling)],
        None => vec![Comparator::Eq(p.floor())],
    })
}

fn caret(p: Partial) -> Result<Vec<Comparator>, String> {
    let Some(major) = p.major else {
        return Ok(Vec::new());
    };

    // ^1.2.3 -> <2.0.0, ^0.2.3 -> <0.3.0, ^0.0.3 -> <0.0.4
    let upper = match (major, p.minor, p.patch) {
        (0, Some(0), Some(patch)) => exclusive(0, 0, bump(patch)?),
        (0, Some(minor), _) => exclusive(0, bump(minor)?, 0),
        _ => exclusive(bump(major)?, 0, 0),
    };

    Ok(vec![Comparator::Gte(p.floor()), Comparator::Lt(upper)])
}

fn tilde(p: Partial) -> Result<Vec<Comparator>, String> {
    let Some(major) = p.major else {
        return Ok(Vec::new());
    };

    // ~1 -> <2.0.0, ~1.2 and ~1.2.3 -> <1.3.0
    let upper = match p.minor {
        Some(minor) => exclusive(major, bump(minor)?, 0),
        None => exclusive(bump(major)?, 0, 0),
    };

    Ok(vec![Comparator::Gte(p.floor()), Comparator::Lt(upper)])
}

fn hyphen(from: Partial, to: Partial) -> Result<Vec<Comparator>, String> {
    let mut comparators = Vec::new();

    if !from.is_any() {
        comparators.push(Comparator::Gte(from.floor()));
    }

    if !to.is_any() {
        comparators.push(match to.ceiling()? {
            Some(ceiling) => Comparator::Lt(ceiling),
            None => Comparator::Lte(to.floor()),
        });
    }

    Ok(comparators)
}

/// Next value of a version component for an exclusive upper bound
fn bump(component: u64) -> Result<u64, String> {
    component
        .checked_add(1)
        .ok_or_else(|| "version component too large".to_string())
}
