//! Version range parsing and checking.
//!
//! A range is a set of alternatives separated by `||`; each alternative is a
//! list of comparators separated by whitespace or commas, all of which must
//! match:
//!
//! - `>=1.2.0 <2.0.0` and `>=1.2.0, <2.0.0` are equivalent
//! - `1.2.3` and `=1.2.3` / `==1.2.3` mean exactly that version
//! - `!=1.2.3`, `>`, `>=`, `<`, `<=` compare as usual
//! - `~1.2.3` allows patch updates, `^1.2.3` allows non-breaking updates
//! - `1.2.x`, `1.*` and `*` are wildcards
//! - `1.2 - 1.4.5` is an inclusive hyphen range
//!
//! Missing minor/patch components default to zero (`1.2` is `1.2.0`), and a
//! leading `v` is accepted.
//!
//! # Examples
//!
//! ```
//! use ext_catalog::version::VersionRange;
//!
//! let range = VersionRange::parse(">=1.2.0 <2.0.0").unwrap();
//! assert!(range.satisfies("1.5.0"));
//! assert!(!range.satisfies("2.0.0"));
//!
//! let range = VersionRange::parse("~1.2 || ^3.0.0").unwrap();
//! assert!(range.satisfies("1.2.9"));
//! assert!(range.satisfies("3.4.0"));
//! assert!(!range.satisfies("1.3.0"));
//! ```

use semver::Version;

use crate::error::{Error, Result};

/// A single version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    /// `>=`
    Gte,
    /// `>`
    Gt,
    /// `<=`
    Lte,
    /// `<`
    Lt,
    /// `=` / `==` / bare version
    Eq,
    /// `!=`
    Ne,
}

/// A single version specifier: an operator paired with a version.
#[derive(Debug, Clone)]
struct Specifier {
    op: CompareOp,
    version: Version,
}

impl Specifier {
    fn new(op: CompareOp, version: Version) -> Self {
        Self { op, version }
    }

    fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            CompareOp::Gte => candidate >= &self.version,
            CompareOp::Gt => candidate > &self.version,
            CompareOp::Lte => candidate <= &self.version,
            CompareOp::Lt => candidate < &self.version,
            CompareOp::Eq => candidate == &self.version,
            CompareOp::Ne => candidate != &self.version,
        }
    }
}

/// A parsed version range that can be checked against concrete versions.
#[derive(Debug, Clone)]
pub struct VersionRange {
    /// OR-ed alternatives, each an AND-ed list of specifiers.
    alternatives: Vec<Vec<Specifier>>,
    /// The original range string for display.
    raw: String,
}

impl VersionRange {
    /// Parse a range expression. See the module docs for the grammar.
    pub fn parse(range: &str) -> Result<Self> {
        let raw = range.to_string();
        let invalid = |reason: String| Error::InvalidVersionRange {
            range: raw.clone(),
            reason,
        };

        if range.trim().is_empty() {
            return Err(invalid("empty range".to_string()));
        }

        let mut alternatives = Vec::new();
        for alternative in range.split("||") {
            let tokens = tokenize(alternative);
            if tokens.is_empty() {
                return Err(invalid("empty alternative".to_string()));
            }
            alternatives.push(parse_alternative(&tokens).map_err(invalid)?);
        }

        Ok(Self { alternatives, raw })
    }

    /// Check if a version string satisfies this range.
    ///
    /// Returns `false` if the version string cannot be parsed.
    pub fn satisfies(&self, version: &str) -> bool {
        match normalize_version(version) {
            Ok(v) => self.contains(&v),
            Err(_) => false,
        }
    }

    /// Check if a `semver::Version` satisfies this range.
    pub fn contains(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|specs| specs.iter().all(|spec| spec.matches(version)))
    }

    /// Return the original range string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split one alternative into comparator tokens, gluing detached operators
/// (`>= 1.2.0`) onto the version that follows them.
fn tokenize(alternative: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<String> = None;

    for word in alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
    {
        if let Some(op) = pending_op.take() {
            tokens.push(format!("{op}{word}"));
        } else if is_bare_operator(word) {
            pending_op = Some(word.to_string());
        } else {
            tokens.push(word.to_string());
        }
    }
    if let Some(op) = pending_op {
        tokens.push(op);
    }
    tokens
}

fn is_bare_operator(word: &str) -> bool {
    matches!(word, ">=" | "<=" | "!=" | "==" | "=" | ">" | "<" | "~" | "^" | "~>")
}

fn parse_alternative(tokens: &[String]) -> std::result::Result<Vec<Specifier>, String> {
    let mut specifiers = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        // `a - b` hyphen range
        if tokens.get(i + 1).is_some_and(|t| t == "-") {
            let lower = tokens[i].as_str();
            let upper = tokens
                .get(i + 2)
                .ok_or_else(|| format!("hyphen range '{lower} -' has no upper bound"))?;
            let (low, _) = parse_partial(lower)?;
            let (high, precision) = parse_partial(upper)?;
            specifiers.push(Specifier::new(CompareOp::Gte, low));
            specifiers.push(upper_bound_inclusive(high, precision)?);
            i += 3;
            continue;
        }
        specifiers.extend(parse_comparator(&tokens[i])?);
        i += 1;
    }
    Ok(specifiers)
}

/// Parse a single comparator such as `>=1.2`, `~1.2.3` or `1.x` into one or
/// two primitive specifiers.
fn parse_comparator(s: &str) -> std::result::Result<Vec<Specifier>, String> {
    if matches!(s, "*" | "x" | "X") {
        return Ok(Vec::new());
    }

    let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
        (">=", rest)
    } else if let Some(rest) = s.strip_prefix("<=") {
        ("<=", rest)
    } else if let Some(rest) = s.strip_prefix("!=") {
        ("!=", rest)
    } else if let Some(rest) = s.strip_prefix("==") {
        ("=", rest)
    } else if let Some(rest) = s.strip_prefix("~>") {
        ("~", rest)
    } else if let Some(rest) = s.strip_prefix('=') {
        ("=", rest)
    } else if let Some(rest) = s.strip_prefix('>') {
        (">", rest)
    } else if let Some(rest) = s.strip_prefix('<') {
        ("<", rest)
    } else if let Some(rest) = s.strip_prefix('~') {
        ("~", rest)
    } else if let Some(rest) = s.strip_prefix('^') {
        ("^", rest)
    } else {
        // Bare version implies ==
        ("=", s)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(format!("operator '{op}' has no version"));
    }
    let (version, precision) = parse_partial(rest)?;

    let specs = match op {
        ">=" => vec![Specifier::new(CompareOp::Gte, version)],
        ">" if precision < 3 => vec![Specifier::new(CompareOp::Gte, bump(&version, precision)?)],
        ">" => vec![Specifier::new(CompareOp::Gt, version)],
        "<" => vec![Specifier::new(CompareOp::Lt, version)],
        "<=" => vec![upper_bound_inclusive(version, precision)?],
        "!=" if precision < 3 => {
            // `!=1.2` excludes the whole 1.2.x line: split into an OR is not
            // expressible inside an AND list, so reject it explicitly.
            return Err(format!("'!={rest}' must name a full version"));
        }
        "!=" => vec![Specifier::new(CompareOp::Ne, version)],
        "~" => {
            let upper = if precision <= 1 {
                bump(&version, 1)?
            } else {
                bump(&version, 2)?
            };
            vec![
                Specifier::new(CompareOp::Gte, version),
                Specifier::new(CompareOp::Lt, upper),
            ]
        }
        "^" => {
            let upper = if version.major > 0 || precision <= 1 {
                bump(&version, 1)?
            } else if version.minor > 0 || precision == 2 {
                bump(&version, 2)?
            } else {
                bump(&version, 3)?
            };
            vec![
                Specifier::new(CompareOp::Gte, version),
                Specifier::new(CompareOp::Lt, upper),
            ]
        }
        // "="
        _ if precision < 3 => vec![
            Specifier::new(CompareOp::Gte, version.clone()),
            Specifier::new(CompareOp::Lt, bump(&version, precision)?),
        ],
        _ => vec![Specifier::new(CompareOp::Eq, version)],
    };
    Ok(specs)
}

/// `<=1.4` means anything in 1.4.x; `<=1.4.5` is literal.
fn upper_bound_inclusive(version: Version, precision: usize) -> std::result::Result<Specifier, String> {
    if precision < 3 {
        Ok(Specifier::new(CompareOp::Lt, bump(&version, precision)?))
    } else {
        Ok(Specifier::new(CompareOp::Lte, version))
    }
}

/// Increment the component at `precision` (1 = major, 2 = minor, 3 = patch)
/// and zero everything after it. Fails when that component is already at
/// its maximum.
fn bump(version: &Version, precision: usize) -> std::result::Result<Version, String> {
    let bumped = match precision {
        0 | 1 => version.major.checked_add(1).map(|major| Version::new(major, 0, 0)),
        2 => version
            .minor
            .checked_add(1)
            .map(|minor| Version::new(version.major, minor, 0)),
        _ => version
            .patch
            .checked_add(1)
            .map(|patch| Version::new(version.major, version.minor, patch)),
    };
    bumped.ok_or_else(|| format!("version '{version}' has no upper bound at this precision"))
}

/// Parse a possibly partial version (`1`, `1.2`, `1.2.x`, `v1.2.3-rc.1`).
///
/// Returns the version with missing components zeroed and the number of
/// components that were actually specified.
fn parse_partial(s: &str) -> std::result::Result<(Version, usize), String> {
    let s = s.trim();
    let s = s.strip_prefix('v').unwrap_or(s);
    let core_end = s.find(['-', '+']).unwrap_or(s.len());
    let (core, suffix) = s.split_at(core_end);

    let mut numbers = [0u64; 3];
    let mut precision = 0;
    for (idx, part) in core.split('.').enumerate() {
        if idx >= 3 {
            return Err(format!("invalid version '{s}': too many components"));
        }
        if matches!(part, "x" | "X" | "*") {
            break;
        }
        numbers[idx] = part
            .parse()
            .map_err(|_| format!("invalid version '{s}': bad component '{part}'"))?;
        precision = idx + 1;
    }
    if precision == 0 {
        return Err(format!("invalid version '{s}'"));
    }

    if suffix.is_empty() || precision < 3 {
        return Ok((Version::new(numbers[0], numbers[1], numbers[2]), precision));
    }
    let full = format!("{}.{}.{}{suffix}", numbers[0], numbers[1], numbers[2]);
    Version::parse(&full)
        .map(|v| (v, 3))
        .map_err(|e| format!("invalid version '{s}': {e}"))
}

/// Normalize a version string to semver by appending `.0` for missing
/// components.
///
/// - `"3.12"` -> `"3.12.0"`
/// - `"3.12.1"` -> `"3.12.1"`
pub fn normalize_version(s: &str) -> std::result::Result<Version, String> {
    let s = s.trim();

    // Try direct parse first
    if let Ok(v) = Version::parse(s) {
        return Ok(v);
    }

    match parse_partial(s) {
        Ok((v, _)) if !s.contains(['x', 'X', '*']) => Ok(v),
        Ok(_) => Err(format!("invalid version '{s}': wildcards are not versions")),
        Err(e) => Err(e),
    }
}
