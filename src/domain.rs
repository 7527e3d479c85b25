use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::MetagrateError;

pub const COL_CODE: &str = "Code";
pub const COL_LONG_CODE: &str = "Long code";
pub const COL_COMPOUND_CODE: &str = "Compound code";
pub const COL_SMILES: &str = "Smiles";
pub const COL_POSE: &str = "Pose";

/// Columns of a Fragalysis metadata export that are never user tags.
const FIXED_COLUMNS: [&str; 9] = [
    COL_CODE,
    COL_LONG_CODE,
    COL_COMPOUND_CODE,
    COL_SMILES,
    COL_POSE,
    "Downloaded",
    "Centroid res",
    "Experiment code",
    "PDB entry",
];
const SITE_COLUMN_SUFFIXES: [&str; 3] = ["alias", "upload name", "short tag"];

pub fn default_tag_categories() -> Vec<String> {
    vec!["Other".to_string(), "Forum".to_string(), "Series".to_string()]
}

static LEGACY_LONG_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<observation>.+_[^_]+_[0-9]+)_v(?P<version>[0-9]+)$").unwrap()
});

static COMPOUND_LONG_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<observation>.+?_[^_]+_[0-9]+)_(?P<version>[0-9]+)_(?P<reference>[^+]+\+[^+]+\+[0-9]+\+[0-9]+)$",
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LongCodeFormat {
    /// `<crystal>_<chain>_<residue>_v<version>`
    Legacy,
    /// `<crystal>_<chain>_<residue>_<version>_<ref>+<chain>+<residue>+<version>`
    Compound,
    /// Anything else; only ever equal to itself.
    Opaque,
}

/// Parsed "Long code" of a metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LongCode {
    raw: String,
    observation: String,
    version: u32,
    reference: Option<String>,
    format: LongCodeFormat,
}

impl LongCode {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Crystal, chain and residue, e.g. `A71EV2A-x0450_A_201`.
    pub fn observation(&self) -> &str {
        &self.observation
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn format(&self) -> LongCodeFormat {
        self.format
    }

    pub fn compatibility(&self, other: &LongCode) -> Compatibility {
        if self.raw == other.raw {
            return Compatibility::Exact;
        }
        if self.format == LongCodeFormat::Opaque || other.format == LongCodeFormat::Opaque {
            return Compatibility::Incompatible;
        }
        let one_side_legacy =
            self.format == LongCodeFormat::Legacy || other.format == LongCodeFormat::Legacy;
        if one_side_legacy
            && self.observation == other.observation
            && self.version == other.version
        {
            return Compatibility::Upgraded;
        }
        Compatibility::Incompatible
    }
}

impl fmt::Display for LongCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for LongCode {
    type Err = MetagrateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let raw = value.trim();
        if raw.is_empty() {
            return Err(MetagrateError::InvalidLongCode(value.to_string()));
        }
        let (captures, reference, format) =
            if let Some(captures) = COMPOUND_LONG_CODE.captures(raw) {
                let reference = captures.name("reference").map(|m| m.as_str().to_string());
                (captures, reference, LongCodeFormat::Compound)
            } else if let Some(captures) = LEGACY_LONG_CODE.captures(raw) {
                (captures, None, LongCodeFormat::Legacy)
            } else {
                return Ok(Self {
                    raw: raw.to_string(),
                    observation: raw.to_string(),
                    version: 0,
                    reference: None,
                    format: LongCodeFormat::Opaque,
                });
            };

        let observation = captures["observation"].to_string();
        let version = captures["version"]
            .parse()
            .map_err(|_| MetagrateError::InvalidLongCode(value.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            observation,
            version,
            reference,
            format,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Exact,
    /// A legacy code and a compound code naming the same observation and version.
    Upgraded,
    Incompatible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchRule {
    Strict,
    Relaxed,
}

impl MatchRule {
    pub fn for_rename_sites(rename_sites: bool) -> Self {
        if rename_sites {
            MatchRule::Strict
        } else {
            MatchRule::Relaxed
        }
    }

    pub fn accepts(self, compatibility: Compatibility) -> bool {
        match (self, compatibility) {
            (_, Compatibility::Exact) => true,
            (MatchRule::Relaxed, Compatibility::Upgraded) => true,
            _ => false,
        }
    }
}

/// XCA site families carried as `<family> alias` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SiteFamily {
    ConformerSites,
    CanonSites,
    CrystalformSites,
    Crystalforms,
    Quatassemblies,
}

impl SiteFamily {
    pub const ALL: [SiteFamily; 5] = [
        SiteFamily::ConformerSites,
        SiteFamily::CanonSites,
        SiteFamily::CrystalformSites,
        SiteFamily::Crystalforms,
        SiteFamily::Quatassemblies,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SiteFamily::ConformerSites => "ConformerSites",
            SiteFamily::CanonSites => "CanonSites",
            SiteFamily::CrystalformSites => "CrystalformSites",
            SiteFamily::Crystalforms => "Crystalforms",
            SiteFamily::Quatassemblies => "Quatassemblies",
        }
    }

    pub fn alias_column(self) -> String {
        format!("{} alias", self.as_str())
    }

    /// Whether `name` looks like an XCA-generated alias rather than one a
    /// curator typed in.
    pub fn is_generated_alias(self, name: &str) -> bool {
        generated_alias_patterns(self)
            .iter()
            .any(|pattern| pattern.is_match(name))
    }
}

impl fmt::Display for SiteFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static CONFORMER_SITE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^.*-x[0-9]{4}$").unwrap(),
        Regex::new(r"^.*[0-9]{4}/.*/.*$").unwrap(),
    ]
});

static CANON_SITE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^.*-x[0-9]{4}/.*/.*/.*$").unwrap(),
        Regex::new(r"^.*[0-9]{4}/.*/.*/.*$").unwrap(),
    ]
});

static CRYSTALFORM_SITE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^.*-x[0-9]{4}/.*/.*$").unwrap(),
        Regex::new(r"^.*[0-9]{4}/.*/.*$").unwrap(),
    ]
});

static CRYSTALFORM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"^.*_.*_.*$").unwrap(),
        Regex::new(r"^.*/.*/.*$").unwrap(),
    ]
});

fn generated_alias_patterns(family: SiteFamily) -> &'static [Regex] {
    match family {
        SiteFamily::ConformerSites => CONFORMER_SITE_PATTERNS.as_slice(),
        SiteFamily::CanonSites => CANON_SITE_PATTERNS.as_slice(),
        SiteFamily::CrystalformSites => CRYSTALFORM_SITE_PATTERNS.as_slice(),
        SiteFamily::Crystalforms => CRYSTALFORM_PATTERNS.as_slice(),
        SiteFamily::Quatassemblies => &[],
    }
}

/// A site alias cell such as `3 - CanonSites 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAlias<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
}

impl<'a> SiteAlias<'a> {
    pub fn parse(value: &'a str) -> Self {
        match value.split_once(" - ") {
            Some((prefix, name)) => Self { prefix, name },
            None => Self {
                prefix: "",
                name: value,
            },
        }
    }

    pub fn with_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{} - {name}", self.prefix)
        }
    }
}

/// Category of a `[Category] name` header, if the header has that shape.
pub fn tag_category(header: &str) -> Option<&str> {
    let rest = header.strip_prefix('[')?;
    let (category, _) = rest.split_once(']')?;
    Some(category)
}

pub fn is_curator_tag(header: &str, categories: &[String]) -> bool {
    tag_category(header)
        .map(|category| categories.iter().any(|allowed| allowed == category))
        .unwrap_or(false)
}

pub fn is_fixed_column(header: &str) -> bool {
    if FIXED_COLUMNS.contains(&header) {
        return true;
    }
    SiteFamily::ALL.iter().any(|family| {
        SITE_COLUMN_SUFFIXES
            .iter()
            .any(|suffix| header == format!("{} {suffix}", family.as_str()))
    })
}

/// Whether a SOURCE column carries user tags that should be migrated.
/// Bracketed columns migrate only for the configured categories; any other
/// column outside the export schema is an opaque user tag.
pub fn is_tag_column(header: &str, categories: &[String]) -> bool {
    if tag_category(header).is_some() {
        return is_curator_tag(header, categories);
    }
    !is_fixed_column(header)
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "y"
    )
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_legacy_long_code() {
        let code: LongCode = "A71EV2A-x0450_A_201_v1".parse().unwrap();
        assert_eq!(code.observation(), "A71EV2A-x0450_A_201");
        assert_eq!(code.version(), 1);
        assert_eq!(code.format(), LongCodeFormat::Legacy);
    }

    #[test]
    fn parse_compound_long_code() {
        let code: LongCode = "3vws_A_1004_1_3vws+A+1003+1".parse().unwrap();
        assert_eq!(code.observation(), "3vws_A_1004");
        assert_eq!(code.version(), 1);
        assert_eq!(code.reference(), Some("3vws+A+1003+1"));
    }

    #[test]
    fn parse_compound_long_code_with_underscored_crystal() {
        let code: LongCode = "Zika_NS5A-x0264_A_1101_1_Zika_NS5A-x0264+A+1101+1"
            .parse()
            .unwrap();
        assert_eq!(code.observation(), "Zika_NS5A-x0264_A_1101");
        assert_eq!(code.reference(), Some("Zika_NS5A-x0264+A+1101+1"));
    }

    #[test]
    fn parse_long_code_blank() {
        let err = "   ".parse::<LongCode>().unwrap_err();
        assert_matches!(err, MetagrateError::InvalidLongCode(_));
    }

    #[test]
    fn unstructured_long_code_is_opaque() {
        let code: LongCode = "A".parse().unwrap();
        assert_eq!(code.format(), LongCodeFormat::Opaque);
        assert_eq!(code.observation(), "A");
        assert_eq!(code.version(), 0);
        assert_eq!(code.reference(), None);
        assert_eq!(code.compatibility(&"A".parse().unwrap()), Compatibility::Exact);
    }

    #[test]
    fn opaque_code_never_upgrades() {
        let opaque: LongCode = "x0001_A_101".parse().unwrap();
        let legacy: LongCode = "x0001_A_101_v0".parse().unwrap();
        assert_eq!(opaque.format(), LongCodeFormat::Opaque);
        assert_eq!(opaque.compatibility(&legacy), Compatibility::Incompatible);
    }

    #[test]
    fn relaxed_rule_upgrades_legacy_codes() {
        let legacy: LongCode = "A71EV2A-x0450_A_201_v1".parse().unwrap();
        let compound: LongCode = "A71EV2A-x0450_A_201_1_A71EV2A-x0526+A+147+1"
            .parse()
            .unwrap();
        let compatibility = legacy.compatibility(&compound);
        assert_eq!(compatibility, Compatibility::Upgraded);
        assert!(MatchRule::Relaxed.accepts(compatibility));
        assert!(!MatchRule::Strict.accepts(compatibility));
    }

    #[test]
    fn differing_references_never_match() {
        let a: LongCode = "3vws_A_1004_1_3vws+A+1003+1".parse().unwrap();
        let b: LongCode = "3vws_A_1004_1_3vws+A+1004+1".parse().unwrap();
        assert_eq!(a.compatibility(&b), Compatibility::Incompatible);
    }

    #[test]
    fn detect_generated_aliases() {
        assert!(SiteFamily::CanonSites.is_generated_alias("Zika_NS5A-x0264/A/1101/1"));
        assert!(!SiteFamily::CanonSites.is_generated_alias("allosteric pocket"));
        assert!(SiteFamily::ConformerSites.is_generated_alias("Z0264/A/1101"));
        assert!(SiteFamily::Crystalforms.is_generated_alias("P43212/a/b"));
        assert!(!SiteFamily::Quatassemblies.is_generated_alias("monomer"));
    }

    #[test]
    fn tag_columns() {
        let categories = default_tag_categories();
        assert!(is_tag_column("[Other] upload_1", &categories));
        assert!(!is_tag_column("[CanonSites] 1 - x", &categories));
        assert!(is_tag_column("tag1", &categories));
        assert!(!is_tag_column("CanonSites alias", &categories));
        assert!(!is_tag_column("CanonSites upload name", &categories));
        assert!(!is_tag_column("Centroid res", &categories));
        assert!(!is_tag_column("PDB entry", &categories));
    }
}
