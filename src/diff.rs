use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::{COL_CODE, MatchRule, is_curator_tag, is_truthy};
use crate::error::MetagrateError;
use crate::table::{LongCodeIndex, Table};

const UPLOAD_TAG_PREFIX: &str = "[Other] upload_";
const OTHER_PREFIX: &str = "[Other] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiffRow {
    pub code: String,
    pub long_code: String,
    /// Tags set on exactly one side, keyed by display name.
    pub tags: BTreeMap<String, Side>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub tags: Vec<String>,
    pub rows: Vec<DiffRow>,
}

/// Compares curator tags of observations present in both exports.
pub fn diff_tags(a: &Table, b: &Table, categories: &[String]) -> Result<DiffReport, MetagrateError> {
    let a_index = LongCodeIndex::build(a)?;
    let b_index = LongCodeIndex::build(b)?;
    let a_code = a.require_column(COL_CODE)?;
    let b_code = b.require_column(COL_CODE)?;

    let a_tags = curator_columns(a, categories);
    let b_tags = curator_columns(b, categories);
    let all_tags: BTreeSet<&str> = a_tags.keys().chain(b_tags.keys()).copied().collect();

    let mut rows = Vec::new();
    let mut seen_tags = BTreeSet::new();
    for b_row in 0..b.len() {
        let long_code_b = b_index.code(b_row);
        let partners = a_index.partners(long_code_b, MatchRule::Relaxed);
        let a_row = match partners.as_slice() {
            [] => continue,
            [single] => *single,
            many => {
                return Err(MetagrateError::AmbiguousLongCode {
                    table: "a",
                    code: long_code_b.as_str().to_string(),
                    candidates: many
                        .iter()
                        .map(|&row| a_index.code(row).as_str().to_string())
                        .collect(),
                });
            }
        };

        let long_code_a = a_index.code(a_row);
        let mut row = DiffRow {
            code: either_or_both(a.value(a_row, a_code), b.value(b_row, b_code)),
            long_code: either_or_both(long_code_a.as_str(), long_code_b.as_str()),
            tags: BTreeMap::new(),
        };

        for &tag in &all_tags {
            if tag.starts_with(UPLOAD_TAG_PREFIX) {
                continue;
            }
            let in_a = a_tags
                .get(tag)
                .map(|&column| is_truthy(a.value(a_row, column)))
                .unwrap_or(false);
            let in_b = b_tags
                .get(tag)
                .map(|&column| is_truthy(b.value(b_row, column)))
                .unwrap_or(false);
            let side = match (in_a, in_b) {
                (true, false) => Side::A,
                (false, true) => Side::B,
                _ => continue,
            };
            let name = tag.strip_prefix(OTHER_PREFIX).unwrap_or(tag).to_string();
            seen_tags.insert(name.clone());
            row.tags.insert(name, side);
        }

        rows.push(row);
    }

    rows.sort_by(|left, right| left.code.cmp(&right.code));

    Ok(DiffReport {
        tags: seen_tags.into_iter().collect(),
        rows,
    })
}

fn curator_columns<'a>(table: &'a Table, categories: &[String]) -> BTreeMap<&'a str, usize> {
    table
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, header)| is_curator_tag(header, categories))
        .map(|(index, header)| (header.as_str(), index))
        .collect()
}

fn either_or_both(a: &str, b: &str) -> String {
    if a == b {
        a.to_string()
    } else {
        format!("{a} vs {b}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_tag_categories;

    #[test]
    fn reports_one_sided_tags() {
        let a = Table::from_reader(
            "a",
            "Code,Long code,[Other] hit,[Series] amide,[Other] upload_1\n\
             x0001a,x0001_A_101_v1,True,False,True\n\
             x0002a,x0002_A_101_v1,False,False,False\n"
                .as_bytes(),
        )
        .unwrap();
        let b = Table::from_reader(
            "b",
            "Code,Long code,[Series] amide\n\
             x0001a,x0001_A_101_1_x0001+A+101+1,True\n"
                .as_bytes(),
        )
        .unwrap();

        let report = diff_tags(&a, &b, &default_tag_categories()).unwrap();
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.code, "x0001a");
        assert_eq!(row.long_code, "x0001_A_101_v1 vs x0001_A_101_1_x0001+A+101+1");
        assert_eq!(row.tags.get("hit"), Some(&Side::A));
        assert_eq!(row.tags.get("[Series] amide"), Some(&Side::B));
        assert_eq!(report.tags, vec!["[Series] amide".to_string(), "hit".to_string()]);
    }
}
