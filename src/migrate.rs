use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MigrateConfig;
use crate::domain::{
    COL_CODE, COL_COMPOUND_CODE, COL_LONG_CODE, COL_SMILES, MatchRule, SiteAlias, SiteFamily,
    is_tag_column, is_truthy,
};
use crate::error::MetagrateError;
use crate::table::{LongCodeIndex, Table};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagSummary {
    pub name: String,
    pub migrated: usize,
    pub truthy: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SiteRename {
    pub family: SiteFamily,
    pub from: String,
    pub to: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub table: Table,
    pub tags: Vec<TagSummary>,
    pub renames: Vec<SiteRename>,
    pub matched: usize,
    pub unmatched_template: Vec<String>,
}

/// A TEMPLATE row paired with its SOURCE row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPair {
    pub template: usize,
    pub source: usize,
}

pub struct Migrator {
    config: MigrateConfig,
}

impl Migrator {
    pub fn new(config: MigrateConfig) -> Self {
        Self { config }
    }

    pub fn migrate(&self, source: &Table, template: &Table) -> Result<Migration, MetagrateError> {
        let rule = MatchRule::for_rename_sites(self.config.rename_sites);
        let source_index = LongCodeIndex::build(source)?;
        let template_index = LongCodeIndex::build(template)?;
        if source_index.is_empty() {
            warn!("No rows in {}, nothing to migrate", source.label());
        }

        let pairs = pair_rows(&source_index, &template_index, rule)?;
        let unmatched_template = self.unmatched_template(&template_index, &pairs)?;

        for pair in &pairs {
            check_row_consistency(source, template, &source_index, *pair)?;
        }

        let mut output = template.clone();
        let tags = self.copy_tags(source, &mut output, &pairs);

        let renames = if self.config.rename_sites {
            let cache = SiteAliasCache::collect(source, template, &source_index, &pairs)?;
            cache.apply(template, &mut output)
        } else {
            Vec::new()
        };

        Ok(Migration {
            table: output,
            tags,
            renames,
            matched: pairs.len(),
            unmatched_template,
        })
    }

    fn unmatched_template(
        &self,
        template_index: &LongCodeIndex,
        pairs: &[RowPair],
    ) -> Result<Vec<String>, MetagrateError> {
        let mut paired = vec![false; template_index.len()];
        for pair in pairs {
            paired[pair.template] = true;
        }

        let mut unmatched = Vec::new();
        for (row, is_paired) in paired.into_iter().enumerate() {
            if is_paired {
                continue;
            }
            let code = template_index.code(row).as_str().to_string();
            if !self.config.allow_unmatched_template {
                return Err(MetagrateError::UnmatchedTemplate {
                    template_code: code,
                });
            }
            warn!("No observations in SOURCE w/ {COL_LONG_CODE}: {code}");
            unmatched.push(code);
        }
        Ok(unmatched)
    }

    fn copy_tags(&self, source: &Table, output: &mut Table, pairs: &[RowPair]) -> Vec<TagSummary> {
        let categories = &self.config.tag_categories;
        let tag_columns: Vec<(usize, String)> = source
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, header)| is_tag_column(header, categories))
            .map(|(index, header)| (index, header.clone()))
            .collect();

        let mut summaries = Vec::with_capacity(tag_columns.len());
        for (source_column, name) in tag_columns {
            let output_column = output.ensure_column(&name);
            let mut summary = TagSummary {
                name,
                migrated: 0,
                truthy: 0,
            };
            for pair in pairs {
                let value = source.value(pair.source, source_column);
                if is_truthy(value) {
                    summary.truthy += 1;
                }
                summary.migrated += 1;
                output.set(pair.template, output_column, value);
            }
            for row in 0..output.len() {
                if output.value(row, output_column).trim().is_empty() {
                    output.set(row, output_column, "False");
                }
            }
            debug!(
                tag = %summary.name,
                migrated = summary.migrated,
                truthy = summary.truthy,
                "migrated tag"
            );
            summaries.push(summary);
        }
        summaries
    }
}

/// Pairs every SOURCE row with exactly one TEMPLATE row.
pub fn pair_rows(
    source_index: &LongCodeIndex,
    template_index: &LongCodeIndex,
    rule: MatchRule,
) -> Result<Vec<RowPair>, MetagrateError> {
    let mut claimed: HashMap<usize, usize> = HashMap::new();
    let mut pairs = Vec::with_capacity(source_index.len());

    for source_row in 0..source_index.len() {
        let code = source_index.code(source_row);
        let partners = template_index.partners(code, rule);
        let template_row = match partners.as_slice() {
            [single] => *single,
            [] => {
                let template_code = template_index
                    .nearest(code)
                    .map(|nearest| nearest.as_str().to_string())
                    .or_else(|| {
                        (source_row < template_index.len())
                            .then(|| template_index.code(source_row).as_str().to_string())
                    })
                    .unwrap_or_else(|| "<none>".to_string());
                return Err(MetagrateError::LongCodeMismatch {
                    source_code: code.as_str().to_string(),
                    template_code,
                    rule,
                });
            }
            many => {
                return Err(MetagrateError::AmbiguousLongCode {
                    table: "TEMPLATE",
                    code: code.as_str().to_string(),
                    candidates: many
                        .iter()
                        .map(|&row| template_index.code(row).as_str().to_string())
                        .collect(),
                });
            }
        };

        if let Some(&previous) = claimed.get(&template_row) {
            return Err(MetagrateError::AmbiguousLongCode {
                table: "SOURCE",
                code: template_index.code(template_row).as_str().to_string(),
                candidates: vec![
                    source_index.code(previous).as_str().to_string(),
                    code.as_str().to_string(),
                ],
            });
        }
        claimed.insert(template_row, source_row);
        pairs.push(RowPair {
            template: template_row,
            source: source_row,
        });
    }

    pairs.sort_by_key(|pair| pair.template);
    Ok(pairs)
}

fn check_row_consistency(
    source: &Table,
    template: &Table,
    source_index: &LongCodeIndex,
    pair: RowPair,
) -> Result<(), MetagrateError> {
    let code = source
        .column(COL_CODE)
        .map(|column| source.value(pair.source, column).to_string())
        .unwrap_or_else(|| source_index.code(pair.source).as_str().to_string());

    if let (Some(source_column), Some(template_column)) = (
        source.column(COL_COMPOUND_CODE),
        template.column(COL_COMPOUND_CODE),
    ) {
        let source_value = source.value(pair.source, source_column).trim();
        let template_value = template.value(pair.template, template_column).trim();
        if source_value.is_empty() {
            warn!("Null {COL_COMPOUND_CODE} for {code} in SOURCE file");
        }
        if template_value.is_empty() {
            warn!("Null {COL_COMPOUND_CODE} for {code} in TEMPLATE file");
        }
        if source_value != template_value {
            return Err(MetagrateError::CompoundCodeMismatch {
                code,
                source_value: source_value.to_string(),
                template_value: template_value.to_string(),
            });
        }
    }

    if let (Some(source_column), Some(template_column)) =
        (source.column(COL_SMILES), template.column(COL_SMILES))
    {
        let source_value = source.value(pair.source, source_column);
        let template_value = template.value(pair.template, template_column);
        if source_value != template_value {
            warn!(
                source = source_value,
                template = template_value,
                "SMILES in SOURCE do not match TEMPLATE for {code}"
            );
        }
    }

    Ok(())
}

/// Per-family map of TEMPLATE alias name to SOURCE alias name, in first-seen order.
#[derive(Debug, Default)]
struct SiteAliasCache {
    entries: Vec<(SiteFamily, String, String)>,
}

impl SiteAliasCache {
    fn collect(
        source: &Table,
        template: &Table,
        source_index: &LongCodeIndex,
        pairs: &[RowPair],
    ) -> Result<Self, MetagrateError> {
        let mut cache = Self::default();
        let mut lookup: HashMap<(SiteFamily, String), usize> = HashMap::new();

        for family in SiteFamily::ALL {
            let column = family.alias_column();
            let (Some(source_column), Some(template_column)) =
                (source.column(&column), template.column(&column))
            else {
                debug!("{column} missing, skipping {family} renames");
                continue;
            };

            for pair in pairs {
                let source_cell = source.value(pair.source, source_column);
                let template_cell = template.value(pair.template, template_column);
                if source_cell.trim().is_empty() || template_cell.trim().is_empty() {
                    continue;
                }
                let source_name = SiteAlias::parse(source_cell).name;
                let template_name = SiteAlias::parse(template_cell).name;

                match lookup.get(&(family, template_name.to_string())) {
                    Some(&entry) => {
                        let cached = &cache.entries[entry].2;
                        if cached != source_name {
                            return Err(MetagrateError::SiteAliasInconsistency {
                                column,
                                code: source_index.code(pair.source).as_str().to_string(),
                                template_value: template_name.to_string(),
                                source_value: source_name.to_string(),
                                cached: cached.clone(),
                            });
                        }
                    }
                    None => {
                        debug!("Caching {family}[{template_name:?}]={source_name:?}");
                        lookup.insert((family, template_name.to_string()), cache.entries.len());
                        cache.entries.push((
                            family,
                            template_name.to_string(),
                            source_name.to_string(),
                        ));
                    }
                }
            }
        }

        Ok(cache)
    }

    /// Renames curator-assigned aliases; generated and unchanged names are left alone.
    /// Cells are matched against `template` so one rename never feeds another.
    fn apply(self, template: &Table, output: &mut Table) -> Vec<SiteRename> {
        let mut renames = Vec::new();
        for (family, from, to) in self.entries {
            if from == to || family.is_generated_alias(&to) {
                continue;
            }
            let Some(column) = template.column(&family.alias_column()) else {
                continue;
            };

            let mut rows = 0;
            for row in 0..template.len() {
                let alias = SiteAlias::parse(template.value(row, column));
                if alias.name != from {
                    continue;
                }
                output.set(row, column, alias.with_name(&to));
                rows += 1;
            }

            info!("Renamed {family} alias: {from} --> {to}");
            renames.push(SiteRename {
                family,
                from,
                to,
                rows,
            });
        }
        renames
    }
}
