use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::MigrateConfig;
use crate::diff::{DiffReport, diff_tags};
use crate::domain::{COL_POSE, MatchRule};
use crate::error::MetagrateError;
use crate::migrate::{Migrator, SiteRename, TagSummary};
use crate::table::Table;

#[derive(Debug, Clone, Serialize)]
pub struct MigrateResult {
    pub source: String,
    pub template: String,
    pub output: String,
    pub rows: usize,
    pub matched: usize,
    pub match_rule: MatchRule,
    pub unmatched_template: Vec<String>,
    pub tags: Vec<TagSummary>,
    pub renamed_sites: Vec<SiteRename>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub a: String,
    pub b: String,
    #[serde(flatten)]
    pub report: DiffReport,
}

#[derive(Debug, Clone)]
pub struct App {
    config: MigrateConfig,
}

impl App {
    pub fn new(config: MigrateConfig) -> Self {
        Self { config }
    }

    pub fn migrate(
        &self,
        source: &Utf8Path,
        template: &Utf8Path,
    ) -> Result<MigrateResult, MetagrateError> {
        let output = self.config.output_path_or_default();
        info!(%source, %template, %output, "migrating tags");

        let source_table = load_export(source)?;
        let template_table = load_export(template)?;

        let migrator = Migrator::new(self.config.clone());
        let migration = migrator.migrate(&source_table, &template_table)?;

        info!(path = %output, "writing");
        migration.table.write_atomic(&output)?;

        Ok(MigrateResult {
            source: source.to_string(),
            template: template.to_string(),
            output: output.to_string(),
            rows: migration.table.len(),
            matched: migration.matched,
            match_rule: MatchRule::for_rename_sites(self.config.rename_sites),
            unmatched_template: migration.unmatched_template,
            tags: migration.tags,
            renamed_sites: migration.renames,
        })
    }

    pub fn diff(&self, a: &Utf8Path, b: &Utf8Path) -> Result<DiffResult, MetagrateError> {
        info!(%a, %b, "comparing tags");
        let a_table = load_export(a)?;
        let b_table = load_export(b)?;
        let report = diff_tags(&a_table, &b_table, &self.config.tag_categories)?;
        Ok(DiffResult {
            a: a.to_string(),
            b: b.to_string(),
            report,
        })
    }
}

fn load_export(path: &Utf8Path) -> Result<Table, MetagrateError> {
    let table = Table::load(path)?;
    if table.is_empty() {
        warn!("No rows in {path}");
    }
    if !table.has_column(COL_POSE) {
        warn!("Old metadata format: {path}");
    }
    Ok(table)
}
