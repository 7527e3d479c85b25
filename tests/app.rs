use std::fs;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use metagrate::app::App;
use metagrate::config::MigrateConfig;
use metagrate::error::MetagrateError;
use metagrate::table::Table;

const SOURCE: &str = "\
Code,Long code,Compound code,Smiles,Pose,CanonSites alias,[Other] hit,[Forum] discussed
x0450a,A71EV2A-x0450_A_201_1_A71EV2A-x0526+A+147+1,Z100,CCO,p1,1 - allosteric,True,False
x0526a,A71EV2A-x0526_A_147_1_A71EV2A-x0526+A+147+1,Z200,CCN,p2,1 - allosteric,False,True
";

const TEMPLATE: &str = "\
Code,Long code,Compound code,Smiles,Pose,CanonSites alias
x0450a,A71EV2A-x0450_A_201_1_A71EV2A-x0526+A+147+1,Z100,CCO,p1,1 - CanonSites 1
x0526a,A71EV2A-x0526_A_147_1_A71EV2A-x0526+A+147+1,Z200,CCN,p2,1 - CanonSites 1
";

fn write(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::write(path.as_std_path(), content).unwrap();
    path
}

fn workspace() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

fn app_with_output(output: &Utf8Path, rename_sites: bool) -> App {
    App::new(MigrateConfig {
        rename_sites,
        output_path: Some(output.to_path_buf()),
        ..MigrateConfig::default()
    })
}

#[test]
fn migrate_writes_tags_and_renames_sites() {
    let (_temp, root) = workspace();
    let source = write(&root, "source.csv", SOURCE);
    let template = write(&root, "template.csv", TEMPLATE);
    let output = root.join("out.csv");

    let result = app_with_output(&output, true)
        .migrate(&source, &template)
        .unwrap();

    assert_eq!(result.rows, 2);
    assert_eq!(result.matched, 2);
    assert_eq!(result.tags.len(), 2);
    assert_eq!(result.renamed_sites.len(), 1);

    let written = fs::read_to_string(output.as_std_path()).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Code,Long code,Compound code,Smiles,Pose,CanonSites alias,[Other] hit,[Forum] discussed"
    );
    assert_eq!(
        lines.next().unwrap(),
        "x0450a,A71EV2A-x0450_A_201_1_A71EV2A-x0526+A+147+1,Z100,CCO,p1,1 - allosteric,True,False"
    );
}

#[test]
fn migrate_is_idempotent() {
    let (_temp, root) = workspace();
    let source = write(&root, "source.csv", SOURCE);
    let template = write(&root, "template.csv", TEMPLATE);
    let first = root.join("first.csv");
    let second = root.join("second.csv");

    app_with_output(&first, true)
        .migrate(&source, &template)
        .unwrap();
    app_with_output(&second, true)
        .migrate(&source, &template)
        .unwrap();

    assert_eq!(
        fs::read(first.as_std_path()).unwrap(),
        fs::read(second.as_std_path()).unwrap()
    );
}

#[test]
fn no_rename_sites_keeps_template_aliases() {
    let (_temp, root) = workspace();
    let source = write(&root, "source.csv", SOURCE);
    let template = write(&root, "template.csv", TEMPLATE);
    let output = root.join("out.csv");

    let result = app_with_output(&output, false)
        .migrate(&source, &template)
        .unwrap();
    assert!(result.renamed_sites.is_empty());

    let written = fs::read_to_string(output.as_std_path()).unwrap();
    assert!(written.contains("1 - CanonSites 1"));
    assert!(!written.contains("allosteric"));
}

#[test]
fn mismatch_writes_nothing() {
    let (_temp, root) = workspace();
    let source = write(
        &root,
        "source.csv",
        "Long code,[Other] hit\n3vws_A_1004_1_3vws+A+1003+1,True\n",
    );
    let template = write(
        &root,
        "template.csv",
        "Long code\n3vws_A_1004_1_3vws+A+1004+1\n",
    );
    let output = root.join("out.csv");

    let err = app_with_output(&output, true)
        .migrate(&source, &template)
        .unwrap_err();

    assert_matches!(err, MetagrateError::LongCodeMismatch { .. });
    let message = err.to_string();
    assert!(message.contains("3vws_A_1004_1_3vws+A+1003+1"));
    assert!(message.contains("3vws_A_1004_1_3vws+A+1004+1"));
    assert!(message.contains("--no-rename-sites"));
    assert!(!output.as_std_path().exists());
}

#[test]
fn missing_input_names_the_file() {
    let (_temp, root) = workspace();
    let template = write(&root, "template.csv", TEMPLATE);
    let missing = root.join("nope.csv");

    let err = app_with_output(&root.join("out.csv"), true)
        .migrate(&missing, &template)
        .unwrap_err();

    assert_matches!(err, MetagrateError::InputRead { ref path, .. } if path.ends_with("nope.csv"));
}

#[test]
fn missing_long_code_column_is_reported() {
    let (_temp, root) = workspace();
    let source = write(&root, "source.csv", "Code,tag\nx1,True\n");
    let template = write(&root, "template.csv", TEMPLATE);

    let err = app_with_output(&root.join("out.csv"), true)
        .migrate(&source, &template)
        .unwrap_err();

    assert_matches!(err, MetagrateError::MissingColumn { ref column, .. } if column == "Long code");
}

#[test]
fn diff_reads_both_files() {
    let (_temp, root) = workspace();
    let a = write(&root, "a.csv", SOURCE);
    let b = write(&root, "b.csv", TEMPLATE);

    let result = App::new(MigrateConfig::default()).diff(&a, &b).unwrap();
    assert_eq!(result.report.rows.len(), 2);
    assert_eq!(result.report.rows[0].code, "x0450a");
    assert!(result.report.rows[0].tags.contains_key("hit"));
}

#[test]
fn migrate_reads_xlsx_source() {
    let (_temp, root) = workspace();
    let source = root.join("source.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        for (row, line) in SOURCE.lines().enumerate() {
            for (col, cell) in line.split(',').enumerate() {
                sheet
                    .write_string(row as u32, col as u16, cell)
                    .unwrap();
            }
        }
    }
    workbook.save(source.as_std_path()).unwrap();
    let template = write(&root, "template.csv", TEMPLATE);

    let loaded = Table::load(&source).unwrap();
    let from_csv = Table::from_reader(source.as_str(), SOURCE.as_bytes()).unwrap();
    assert_eq!(loaded, from_csv);

    let output = root.join("out.csv");
    let result = app_with_output(&output, true)
        .migrate(&source, &template)
        .unwrap();
    assert_eq!(result.matched, 2);
    let written = fs::read_to_string(output.as_std_path()).unwrap();
    assert!(written.contains("1 - allosteric,True,False"));
}
