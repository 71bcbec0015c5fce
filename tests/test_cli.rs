/// Command-line tests: argument validation and a full run through the binary
use anyhow::Result;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

use eggtab::annotation::Category;

use synthetic_annotations::*;

fn eggtab() -> Command {
    Command::new(env!("CARGO_BIN_EXE_eggtab"))
}

#[test]
fn test_bad_category_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("sample_annotations.tsv");
    write_annotations(&input, &[Gene::new("c_1")]);

    let output = eggtab()
        .arg("-i")
        .arg(&input)
        .args(["--eggnog-category", "Pfam"])
        .output()?;

    assert!(!output.status.success(), "Unknown category should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Bad category selection"),
        "Should explain the bad category, got: {stderr}"
    );
    Ok(())
}

#[test]
fn test_threshold_out_of_range() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("sample_annotations.tsv");
    write_annotations(&input, &[Gene::new("c_1")]);

    let output = eggtab()
        .arg("-i")
        .arg(&input)
        .args(["--contig-taxa-threshold", "1.5"])
        .output()?;
    assert!(!output.status.success());
    Ok(())
}

#[test]
fn test_use_cov_requires_coverage_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("sample_annotations.tsv");
    write_annotations(&input, &[Gene::new("c_1")]);

    let output = eggtab()
        .arg("-i")
        .arg(&input)
        .args(["--use-cov", "--no-go-xref"])
        .arg("-o")
        .arg(temp_dir.path())
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--input-cov"), "got: {stderr}");
    Ok(())
}

#[test]
fn test_missing_input_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = eggtab()
        .arg("-i")
        .arg(temp_dir.path().join("absent.tsv"))
        .args(["--no-go-xref", "--quiet"])
        .arg("-o")
        .arg(temp_dir.path())
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to open"), "got: {stderr}");
    Ok(())
}

#[test]
fn test_run_all_categories() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("42_sample.annotations");
    write_annotations(
        &input,
        &[
            Gene::new("ctg_1_1")
                .with(Category::KeggKo, "ko:K00001")
                .with(Category::Cog, "C,CE")
                .taxon("Bacteria"),
            Gene::new("ctg_1_2").with(Category::KeggKo, "ko:K00001").taxon("Bacteria"),
        ],
    );
    let fasta = temp_dir.path().join("42_contigs.fa");
    write_fasta(&fasta, &[("ctg_1", 5000)]);
    let out_dir = temp_dir.path().join("results");

    let output = eggtab()
        .arg("-i")
        .arg(&input)
        .arg("--input-contig-fasta")
        .arg(&fasta)
        .args(["--eggnog-category", "ALL_CATEGORIES"])
        .args(["--min-contig-coverage", "1", "--no-go-xref", "-t", "2"])
        .arg("-o")
        .arg(&out_dir)
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let ko = fs::read_to_string(out_dir.join("42_len2000_cov1_KEGG_ko_unweighted_direct_count_table.csv"))?;
    assert_eq!(ko, "ko:K00001,2\n");
    // Single-letter COG fragments are dropped
    let cog = fs::read_to_string(out_dir.join("42_len2000_cov1_COG_unweighted_direct_count_table.csv"))?;
    assert_eq!(cog, "CE,1\n");
    assert!(out_dir.join("42_contig_length_summary.tsv").exists());
    Ok(())
}
