use std::fs;
use std::path::Path;

use filtersnp::filter::DropReason;
use filtersnp::params::Params;
use filtersnp::record::Record;
use filtersnp::types::{FileType, TypedVec};
use filtersnp::VariantReader;
use rust_htslib::bcf::{self, Read};

const HEADER: &str = "##fileformat=VCFv4.2\n\
##FILTER=<ID=PASS,Description=\"All filters passed\">\n\
##contig=<ID=chr1,length=100000>\n\
##contig=<ID=chr2,length=100000>\n\
##INFO=<ID=AC,Number=A,Type=Integer,Description=\"Allele count\">\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Allele number\">\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
##INFO=<ID=QD,Number=1,Type=Float,Description=\"Quality by depth\">\n\
##INFO=<ID=FS,Number=1,Type=Float,Description=\"Fisher strand\">\n\
##INFO=<ID=MQ,Number=1,Type=Float,Description=\"Mapping quality\">\n\
##INFO=<ID=ReadPosRankSum,Number=1,Type=Float,Description=\"Read position rank sum\">\n\
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths\">\n\
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype quality\">\n\
##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Likelihoods\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n";

const RECORDS: &[&str] = &[
    // kept
    "chr1\t100\trs1\tA\tG\t50\tPASS\tAC=2;AF=0.5;AN=4;DP=40;QD=10;FS=1.0;MQ=60;DB\tGT:AD:GQ:PL\t0/1:5,5:30:30,0,30\t0|1:4,6:40:40,0,40",
    // QUAL too low
    "chr1\t200\t.\tC\tT\t12\tPASS\tAC=2;AF=0.5;AN=4;DP=40\tGT:AD\t0/1:5,5\t0/1:4,6",
    // QD too low
    "chr1\t300\t.\tG\tA\t80\tPASS\tAC=2;AF=0.5;AN=4;QD=1.2\tGT\t0/1\t0/1",
    // AF too low
    "chr1\t400\t.\tT\tC\t80\tPASS\tAC=0;AF=0.005;AN=4\tGT\t0/0\t0/0",
    // missing rate 0.5
    "chr1\t500\t.\tA\tC\t80\tPASS\tAC=1;AF=0.5;AN=2\tGT\t0/1\t./.",
    // kept, missing QUAL, multiallelic
    "chr2\t50\t.\tA\tC,T\t.\t.\tAC=1,1;AF=0.25,0.25;AN=4;MQ=45\tGT:AD:PL\t0/1:3,3,0:1,2,3,4,5,6\t0/2:3,0,3:1,2,3,4,5,6",
    // no AF
    "chr2\t60\t.\tA\tC\t80\tPASS\tAN=4\tGT\t0/1\t0/1",
];

fn write_input(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("input.vcf");
    let mut text = HEADER.to_string();
    for line in RECORDS {
        text.push_str(line);
        text.push('\n');
    }
    fs::write(&path, text).unwrap();
    path
}

fn run(output_name: &str) -> (tempfile::TempDir, std::path::PathBuf, filtersnp::RunSummary) {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join(output_name);
    let summary = filtersnp::run(&Params::new(&input, &output, FileType::Snp)).unwrap();
    (dir, output, summary)
}

#[test]
fn test_run_filters_and_strips() {
    let (_dir, output, summary) = run("out.vcf.gz");

    assert_eq!(summary.decoded, 7);
    assert_eq!(summary.kept, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.dropped[&DropReason::LowQual], 1);
    assert_eq!(summary.dropped[&DropReason::LowQualByDepth], 1);
    assert_eq!(summary.dropped[&DropReason::LowAlleleFrequency], 1);
    assert_eq!(summary.dropped[&DropReason::HighMissingRate], 1);
    assert_eq!(summary.dropped[&DropReason::MissingAlleleFrequency], 1);
    assert!(output.with_extension("gz.tbi").exists());

    let reader = VariantReader::from_path(&output).unwrap();
    let schema_info: Vec<&str> = reader.schema().info.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(schema_info, vec!["AC", "AF", "AN", "DP"]);
    let schema_format: Vec<&str> = reader.schema().format.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(schema_format, vec!["GT", "AD"]);

    let records: Vec<_> = reader.map(|r| r.unwrap()).collect();
    let positions: Vec<(String, u64)> = records
        .iter()
        .map(|r| (r.chrom().to_string(), r.pos()))
        .collect();
    assert_eq!(
        positions,
        vec![("chr1".to_string(), 100), ("chr2".to_string(), 50)]
    );

    let first = &records[0];
    assert_eq!(first.id(), b"rs1");
    assert_eq!(first.qual(), Some(50.0));
    assert_eq!(first.filters(), vec!["PASS"]);
    assert_eq!(first.info_keys(), vec!["AC", "AF", "AN", "DP"]);
    assert!(!first.has_flag("DB"));
    assert_eq!(
        first.format("AD").unwrap(),
        &[TypedVec::Int32(vec![5, 5]), TypedVec::Int32(vec![4, 6])]
    );
    assert!(first.format("GQ").is_none());
    let calls: Vec<String> = first.genotypes().iter().map(|g| g.to_string()).collect();
    assert_eq!(calls, vec!["0/1", "0|1"]);

    let second = &records[1];
    assert_eq!(second.qual(), None);
    assert_eq!(second.alleles().len(), 3);
    assert_eq!(second.info_keys(), vec!["AC", "AF", "AN"]);
    assert!(second.format("PL").is_none());
}

#[test]
fn test_run_writes_indexed_bcf() {
    let (_dir, output, summary) = run("out.bcf");
    assert_eq!(summary.written, 2);
    assert!(output.with_extension("bcf.csi").exists());

    let mut reader = bcf::Reader::from_path(&output).unwrap();
    assert_eq!(reader.records().count(), 2);
}

#[test]
fn test_run_plain_vcf_is_not_indexed() {
    let (dir, output, _summary) = run("out.vcf");
    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("##INFO=<ID=AF"));
    assert!(!text.contains("##INFO=<ID=MQ"));
    assert!(!text.contains("##FORMAT=<ID=PL"));
    assert_eq!(text.lines().filter(|l| !l.starts_with('#')).count(), 2);
    let indexes = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.ends_with(".tbi") || name.ends_with(".csi")
        })
        .count();
    assert_eq!(indexes, 0);
}

#[test]
fn test_format_fields_dropped_whatever_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("out.vcf");
    let mut params = Params::new(&input, &output, FileType::Snp);
    params.keep_fields.extend(["GQ".to_string(), "PL".to_string(), "MQ".to_string()]);
    let summary = filtersnp::run(&params).unwrap();
    assert_eq!(summary.written, 2);

    let text = fs::read_to_string(&output).unwrap();
    assert!(!text.contains("##FORMAT=<ID=GQ"));
    assert!(!text.contains("##FORMAT=<ID=PL"));
    assert!(text.contains("##INFO=<ID=MQ"));

    let records: Vec<_> = VariantReader::from_path(&output)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert!(records.iter().all(|r| r.format("GQ").is_none()));
    assert!(records.iter().all(|r| r.format("PL").is_none()));
    assert_eq!(records[0].info_keys(), vec!["AC", "AF", "AN", "DP", "MQ"]);
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let params = Params::new(
        dir.path().join("absent.vcf"),
        dir.path().join("out.vcf.gz"),
        FileType::Snp,
    );
    let err = filtersnp::run(&params).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to open input file"));
}
