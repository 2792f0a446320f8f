use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use popvcf::config::Config;
use popvcf::io::vcf::{VcfReader, VcfWriter};
use popvcf::pipelines;

// --- Helpers ---

const MISSING_ALLELE: u8 = 255;
const IMPUTED_TOKEN: &str = "99";

struct SyntheticVcfBuilder {
    n_markers: usize,
    n_samples: usize,
    n_chroms: usize,
    is_phased: bool,
    allele_generator: Box<dyn Fn(usize, usize) -> u8>, // (marker_idx, hap_idx) -> allele
    positions: Option<Vec<usize>>,
    ref_bases: &'static str,
    imputed_every: Option<usize>,
}

impl SyntheticVcfBuilder {
    fn new(n_markers: usize, n_samples: usize) -> Self {
        Self {
            n_markers,
            n_samples,
            n_chroms: 1,
            is_phased: false,
            allele_generator: Box::new(|_, _| 0),
            positions: None,
            ref_bases: "A",
            imputed_every: None,
        }
    }

    fn positions(mut self, positions: Vec<usize>) -> Self {
        self.positions = Some(positions);
        self
    }

    /// REF of marker m is `bases[m % len]`
    fn ref_bases(mut self, bases: &'static str) -> Self {
        self.ref_bases = bases;
        self
    }

    /// First allele of the first sample is the imputed token on every n-th marker
    fn imputed_every(mut self, n: usize) -> Self {
        self.imputed_every = Some(n);
        self
    }

    fn allele_generator(mut self, generator: impl Fn(usize, usize) -> u8 + 'static) -> Self {
        self.allele_generator = Box::new(generator);
        self
    }

    /// Seeded random 0/1 alleles, each missing with probability `missing_rate`
    fn random(self, seed: u64, missing_rate: f64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let n_haps = self.n_samples * 2;
        let matrix: Vec<Vec<u8>> = (0..self.n_markers)
            .map(|_| {
                (0..n_haps)
                    .map(|_| {
                        if rng.random_bool(missing_rate) {
                            MISSING_ALLELE
                        } else {
                            rng.random_range(0..2u8)
                        }
                    })
                    .collect()
            })
            .collect();
        self.allele_generator(move |m, h| matrix[m][h])
    }

    /// Spread the markers over `chr1..chrN` in contiguous blocks
    fn chromosomes(mut self, n_chroms: usize) -> Self {
        self.n_chroms = n_chroms;
        self
    }

    fn phased(mut self) -> Self {
        self.is_phased = true;
        self
    }

    fn sample_ids(&self) -> Vec<String> {
        (0..self.n_samples).map(|i| format!("Sample{}", i)).collect()
    }

    fn chrom_of(&self, m: usize) -> usize {
        let per_chrom = self.n_markers.div_ceil(self.n_chroms);
        m / per_chrom + 1
    }

    fn build(&self, path: &Path) {
        let mut file = fs::File::create(path).expect("Create VCF");
        writeln!(file, "##fileformat=VCFv4.2").unwrap();
        writeln!(file, "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">").unwrap();
        for c in 1..=self.n_chroms {
            writeln!(file, "##contig=<ID=chr{},length=1000000>", c).unwrap();
        }
        write!(file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT").unwrap();
        for id in self.sample_ids() {
            write!(file, "\t{}", id).unwrap();
        }
        writeln!(file).unwrap();

        let sep = if self.is_phased { "|" } else { "/" };
        let ref_bases: Vec<char> = self.ref_bases.chars().collect();
        for m in 0..self.n_markers {
            let pos = match &self.positions {
                Some(positions) if m < positions.len() => positions[m],
                _ => m * 10 + 1,
            };
            let ref_base = ref_bases[m % ref_bases.len()];
            write!(file, "chr{}\t{}\trs{}\t{}\tT\t.\tPASS\t.\tGT", self.chrom_of(m), pos, m, ref_base).unwrap();
            let imputed_marker = self.imputed_every.is_some_and(|n| m % n == 0);
            for s in 0..self.n_samples {
                let alleles: Vec<String> = (0..2)
                    .map(|p| match (self.allele_generator)(m, s * 2 + p) {
                        _ if imputed_marker && s == 0 && p == 0 => IMPUTED_TOKEN.to_string(),
                        MISSING_ALLELE => ".".to_string(),
                        a => a.to_string(),
                    })
                    .collect();
                write!(file, "\t{}", alleles.join(sep)).unwrap();
            }
            writeln!(file).unwrap();
        }
    }

    /// Sample file registering every sample as an adult of species Sp1
    fn build_samples(&self, path: &Path) {
        let rows: Vec<String> = self.sample_ids().iter().map(|id| format!("{};Sp1;NONE\n", id)).collect();
        fs::write(path, rows.concat()).expect("Write sample file");
    }
}

fn run_cli(args: &[String]) -> popvcf::Result<()> {
    let config = Config::parse_from_args(std::iter::once("popvcf".to_string()).chain(args.iter().cloned()))?;
    pipelines::run(config)
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn path_str(path: &Path) -> String {
    path.to_str().expect("utf-8 temp path").to_string()
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Create temp dir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn arg(&self, name: &str) -> String {
        path_str(&self.path(name))
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("Read output")
    }
}

fn data_lines(vcf: &str) -> Vec<Vec<String>> {
    vcf.lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| l.split('\t').map(str::to_string).collect())
        .collect()
}

/// Most frequent fully observed GT string, first seen on ties
fn expected_mode(gts: &[String]) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for gt in gts.iter().filter(|gt| !gt.contains('.')) {
        match counts.iter_mut().find(|(seen, _)| seen == gt) {
            Some((_, n)) => *n += 1,
            None => counts.push((gt.clone(), 1)),
        }
    }
    let mut best: Option<(String, usize)> = None;
    for (gt, n) in counts {
        if best.as_ref().map_or(true, |(_, b)| n > *b) {
            best = Some((gt, n));
        }
    }
    best.map(|(gt, _)| gt)
}

// --- Text and VCF I/O ---

#[test]
fn test_identity_round_trip_plain_and_gzip() {
    let ws = Workspace::new();
    let builder = SyntheticVcfBuilder::new(40, 6).random(7, 0.1).phased();
    builder.build(&ws.path("in.vcf"));

    for out_name in ["copy.vcf", "copy.vcf.gz"] {
        let mut reader = VcfReader::open(&ws.path("in.vcf")).unwrap();
        let mut writer = VcfWriter::create(&ws.path(out_name)).unwrap();
        while let Some(line) = reader.next_line().unwrap() {
            writer.write(&line).unwrap();
        }
        writer.finish().unwrap();
    }

    let original = fs::read(ws.path("in.vcf")).unwrap();
    assert_eq!(fs::read(ws.path("copy.vcf")).unwrap(), original);

    let mut decoded = Vec::new();
    MultiGzDecoder::new(fs::File::open(ws.path("copy.vcf.gz")).unwrap())
        .read_to_end(&mut decoded)
        .unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_latin1_bytes_survive() {
    let ws = Workspace::new();
    let mut content = b"##comment=caf".to_vec();
    content.push(0xE9);
    content.extend_from_slice(b"\r\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\r\n");
    content.extend_from_slice(b"chr1\t5\t.\tA\tG\t.\t.\t.\tGT\t0/1\r\n");
    fs::write(ws.path("in.vcf"), &content).unwrap();

    let mut reader = VcfReader::open(&ws.path("in.vcf")).unwrap();
    let mut writer = VcfWriter::create(&ws.path("out.vcf")).unwrap();
    while let Some(line) = reader.next_line().unwrap() {
        writer.write(&line).unwrap();
    }
    writer.finish().unwrap();

    let expected: Vec<u8> = content.iter().copied().filter(|&b| b != b'\r').collect();
    assert_eq!(fs::read(ws.path("out.vcf")).unwrap(), expected);
}

// --- Naive imputation ---

fn impute(ws: &Workspace, vcf: &str, out: &str, sidecar: &str, threads: usize) -> popvcf::Result<()> {
    run_cli(&args(&[
        "impute-naive",
        "--vcf",
        &ws.arg(vcf),
        "--out",
        &ws.arg(out),
        "--sidecar",
        &ws.arg(sidecar),
        "--threads",
        &threads.to_string(),
    ]))
}

#[test]
fn test_naive_imputation_is_sound_and_order_preserving() {
    let ws = Workspace::new();
    let builder = SyntheticVcfBuilder::new(300, 12).random(42, 0.15);
    builder.build(&ws.path("in.vcf"));
    impute(&ws, "in.vcf", "out.vcf", "sidecar.csv", 2).unwrap();

    let input = data_lines(&ws.read("in.vcf"));
    let output = data_lines(&ws.read("out.vcf"));
    assert_eq!(input.len(), output.len());

    let mut imputed_records = 0;
    for (before, after) in input.iter().zip(&output) {
        assert_eq!(before.len(), after.len(), "sample count changed");
        assert_eq!(before[..9], after[..9], "record order or fixed columns changed");

        let mode = expected_mode(&before[9..]);
        let mut changed = false;
        for (b, a) in before[9..].iter().zip(&after[9..]) {
            match (&mode, b.contains('.')) {
                (Some(mode), true) => {
                    assert_eq!(a, mode);
                    changed = true;
                }
                _ => assert_eq!(a, b),
            }
        }
        if changed {
            imputed_records += 1;
        }
    }

    let sidecar = ws.read("sidecar.csv");
    let mut lines = sidecar.lines();
    assert_eq!(lines.next(), Some("chrom;pos;ref;alt;samples_with_md;symbolic_genotypes"));
    assert_eq!(lines.count(), imputed_records);
}

#[test]
fn test_naive_imputation_matches_across_thread_counts() {
    let ws = Workspace::new();
    SyntheticVcfBuilder::new(500, 20).random(2024, 0.2).build(&ws.path("in.vcf"));

    impute(&ws, "in.vcf", "one.vcf", "one.csv", 1).unwrap();
    for threads in [2, 4, 8] {
        impute(&ws, "in.vcf", "many.vcf", "many.csv", threads).unwrap();
        assert_eq!(ws.read("many.vcf"), ws.read("one.vcf"), "threads = {}", threads);
        assert_eq!(ws.read("many.csv"), ws.read("one.csv"), "threads = {}", threads);
    }
}

#[test]
fn test_naive_imputation_scenario() {
    let ws = Workspace::new();
    fs::write(
        ws.path("in.vcf"),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2\ts3\ts4\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/0\t0/1\t./.\t0/0\n",
    )
    .unwrap();
    impute(&ws, "in.vcf", "out.vcf", "side.csv", 0).unwrap();
    assert_eq!(
        ws.read("out.vcf"),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2\ts3\ts4\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/0\t0/1\t0/0\t0/0\n"
    );
    assert!(ws.read("side.csv").ends_with("chr1;100;A;G;2;ARAA\n"));
}

// --- Collapse ---

#[test]
fn test_collapse_scenario_and_length_law() {
    let ws = Workspace::new();
    fs::write(ws.path("samples.csv"), "ad;Sp1;NONE\nkid;Sp2;ad\n").unwrap();
    fs::write(
        ws.path("in.vcf"),
        "##fileformat=VCFv4.2\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tad\tkid\n\
chr2\t10\t.\tA\tC\t.\tPASS\t.\tGT\t99/99\t0/0\n\
chr2\t11\t.\tT\t.\t.\tPASS\t.\tGT\t0/0\t0/1\n\
chr2\t20\t.\tG\tC\t.\tPASS\t.\tGT\t0/0\t99/99\n",
    )
    .unwrap();
    run_cli(&args(&[
        "collapse",
        "--vcf",
        &ws.arg("in.vcf"),
        "--samples",
        &ws.arg("samples.csv"),
        "--sp1",
        "Sp1",
        "--sp2",
        "Sp2",
        "--out",
        &ws.arg("out.vcf"),
        "--stats",
        &ws.arg("stats.csv"),
    ]))
    .unwrap();

    let records = data_lines(&ws.read("out.vcf"));
    assert_eq!(records.len(), 2);
    assert_eq!(records[0][3], "AT");
    assert_eq!(records[0][4], ".");

    let stats = ws.read("stats.csv");
    let rows: Vec<Vec<&str>> = stats.lines().skip(1).map(|l| l.split(';').collect()).collect();
    assert_eq!(rows.len(), records.len());
    let grouped: usize = rows.iter().map(|r| r[2].parse::<usize>().unwrap()).sum();
    assert_eq!(grouped, 3);
    assert_eq!(rows[0][4], "IMPUTED");
}

#[test]
fn test_collapse_groups_account_for_every_record() {
    let ws = Workspace::new();
    // runs of seven consecutive positions separated by gaps of three
    let positions: Vec<usize> = (0..120).map(|m| m + 1 + (m / 7) * 3).collect();
    let builder = SyntheticVcfBuilder::new(120, 5)
        .random(11, 0.05)
        .chromosomes(3)
        .positions(positions)
        .ref_bases("ACGTG")
        .imputed_every(3);
    builder.build(&ws.path("in.vcf"));
    builder.build_samples(&ws.path("samples.csv"));
    run_cli(&args(&[
        "collapse",
        "--vcf",
        &ws.arg("in.vcf"),
        "--samples",
        &ws.arg("samples.csv"),
        "--sp1",
        "Sp1",
        "--sp2",
        "Sp2",
        "--out",
        &ws.arg("out.vcf"),
        "--stats",
        &ws.arg("stats.csv"),
    ]))
    .unwrap();

    let input = data_lines(&ws.read("in.vcf"));
    let output = data_lines(&ws.read("out.vcf"));
    let stats = ws.read("stats.csv");
    let rows: Vec<Vec<&str>> = stats.lines().skip(1).map(|l| l.split(';').collect()).collect();
    assert_eq!(rows.len(), output.len());

    let mut next = 0;
    let mut multi_record_groups = 0;
    for (row, fused) in rows.iter().zip(&output) {
        let count: usize = row[2].parse().unwrap();
        let members = &input[next..next + count];
        next += count;

        let start: usize = members[0][1].parse().unwrap();
        for (i, member) in members.iter().enumerate() {
            assert_eq!(member[0], members[0][0], "group spans sequences");
            assert_eq!(member[1].parse::<usize>().unwrap(), start + i, "group has a gap");
        }
        let member_refs: String = members.iter().map(|r| r[3].as_str()).collect();
        assert_eq!(fused[0], members[0][0]);
        assert_eq!(fused[1], members[0][1]);
        assert_eq!(fused[3], member_refs);
        assert_eq!(row[3].parse::<usize>().unwrap(), member_refs.len());
        if count > 1 {
            multi_record_groups += 1;
        }
    }
    assert_eq!(next, 120);
    assert!(multi_record_groups > 0);
}

// --- Structure ---

fn structure(ws: &Workspace, format: &str, out: &str) -> popvcf::Result<()> {
    run_cli(&args(&[
        "to-structure",
        "--vcf",
        &ws.arg("in.vcf"),
        "--samples",
        &ws.arg("samples.csv"),
        "--sp1",
        "Sp1",
        "--sp2",
        "Sp2",
        "--format",
        format,
        "--out",
        &ws.arg(out),
    ]))
}

#[test]
fn test_structure_shapes_and_pivot() {
    let ws = Workspace::new();
    let builder = SyntheticVcfBuilder::new(25, 7).random(5, 0.1);
    builder.build(&ws.path("in.vcf"));
    builder.build_samples(&ws.path("samples.csv"));

    structure(&ws, "1", "two_line.tsv").unwrap();
    let two_line = ws.read("two_line.tsv");
    let rows: Vec<Vec<&str>> = two_line.lines().map(|l| l.split('\t').collect()).collect();
    assert_eq!(rows.len(), 1 + 2 * 7);
    assert!(rows.iter().all(|r| r.len() == 2 + 25));
    assert_eq!(rows[1][0], rows[2][0]);

    structure(&ws, "2", "one_line.tsv").unwrap();
    let one_line = ws.read("one_line.tsv");
    let rows: Vec<Vec<&str>> = one_line.lines().map(|l| l.split('\t').collect()).collect();
    assert_eq!(rows.len(), 1 + 7);
    assert!(rows.iter().all(|r| r.len() == 2 + 2 * 25));

    run_cli(&args(&["pivot-structure", "--in", &ws.arg("two_line.tsv"), "--out", &ws.arg("pivot.tsv")])).unwrap();
    assert_eq!(ws.read("pivot.tsv"), one_line);
}

#[test]
fn test_structure_two_line_scenario() {
    let ws = Workspace::new();
    fs::write(ws.path("samples.csv"), "sid;Sp1;NONE\n").unwrap();
    fs::write(
        ws.path("in.vcf"),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsid\n\
chr1\t100\t.\tA\tG\t.\t.\t.\tGT\t0/1\n",
    )
    .unwrap();
    structure(&ws, "1", "out.tsv").unwrap();
    assert_eq!(ws.read("out.tsv"), "sample_id\tspecies_id\tchr1-100\nsid\t1\t0\nsid\t1\t1\n");
}

#[test]
fn test_structure_unknown_sample_exit_code() {
    let ws = Workspace::new();
    fs::write(ws.path("samples.csv"), "other;Sp1;NONE\n").unwrap();
    SyntheticVcfBuilder::new(2, 1).build(&ws.path("in.vcf"));
    let err = structure(&ws, "1", "out.tsv").unwrap_err();
    assert_eq!(err.code(), "L002");
    assert_eq!(err.exit_code(), 3);
}

// --- fastPHASE ---

/// Stand-in for a fastPHASE run: every unknown allele becomes code 2 (T)
fn fake_fastphase_result(input: &str) -> String {
    let mut out = String::from("fastPHASE output\nBEGIN GENOTYPES\n");
    for line in input.lines().skip(4) {
        let line: Vec<&str> = line
            .split(' ')
            .map(|c| if c == "?" || c == "-1" { "2" } else { c })
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out.push_str("END GENOTYPES\n");
    out
}

#[test]
fn test_fastphase_partitioning_and_update() {
    let ws = Workspace::new();
    let builder = SyntheticVcfBuilder::new(60, 4).random(99, 0.2).chromosomes(3);
    builder.build(&ws.path("in.vcf"));
    fs::create_dir(ws.path("fp")).unwrap();

    run_cli(&args(&["to-fastphase", "--vcf", &ws.arg("in.vcf"), "--out-dir", &ws.arg("fp")])).unwrap();

    let mut total_markers = 0;
    for c in 1..=3 {
        let input = ws.read(&format!("fp/chr{}.fastphase.inp", c));
        let mut lines = input.lines();
        assert_eq!(lines.next(), Some("4"));
        let m: usize = lines.next().unwrap().parse().unwrap();
        assert_eq!(lines.next().unwrap().split(' ').count(), m + 1);
        assert_eq!(lines.next().unwrap().len(), m);
        assert_eq!(lines.count(), 4 * 3);
        total_markers += m;

        fs::write(
            ws.path(&format!("fp/chr{}_hapguess_switch.out", c)),
            fake_fastphase_result(&input),
        )
        .unwrap();
    }
    assert_eq!(total_markers, 60);

    run_cli(&args(&[
        "update-fastphase",
        "--vcf",
        &ws.arg("in.vcf"),
        "--fastphase-dir",
        &ws.arg("fp"),
        "--out",
        &ws.arg("updated.vcf"),
    ]))
    .unwrap();

    let before = data_lines(&ws.read("in.vcf"));
    let after = data_lines(&ws.read("updated.vcf"));
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        for (gb, ga) in b[9..].iter().zip(&a[9..]) {
            assert!(!ga.contains('.'));
            if !gb.contains('.') {
                assert_eq!(ga, gb);
            }
        }
    }
}

#[test]
fn test_fastphase_missing_codes_scenario() {
    let ws = Workspace::new();
    fs::write(
        ws.path("in.vcf"),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\n\
chrA\t3\t.\tA\tG\t.\t.\t.\tGT\t./0\n\
chrA\t8\t.\tA\tG,C\t.\t.\t.\tGT\t2/.\n",
    )
    .unwrap();
    run_cli(&args(&["to-fastphase", "--vcf", &ws.arg("in.vcf"), "--out-dir", &ws.arg("")])).unwrap();
    assert_eq!(ws.read("chrA.fastphase.inp"), "1\n2\nP 3 8\nSM\n# s1\n? 3\n1 -1\n");
}

// --- External results ---

#[test]
fn test_rmatrix_disjoint_merge() {
    let ws = Workspace::new();
    fs::write(
        ws.path("in.vcf"),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2\n\
chr1\t10\t.\tA\tG\t.\t.\t.\tGT\t./.\t0/1\n\
chr1\t15\t.\tA\tG,T\t.\t.\t.\tGT\t./.\t2|.\n\
chr1\t20\t.\tA\tG\t.\t.\t.\tGT\t./.\t./.\n\
chr1\t30\t.\tA\tG\t.\t.\t.\tGT\t0|.\t1/1\n",
    )
    .unwrap();
    fs::write(ws.path("dosage.txt"), "\"\" \"s2\" \"s1\"\n\"chr1-20\" 1 2\n\"chr1-30\" 0 0\n\"chr1-40\" 2 2\n").unwrap();
    run_cli(&args(&[
        "update-rmatrix",
        "--vcf",
        &ws.arg("in.vcf"),
        "--matrix",
        &ws.arg("dosage.txt"),
        "--out",
        &ws.arg("out.vcf"),
    ]))
    .unwrap();

    let out = ws.read("out.vcf");
    let records = data_lines(&out);
    assert_eq!(records[0][9..], ["./.", "0/1"]);
    // multiallelic and absent from the matrix: passes through untouched
    assert_eq!(out.lines().nth(2), Some("chr1\t15\t.\tA\tG,T\t.\t.\t.\tGT\t./.\t2|."));
    assert_eq!(records[2][9..], ["1/1", "0/1"]);
    assert_eq!(records[3][9..], ["0|0", "1/1"]);
}

#[test]
fn test_mach_update() {
    let ws = Workspace::new();
    fs::write(
        ws.path("in.vcf"),
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2\n\
chr1\t10\t.\tA\tG\t.\t.\t.\tGT\t./.\t0/0\n\
chr1\t20\t.\tC\tT\t.\t.\t.\tGT\t1/1\t.|.\n",
    )
    .unwrap();
    fs::write(ws.path("markers.txt"), "SNP\nchr1-10\nchr1-20\n").unwrap();
    fs::write(ws.path("haps.txt"), "F->s2 HAPLO1 AC\nF->s2 HAPLO2 AT\nF->s1 HAPLO1 GC\nF->s1 HAPLO2 AT\n").unwrap();
    run_cli(&args(&[
        "update-mach",
        "--vcf",
        &ws.arg("in.vcf"),
        "--haps",
        &ws.arg("haps.txt"),
        "--listing",
        &ws.arg("markers.txt"),
        "--out",
        &ws.arg("out.vcf"),
    ]))
    .unwrap();

    let records = data_lines(&ws.read("out.vcf"));
    assert_eq!(records[0][9..], ["0/1", "0/0"]);
    assert_eq!(records[1][9..], ["1/1", "0|1"]);
}

// --- Tabular ---

#[test]
fn test_tabular_round_trip() {
    let ws = Workspace::new();
    SyntheticVcfBuilder::new(30, 6).random(3, 0.1).build(&ws.path("in.vcf"));

    run_cli(&args(&["to-tabular", "--vcf", &ws.arg("in.vcf"), "--out", &ws.arg("a.tab")])).unwrap();
    run_cli(&args(&["from-tabular", "--in", &ws.arg("a.tab"), "--out", &ws.arg("b.vcf")])).unwrap();
    run_cli(&args(&["to-tabular", "--vcf", &ws.arg("b.vcf"), "--out", &ws.arg("b.tab")])).unwrap();

    assert_eq!(ws.read("b.tab"), ws.read("a.tab"));
    let table = ws.read("a.tab");
    assert_eq!(table.lines().count(), 1 + 6);
    assert_eq!(data_lines(&ws.read("b.vcf")).len(), 30);
}

#[test]
fn test_tabular_triallelic_rejected() {
    let ws = Workspace::new();
    fs::write(ws.path("in.tab"), "ID/SNP\tchr3-7\tchr3-7\ns1\tA\tC\ns2\tG\tA\n").unwrap();
    let err = run_cli(&args(&["from-tabular", "--in", &ws.arg("in.tab"), "--out", &ws.arg("out.vcf")])).unwrap_err();
    assert_eq!(err.code(), "L021");
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("chr3-7"));
}

// --- Extraction ---

#[test]
fn test_extract_ids_from_gzipped_fasta() {
    let ws = Workspace::new();
    let mut encoder = GzEncoder::new(fs::File::create(ws.path("genome.fa.gz")).unwrap(), Compression::default());
    encoder.write_all(b">chr1 main\nACGT\nAC\n>scaffold_7\nGGGG\n>chrM\nTT\n").unwrap();
    encoder.finish().unwrap();
    fs::write(ws.path("ids.txt"), "chr1\n\nchrM\n").unwrap();

    run_cli(&args(&[
        "extract-ids",
        "--in",
        &ws.arg("genome.fa.gz"),
        "--ids",
        &ws.arg("ids.txt"),
        "--out",
        &ws.arg("subset.fa"),
    ]))
    .unwrap();
    assert_eq!(ws.read("subset.fa"), ">chr1 main\nACGT\nAC\n>chrM\nTT\n");
}

#[test]
fn test_extract_ids_from_vcf_by_pattern() {
    let ws = Workspace::new();
    let builder = SyntheticVcfBuilder::new(30, 2).chromosomes(3);
    builder.build(&ws.path("in.vcf"));
    fs::write(ws.path("ids.txt"), "^chr[13]$\n").unwrap();

    run_cli(&args(&[
        "extract-ids",
        "--in",
        &ws.arg("in.vcf"),
        "--ids",
        &ws.arg("ids.txt"),
        "--regex",
        "--out",
        &ws.arg("out.vcf"),
    ]))
    .unwrap();

    let out = ws.read("out.vcf");
    let chroms: HashSet<String> = data_lines(&out).into_iter().map(|r| r[0].clone()).collect();
    assert_eq!(chroms, ["chr1", "chr3"].iter().map(|s| s.to_string()).collect());
    assert!(!out.contains("##contig=<ID=chr2,"));
    assert_eq!(data_lines(&out).len(), 20);
}

// --- CLI ---

#[test]
fn test_argument_errors_are_p001() {
    let err = run_cli(&args(&[
        "collapse", "--vcf", "x.vcf", "--samples", "s.csv", "--sp1", "A", "--sp2", "A", "--out", "o", "--stats", "s",
    ]))
    .unwrap_err();
    assert_eq!(err.code(), "P001");
    assert_eq!(err.exit_code(), 1);

    let err = run_cli(&args(&["impute-naive", "--vcf", "x.vcf"])).unwrap_err();
    assert_eq!(err.code(), "P001");
}

#[test]
fn test_missing_input_is_f001() {
    let ws = Workspace::new();
    let err = impute(&ws, "absent.vcf", "out.vcf", "side.csv", 1).unwrap_err();
    assert_eq!(err.code(), "F001");
    assert_eq!(err.exit_code(), 3);
}
