//! Generate a synthetic subtitle snapshot for benchmarks and offline runs.
//!
//! The file uses the same `subtitles` schema as the published snapshot, so
//! the local pipeline opens it unchanged.
//!
//! Usage:
//!     cargo run --release --bin generate-bench-db -- --rows 200000 [output_path]
//!
//! Default output: benches/synthetic_subtitles.db

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use vvsearch::{SubtitleDatabase, SubtitleRecord};

/// Rows are inserted in batches of this size, one transaction each.
const BATCH_SIZE: usize = 5_000;

/// Episode titles; `[P07]` style tags drive link resolution.
const SERIES_TITLES: &[&str] = &[
    "深夜闲聊",
    "游戏实况",
    "周末杂谈",
    "观众来信",
    "新年特别篇",
];

/// Phrases the bench queries hit.
const PHRASES: &[&str] = &[
    "你好",
    "今天天气不错",
    "我们开始吧",
    "这个真的好难",
    "谢谢大家",
    "下次再见",
    "等一下",
    "哈哈哈哈",
    "不是吧",
    "好的没问题",
];

/// Filler characters for the rest of each line.
const FILLER: &[char] = &[
    '的', '一', '是', '了', '我', '不', '人', '在', '他', '有', '这', '个', '上', '们', '来', '到',
    '时', '大', '地', '为', '子', '中', '你', '说', '生', '国', '年', '着', '就', '那', '和', '要',
];

#[derive(Parser)]
#[command(about = "Generate a synthetic subtitle snapshot")]
struct Args {
    /// Output path (replaced if it exists)
    output: Option<PathBuf>,

    /// Number of subtitle rows
    #[arg(long, default_value_t = 100_000)]
    rows: usize,

    /// Number of distinct episodes
    #[arg(long, default_value_t = 120)]
    episodes: usize,
}

fn generate_line(rng: &mut impl Rng) -> String {
    let mut line = String::new();
    let filler_len = rng.gen_range(4..=24);
    for _ in 0..filler_len {
        line.push(FILLER[rng.gen_range(0..FILLER.len())]);
    }

    // Occasionally embed a searchable phrase
    if rng.gen_bool(0.25) {
        let phrase = PHRASES[rng.gen_range(0..PHRASES.len())];
        let at = rng.gen_range(0..=line.chars().count());
        let byte_at = line.char_indices().nth(at).map_or(line.len(), |(i, _)| i);
        line.insert_str(byte_at, phrase);
    }
    line
}

fn generate_record(rng: &mut impl Rng, episodes: usize) -> SubtitleRecord {
    let episode = rng.gen_range(1..=episodes.max(1));
    let title = SERIES_TITLES[rng.gen_range(0..SERIES_TITLES.len())];
    let seconds: u32 = rng.gen_range(0..3 * 3600);
    SubtitleRecord::new(
        format!("[P{episode:02}] {title}"),
        format!("{}m{}s", seconds / 60, seconds % 60),
        rng.gen_range(0.0..1.0),
        generate_line(rng),
    )
}

fn main() -> Result<()> {
    let args = Args::parse();

    let output_path = args.output.unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("benches")
            .join("synthetic_subtitles.db")
    });

    // Remove existing file
    if output_path.exists() {
        std::fs::remove_file(&output_path)
            .with_context(|| format!("failed to remove {}", output_path.display()))?;
    }
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create output directory")?;
    }

    println!("Generating synthetic subtitle snapshot...");
    println!("Output: {}", output_path.display());

    let db = SubtitleDatabase::create(&output_path).context("failed to create database")?;
    let mut rng = rand::thread_rng();

    let mut written = 0;
    while written < args.rows {
        let batch_len = BATCH_SIZE.min(args.rows - written);
        let batch: Vec<SubtitleRecord> = (0..batch_len)
            .map(|_| generate_record(&mut rng, args.episodes))
            .collect();
        written += db.insert_records(&batch).context("failed to insert rows")?;
        println!("  Generated {}/{} rows...", written, args.rows);
    }

    println!();
    println!("Database created: {}", output_path.display());
    println!("  Rows: {}", db.count()?);
    println!("  Episodes: {}", args.episodes);
    Ok(())
}
