use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pathfuzz_core::{
    match_candidates, walk_source, HighlightMode, IterSource, MatchMode, MatchOptions, MatchOutput,
    MatchStats, PathScorer, SourceError,
};
use serde::Serialize;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "pathfuzz", version, about = "模糊路径匹配")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 对候选路径做模糊匹配，按名次输出
    Match {
        /// 查询串
        #[arg(long, short)]
        query: String,

        /// 候选来源目录；缺省时从 stdin 逐行读取
        #[arg(long)]
        root: Option<PathBuf>,

        /// 配置文件（TOML），命令行参数覆盖其中的值
        #[arg(long)]
        config: Option<PathBuf>,

        /// 最多输出条数（0 = 不限）
        #[arg(long)]
        limit: Option<usize>,

        /// 线程数（"auto" = CPU 核心数）
        #[arg(long, value_parser = parse_threads)]
        threads: Option<usize>,

        /// 匹配范围：full-line / filename-only / first-non-tab / until-last-tab
        #[arg(long)]
        mode: Option<String>,

        /// 高亮模式：none / basic / detailed
        #[arg(long)]
        highlight: Option<String>,

        /// 当前文件（用于路径距离打分）
        #[arg(long)]
        crfile: Option<String>,

        /// 允许当前文件本身出现在结果中
        #[arg(long)]
        match_crfile: bool,

        /// 候选不是路径
        #[arg(long)]
        not_path: bool,

        /// 查询反转分隔符（单个字符）
        #[arg(long)]
        invert_delim: Option<String>,

        /// 以 JSON 输出结果、高亮与统计
        #[arg(long)]
        json: bool,
    },
}

/// JSON 输出结构
#[derive(Serialize)]
struct JsonOutput<'a> {
    items: &'a [String],
    highlights: &'a [pathfuzz_core::Highlight],
    stats: &'a MatchStats,
}

fn main() -> Result<()> {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Match {
            query,
            root,
            config,
            limit,
            threads,
            mode,
            highlight,
            crfile,
            match_crfile,
            not_path,
            invert_delim,
            json,
        } => {
            // 先读配置文件，再用命令行参数覆盖
            let mut opts = match &config {
                Some(path) => MatchOptions::from_toml_file(path).context("load config")?,
                None => MatchOptions::default(),
            };
            if let Some(limit) = limit {
                opts.limit = limit;
            }
            if let Some(threads) = threads {
                opts.max_threads = threads;
            }
            if let Some(mode) = mode {
                opts.match_mode = mode.parse::<MatchMode>()?;
            }
            if let Some(highlight) = highlight {
                opts.highlight_mode = highlight.parse::<HighlightMode>()?;
            }
            if let Some(crfile) = crfile {
                opts.cur_file = crfile;
            }
            opts.match_crfile |= match_crfile;
            if not_path {
                opts.is_path = false;
            }
            if invert_delim.is_some() {
                opts.query_inverting_delimiter = invert_delim;
            }

            info!(?root, query = %query, limit = opts.limit, "starting match");
            let scorer = PathScorer::new(&opts);
            let out = match &root {
                Some(dir) => match_candidates(walk_source(dir), &scorer, &query, &opts),
                None => {
                    let lines = BufReader::new(io::stdin())
                        .lines()
                        .map(|line| line.map_err(|e| SourceError::new(format!("read stdin: {e}"))));
                    match_candidates(IterSource::new(lines), &scorer, &query, &opts)
                }
            }
            .context("match failed")?;

            let stdout = io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            write_output(&mut w, &out, &opts, json)?;
            w.flush().ok();

            info!(
                candidates_seen = out.stats.candidates_seen,
                matched = out.stats.matched,
                returned = out.stats.returned,
                "match finished"
            );
        }
    }

    Ok(())
}

fn write_output(
    w: &mut dyn Write,
    out: &MatchOutput<String>,
    opts: &MatchOptions,
    json: bool,
) -> Result<()> {
    if json {
        let doc = JsonOutput { items: &out.items, highlights: &out.highlights, stats: &out.stats };
        serde_json::to_writer(&mut *w, &doc).context("write json")?;
        writeln!(w)?;
        return Ok(());
    }
    for (i, item) in out.items.iter().enumerate() {
        match out.highlights.get(i) {
            Some(hl) if !hl.positions.is_empty() => {
                // 位置相对作用域子串时先换算回整行
                let base = if opts.highlight_scoped {
                    0
                } else {
                    opts.match_mode.apply(item).char_offset(item)
                };
                let marked: String = item
                    .chars()
                    .enumerate()
                    .map(|(ci, ch)| {
                        if ci >= base && hl.positions.binary_search(&(ci - base)).is_ok() {
                            ch.to_uppercase().collect::<String>()
                        } else {
                            ch.to_string()
                        }
                    })
                    .collect();
                writeln!(w, "{item}\t{marked}")?;
            }
            _ => writeln!(w, "{item}")?,
        }
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug；日志写 stderr，stdout 只留结果
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数："auto" 为 0（自动），否则为具体上限；非法值由 clap 报错
fn parse_threads(s: &str) -> Result<usize, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(0);
    }
    s.parse::<usize>().map_err(|_| format!("expected \"auto\" or a thread count, got '{s}'"))
}
