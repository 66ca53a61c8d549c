use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use linguacat_catalog::{
    Catalog, CatalogStats, CatalogStore, LinguistPluralRules, LookupOptions, MissingKey,
    StoreConfig,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Number of missing keys listed per catalog before summarizing.
const MISSING_PREVIEW: usize = 5;

#[derive(Parser)]
#[command(
    name = "linguacat",
    about = "Validate, inspect and merge Qt Linguist translation catalogs",
    author,
    version
)]
struct Cli {
    /// 提高紀錄詳細程度（可重複）。 / Increase log verbosity (repeatable).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 驗證語系目錄並比對覆蓋率。 / Validate catalogs and compare coverage with a reference.
    Check(CheckArgs),
    /// 顯示合併後目錄的統計。 / Print statistics for the merged catalogs.
    Stats(StatsArgs),
    /// 查詢單一訊息的翻譯。 / Look up the translation of one message.
    Lookup(LookupArgs),
    /// 解析並重新輸出 TS 檔案。 / Parse a catalog and write it back in canonical layout.
    Normalize(NormalizeArgs),
    /// 以後者優先合併多個目錄。 / Merge catalogs, later files overriding earlier ones.
    Merge(MergeArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// TS 檔案或包含 TS 檔案的資料夾。 / Catalog files or directories containing `.ts` files.
    #[arg(required = true, value_name = "PATH")]
    inputs: Vec<PathBuf>,
    /// 用於比對缺少鍵的參考目錄。 / Reference catalog used to report missing keys.
    #[arg(long, value_name = "FILE")]
    reference: Option<PathBuf>,
    /// 有缺少鍵時使程序失敗。 / Fail when a catalog is missing keys from the reference.
    #[arg(long, requires = "reference")]
    fail_on_missing: bool,
    /// 有未完成翻譯時使程序失敗。 / Fail when any catalog still has unfinished messages.
    #[arg(long)]
    fail_on_unfinished: bool,
}

#[derive(Args)]
struct StatsArgs {
    /// 依合併順序列出的 TS 檔案。 / Catalog files in merge order.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,
    /// 以 JSON 輸出。 / Emit JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct LookupArgs {
    /// 訊息所屬的 context。 / Context the message belongs to.
    #[arg(long)]
    context: String,
    /// 原文。 / Source text.
    #[arg(long)]
    source: String,
    /// 消歧義註解。 / Disambiguation comment.
    #[arg(long, value_name = "TEXT")]
    comment: Option<String>,
    /// 複數選擇用的數量。 / Count used to select the plural form.
    #[arg(long)]
    count: Option<u64>,
    /// 依序替換 %1..%9 的參數。 / Arguments substituted for %1..%9, in order.
    #[arg(long = "arg", value_name = "VALUE")]
    arguments: Vec<String>,
    /// 也查詢已廢棄的訊息。 / Also serve obsolete messages.
    #[arg(long)]
    include_obsolete: bool,
    /// 忽略未完成的翻譯。 / Ignore unfinished translations.
    #[arg(long)]
    exclude_unfinished: bool,
    /// 從設定檔讀取目錄清單。 / Read the catalog list from a store config file.
    #[arg(long, value_name = "FILE", conflicts_with = "inputs")]
    config: Option<PathBuf>,
    /// 依合併順序列出的 TS 檔案。 / Catalog files in merge order.
    #[arg(value_name = "FILE", required_unless_present = "config")]
    inputs: Vec<PathBuf>,
}

#[derive(Args)]
struct NormalizeArgs {
    /// 要重新輸出的 TS 檔案。 / Catalog to rewrite.
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// 輸出路徑；略過時寫到標準輸出。 / Output path; stdout when omitted.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct MergeArgs {
    /// 依合併順序列出的 TS 檔案。 / Catalog files in merge order.
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<PathBuf>,
    /// 合併結果的輸出路徑。 / Where to write the merged catalog.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli.command) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Check(args) => execute_check(args),
        Commands::Stats(args) => execute_stats(args),
        Commands::Lookup(args) => execute_lookup(args),
        Commands::Normalize(args) => execute_normalize(args),
        Commands::Merge(args) => execute_merge(args),
    }
}

fn execute_check(args: CheckArgs) -> Result<()> {
    let files = collect_catalog_files(&args.inputs);
    if files.is_empty() {
        bail!("no .ts files found");
    }

    let reference = args
        .reference
        .as_ref()
        .map(|path| {
            Catalog::load([path])
                .with_context(|| format!("load reference catalog {}", path.display()))
        })
        .transpose()?;

    println!("Checking {} catalog(s)", files.len());
    let mut failed = 0usize;
    let mut total_missing = 0usize;
    let mut total_unfinished = 0usize;
    for file in &files {
        let catalog = match Catalog::load([file]) {
            Ok(catalog) => catalog,
            Err(err) => {
                eprintln!(" ✗ {err}");
                failed += 1;
                continue;
            }
        };
        let stats = catalog.stats();
        total_unfinished += stats.unfinished;
        let mut line = format!(
            " - {} [{}]: {} messages ({} finished, {} unfinished, {} obsolete, {} numerus)",
            file.display(),
            stats.language,
            stats.messages,
            stats.finished,
            stats.unfinished,
            stats.obsolete,
            stats.numerus
        );

        let Some(reference) = reference.as_ref() else {
            println!("{line}");
            continue;
        };
        let missing = catalog.missing_keys(reference);
        if missing.is_empty() {
            println!("{line}");
            continue;
        }
        line.push_str(&format!(", missing {} key(s)", missing.len()));
        println!("{line}");
        print_missing(&missing);
        total_missing += missing.len();
    }

    if failed > 0 {
        bail!("{failed} catalog(s) failed to load");
    }
    if total_missing > 0 {
        eprintln!("Found {total_missing} missing key(s) relative to the reference catalog");
        if args.fail_on_missing {
            bail!("missing translation keys detected");
        }
    }
    if total_unfinished > 0 && args.fail_on_unfinished {
        bail!("{total_unfinished} unfinished translation(s) detected");
    }
    Ok(())
}

fn print_missing(missing: &[MissingKey]) {
    for key in missing.iter().take(MISSING_PREVIEW) {
        println!("     · {key}");
    }
    if missing.len() > MISSING_PREVIEW {
        println!("     · ... {} more", missing.len() - MISSING_PREVIEW);
    }
}

fn collect_catalog_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in inputs {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && is_catalog_file(entry.path()) {
                            files.push(entry.path().to_path_buf());
                        }
                    }
                    Err(err) => {
                        eprintln!("warning: {}: {}", path.display(), err);
                    }
                }
            }
        } else {
            eprintln!("warning: {} does not exist", path.display());
        }
    }
    debug!(count = files.len(), "collected catalog files");
    files
}

fn is_catalog_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("ts"))
}

fn load_merged(inputs: &[PathBuf]) -> Result<Catalog> {
    Catalog::load(inputs).with_context(|| format!("load {} catalog(s)", inputs.len()))
}

fn execute_stats(args: StatsArgs) -> Result<()> {
    let catalog = load_merged(&args.inputs)?;
    let stats = catalog.stats();
    if args.json {
        let json = serde_json::to_string_pretty(&stats).context("serialize statistics")?;
        println!("{json}");
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn print_stats(stats: &CatalogStats) {
    println!("Language: {} ({} plural form(s))", stats.language, stats.plural_forms);
    println!("Contexts: {}", stats.contexts);
    println!("Messages: {}", stats.messages);
    println!("  finished:   {}", stats.finished);
    println!("  unfinished: {}", stats.unfinished);
    println!("  obsolete:   {}", stats.obsolete);
    println!("  numerus:    {}", stats.numerus);
    println!("  empty:      {}", stats.empty);
    if stats.overrides > 0 {
        println!("Overrides: {}", stats.overrides);
    }
}

fn execute_lookup(args: LookupArgs) -> Result<()> {
    let store = match &args.config {
        Some(path) => {
            let mut config = StoreConfig::load(path)
                .with_context(|| format!("load store config {}", path.display()))?;
            if args.include_obsolete {
                config.include_obsolete = true;
            }
            if args.exclude_unfinished {
                config.include_unfinished = false;
            }
            CatalogStore::from_config(&config)
                .with_context(|| format!("load catalogs listed in {}", path.display()))?
        }
        None => {
            let options = LookupOptions {
                include_obsolete: args.include_obsolete,
                include_unfinished: !args.exclude_unfinished,
            };
            CatalogStore::load_with(&args.inputs, Arc::new(LinguistPluralRules::new()), options)
                .with_context(|| format!("load {} catalog(s)", args.inputs.len()))?
        }
    };

    let text = store.translate(
        &args.context,
        &args.source,
        args.comment.as_deref(),
        args.count,
        &args.arguments,
    );
    println!("{text}");
    Ok(())
}

fn execute_normalize(args: NormalizeArgs) -> Result<()> {
    let catalog = Catalog::load([&args.input])
        .with_context(|| format!("load catalog {}", args.input.display()))?;
    let xml = catalog.to_ts_string().context("serialize catalog")?;
    match &args.output {
        Some(output) => {
            fs::write(output, xml).with_context(|| format!("write {}", output.display()))?;
            println!("Wrote {}", output.display());
        }
        None => print!("{xml}"),
    }
    Ok(())
}

fn execute_merge(args: MergeArgs) -> Result<()> {
    let catalog = load_merged(&args.inputs)?;
    for record in catalog.overrides() {
        println!(
            "overridden {}: {:?} ({} -> {})",
            record.context,
            record.source,
            record.replaced_from.display(),
            record.replaced_by.display()
        );
    }
    let xml = catalog.to_ts_string().context("serialize merged catalog")?;
    fs::write(&args.output, xml).with_context(|| format!("write {}", args.output.display()))?;
    println!(
        "Merged {} file(s) into {} ({} override(s))",
        args.inputs.len(),
        args.output.display(),
        catalog.overrides().len()
    );
    Ok(())
}
