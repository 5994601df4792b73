//! CLI definition and dispatch.

use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_kv_adapter::FileKvAdapter;
use crate::domain::config_validation::{validate_storage_config, StorageBackend, DEFAULT_DATA_DIR};
use crate::domain::error::JournalError;
use crate::domain::filter_preset::FilterPreset;
use crate::domain::preset_store::PresetStore;
use crate::domain::record::{Direction, NewRecord, Record, RecordPatch, TradeResult};
use crate::domain::record_filter::{day_bounds, RecordFilter};
use crate::domain::record_store::RecordStore;
use crate::domain::statistics::{monthly_comparison, top_counts};
use crate::domain::vocabulary::{active_entries, is_known, load_vocabulary, VocabularyKind};
use crate::ports::config_port::ConfigPort;
use crate::ports::kv_port::KvPort;

#[derive(Parser, Debug)]
#[command(name = "fxjournal", about = "Journal of FX trading opportunities")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Store data as JSON files in this directory, ignoring [storage]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a new trading opportunity
    Add {
        #[arg(long)]
        pair: String,
        #[arg(long)]
        timeframe: String,
        #[arg(long)]
        pattern: String,
        /// Long or Short
        #[arg(long)]
        direction: String,
        /// 1-5, out-of-range values are clamped
        #[arg(long, allow_negative_numbers = true)]
        confidence: Option<i64>,
        #[arg(long)]
        memo: Option<String>,
        #[arg(long)]
        chart_url: Option<String>,
    },
    /// Change fields of an existing record
    Update {
        id: String,
        #[arg(long)]
        pair: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long)]
        pattern: Option<String>,
        #[arg(long)]
        direction: Option<Direction>,
        #[arg(long, allow_negative_numbers = true)]
        confidence: Option<i64>,
        #[arg(long)]
        memo: Option<String>,
        #[arg(long)]
        chart_url: Option<String>,
        #[arg(long)]
        executed: Option<bool>,
        /// success or failure
        #[arg(long, conflicts_with = "clear_result")]
        result: Option<TradeResult>,
        #[arg(long)]
        clear_result: bool,
    },
    /// Delete a record
    Remove { id: String },
    /// List records, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Case-insensitive text in pair, pattern or memo
        #[arg(long)]
        search: Option<String>,
        /// Only records created today (local time)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        today: bool,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Print one record
    Show { id: String },
    /// Summary statistics over the whole journal
    Stats {
        /// How many top pairs and patterns to list
        #[arg(long, default_value_t = 5)]
        top: usize,
        #[arg(long)]
        json: bool,
    },
    /// Manage saved filter presets
    Preset {
        #[command(subcommand)]
        action: PresetCommand,
    },
    /// List a reference vocabulary
    Vocab {
        #[arg(value_enum)]
        kind: VocabArg,
        /// Include inactive entries
        #[arg(long)]
        all: bool,
    },
    /// Write all records as CSV
    ExportCsv {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum PresetCommand {
    /// Save the given criteria under a name
    Save {
        name: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Delete a preset by name or id
    Remove { preset: String },
    /// List saved presets
    List {
        #[arg(long, value_enum)]
        by: Option<PresetOrder>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// List the records matching a preset and count the use
    Apply { preset: String },
    /// Write all presets as a JSON document
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge presets from a JSON document
    Import { file: PathBuf },
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub pair: Option<String>,
    #[arg(long)]
    pub timeframe: Option<String>,
    #[arg(long)]
    pub pattern: Option<String>,
    #[arg(long)]
    pub direction: Option<Direction>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub min_confidence: Option<u8>,
    #[arg(long)]
    pub executed: Option<bool>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            currency_pair: self.pair.clone(),
            timeframe: self.timeframe.clone(),
            pattern: self.pattern.clone(),
            direction: self.direction,
            min_confidence: self.min_confidence,
            trade_executed: self.executed,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabArg {
    Pairs,
    Timeframes,
    Patterns,
}

impl From<VocabArg> for VocabularyKind {
    fn from(arg: VocabArg) -> Self {
        match arg {
            VocabArg::Pairs => VocabularyKind::CurrencyPairs,
            VocabArg::Timeframes => VocabularyKind::Timeframes,
            VocabArg::Patterns => VocabularyKind::Patterns,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetOrder {
    Usage,
    Recent,
}

pub struct LogSettings {
    pub level: String,
    pub ansi: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    let backend = match resolve_backend(cli.config.as_deref(), cli.data_dir.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let port = match open_storage(&backend) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match execute(cli.command, port.as_ref(), &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Logging settings from `[logging]`, falling back to `warn` with color.
/// An unreadable config file is reported later by [`run`].
pub fn log_settings(config_path: Option<&Path>) -> LogSettings {
    let config = config_path.and_then(|p| FileConfigAdapter::from_file(p).ok());
    LogSettings {
        level: config
            .as_ref()
            .and_then(|c| c.get_string("logging", "level"))
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "warn".to_string()),
        ansi: config
            .as_ref()
            .map(|c| c.get_bool("logging", "ansi", true))
            .unwrap_or(true),
    }
}

/// `--data-dir` wins, then the config file's `[storage]`, then the default
/// data directory.
pub fn resolve_backend(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<StorageBackend, JournalError> {
    if let Some(dir) = data_dir {
        return Ok(StorageBackend::File {
            dir: dir.to_path_buf(),
        });
    }
    match config_path {
        Some(path) => {
            let config = FileConfigAdapter::from_file(path)?;
            validate_storage_config(&config)
        }
        None => Ok(StorageBackend::File {
            dir: PathBuf::from(DEFAULT_DATA_DIR),
        }),
    }
}

pub fn open_storage(backend: &StorageBackend) -> Result<Box<dyn KvPort>, JournalError> {
    match backend {
        StorageBackend::File { dir } => Ok(Box::new(FileKvAdapter::open(dir)?)),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite { path, pool_size } => Ok(Box::new(
            crate::adapters::sqlite_adapter::SqliteAdapter::open(path, *pool_size)?,
        )),
        #[cfg(not(feature = "sqlite"))]
        StorageBackend::Sqlite { .. } => Err(backend_disabled("sqlite")),
        #[cfg(feature = "postgres")]
        StorageBackend::Postgres {
            connection_string,
            pool_size,
        } => Ok(Box::new(
            crate::adapters::postgres_adapter::PostgresAdapter::connect(
                connection_string,
                *pool_size,
            )?,
        )),
        #[cfg(not(feature = "postgres"))]
        StorageBackend::Postgres { .. } => Err(backend_disabled("postgres")),
    }
}

#[cfg(any(not(feature = "sqlite"), not(feature = "postgres")))]
fn backend_disabled(name: &str) -> JournalError {
    JournalError::ConfigInvalid {
        section: "storage".to_string(),
        key: "backend".to_string(),
        reason: format!("fxjournal was built without the '{name}' feature"),
    }
}

/// Run one command against `port`, writing its output to `out`.
pub fn execute<W: Write>(command: Command, port: &dyn KvPort, out: &mut W) -> Result<(), JournalError> {
    match command {
        Command::Add {
            pair,
            timeframe,
            pattern,
            direction,
            confidence,
            memo,
            chart_url,
        } => {
            let mut input = NewRecord::new(&pair, &timeframe, &pattern, &direction);
            input.confidence = confidence;
            input.memo = memo;
            input.chart_url = chart_url;
            warn_unknown_vocabulary(port, &input);

            let mut store = writable_records(port)?;
            let record = store.add(input)?;
            writeln!(out, "{}", record.id)?;
        }
        Command::Update {
            id,
            pair,
            timeframe,
            pattern,
            direction,
            confidence,
            memo,
            chart_url,
            executed,
            result,
            clear_result,
        } => {
            let patch = RecordPatch {
                currency_pair: pair,
                timeframe,
                pattern,
                direction,
                confidence,
                memo,
                chart_url,
                trade_executed: executed,
                trade_result: if clear_result { Some(None) } else { result.map(Some) },
            };
            if patch.is_empty() {
                writeln!(out, "nothing to update")?;
                return Ok(());
            }

            let mut store = writable_records(port)?;
            let record = store.update(&id, &patch)?;
            write_record_detail(out, &record)?;
        }
        Command::Remove { id } => {
            let mut store = writable_records(port)?;
            if store.remove(&id)? {
                writeln!(out, "removed {id}")?;
            } else {
                writeln!(out, "no record {id}")?;
            }
        }
        Command::List {
            filter,
            search,
            today,
            from,
            to,
            json,
        } => {
            let store = RecordStore::open(port);
            // A search term replaces the field filters.
            let mut records = match search.as_deref().filter(|t| !t.is_empty()) {
                Some(term) => store.search(term),
                None => store.query(&filter.to_filter()),
            };
            let window = if today {
                Some(store.todays_records())
            } else {
                records_between(&store, from, to)
            };
            if let Some(window) = window {
                let ids: HashSet<String> = window.into_iter().map(|r| r.id).collect();
                records.retain(|r| ids.contains(&r.id));
            }
            write_record_list(out, &records, json)?;
        }
        Command::Show { id } => {
            let store = RecordStore::open(port);
            let record = store.get(&id).ok_or(JournalError::NotFound { id: id.clone() })?;
            write_record_detail(out, record)?;
        }
        Command::Stats { top, json } => {
            let store = RecordStore::open(port);
            let stats = store.statistics();
            let monthly = monthly_comparison(store.records(), &Local, Local::now().date_naive());

            if json {
                let doc = serde_json::json!({ "statistics": stats, "monthly": monthly });
                let text = serde_json::to_string_pretty(&doc)
                    .map_err(|e| JournalError::Io(io::Error::other(e)))?;
                writeln!(out, "{text}")?;
                return Ok(());
            }

            writeln!(out, "Total records:     {}", stats.total_records)?;
            writeln!(out, "Executed trades:   {}", stats.executed_trades)?;
            writeln!(out, "Successful trades: {}", stats.successful_trades)?;
            writeln!(out, "Success rate:      {}%", stats.success_rate_label())?;
            writeln!(
                out,
                "This month:        {} ({:+} vs last month)",
                monthly.this_month, monthly.change
            )?;
            writeln!(out, "\nTop currency pairs:")?;
            for (pair, count) in top_counts(&stats.currency_pair_counts, top) {
                writeln!(out, "  {pair:<10} {count}")?;
            }
            writeln!(out, "\nTop patterns:")?;
            for (pattern, count) in top_counts(&stats.pattern_counts, top) {
                writeln!(out, "  {pattern:<28} {count}")?;
            }
            writeln!(out, "\nDirections:")?;
            for (direction, count) in &stats.direction_counts {
                writeln!(out, "  {direction:<10} {count}")?;
            }
        }
        Command::Preset { action } => run_preset(action, port, out)?,
        Command::Vocab { kind, all } => {
            let entries = load_vocabulary(port, kind.into())?;
            let shown = if all {
                let mut sorted = entries;
                sorted.sort_by_key(|e| e.display_order);
                sorted
            } else {
                active_entries(&entries)
            };
            for entry in &shown {
                let inactive = if entry.is_active { "" } else { " (inactive)" };
                writeln!(
                    out,
                    "{:<28} {:<14} {}{}",
                    entry.name,
                    entry.category,
                    entry.label(),
                    inactive
                )?;
            }
        }
        Command::ExportCsv { output } => {
            let store = RecordStore::open(port);
            match output {
                Some(path) => {
                    let file = fs::File::create(&path)?;
                    csv_adapter::write_records(file, store.records())?;
                    writeln!(out, "wrote {} records to {}", store.len(), path.display())?;
                }
                None => csv_adapter::write_records(&mut *out, store.records())?,
            }
        }
    }
    Ok(())
}

fn run_preset<W: Write>(action: PresetCommand, port: &dyn KvPort, out: &mut W) -> Result<(), JournalError> {
    match action {
        PresetCommand::Save { name, filter } => {
            let mut presets = writable_presets(port)?;
            let preset = presets.save(&name, filter.to_filter())?;
            writeln!(out, "saved preset '{}' ({})", preset.name, preset.id)?;
        }
        PresetCommand::Remove { preset } => {
            let mut presets = writable_presets(port)?;
            let id = resolve_preset(&presets, &preset)?.id.clone();
            presets.remove(&id)?;
            writeln!(out, "removed preset '{preset}'")?;
        }
        PresetCommand::List { by, limit } => {
            let presets = PresetStore::open(port);
            let shown = match by {
                Some(PresetOrder::Usage) => presets.most_used(limit),
                Some(PresetOrder::Recent) => presets.most_recent(limit),
                None => presets.presets().iter().take(limit).cloned().collect(),
            };
            for preset in &shown {
                writeln!(
                    out,
                    "{:<24} used {:>3}x  {}",
                    preset.name,
                    preset.usage_count,
                    describe_filter(&preset.filters)
                )?;
            }
        }
        PresetCommand::Apply { preset } => {
            let mut presets = PresetStore::open(port);
            let id = resolve_preset(&presets, &preset)?.id.clone();
            let applied = presets
                .apply_usage(&id)
                .ok_or(JournalError::NotFound { id })?;
            let records = RecordStore::open(port).query(&applied.filters);
            write_record_list(out, &records, false)?;
        }
        PresetCommand::Export { output } => {
            let document = PresetStore::open(port).export()?;
            match output {
                Some(path) => fs::write(&path, document)?,
                None => writeln!(out, "{document}")?,
            }
        }
        PresetCommand::Import { file } => {
            let document = fs::read_to_string(&file)?;
            let mut presets = writable_presets(port)?;
            let count = presets.import(&document)?;
            writeln!(out, "imported {count} presets")?;
        }
    }
    Ok(())
}

/// A store about to be written must have loaded cleanly, otherwise the
/// first write would replace the unreadable document with a near-empty one.
fn writable_records(port: &dyn KvPort) -> Result<RecordStore<&dyn KvPort>, JournalError> {
    let mut store = RecordStore::open(port);
    if store.load_error().is_some() {
        store.load()?;
    }
    Ok(store)
}

fn writable_presets(port: &dyn KvPort) -> Result<PresetStore<&dyn KvPort>, JournalError> {
    let mut store = PresetStore::open(port);
    if store.load_error().is_some() {
        store.load()?;
    }
    Ok(store)
}

fn resolve_preset<'a, P: KvPort>(
    presets: &'a PresetStore<P>,
    name_or_id: &str,
) -> Result<&'a FilterPreset, JournalError> {
    presets
        .find_by_name(name_or_id)
        .or_else(|| presets.get(name_or_id))
        .ok_or_else(|| JournalError::NotFound {
            id: name_or_id.to_string(),
        })
}

fn warn_unknown_vocabulary(port: &dyn KvPort, input: &NewRecord) {
    let checks = [
        (VocabularyKind::CurrencyPairs, input.currency_pair.trim()),
        (VocabularyKind::Timeframes, input.timeframe.trim()),
        (VocabularyKind::Patterns, input.pattern.trim()),
    ];
    for (kind, value) in checks {
        if value.is_empty() {
            continue;
        }
        match load_vocabulary(port, kind) {
            Ok(entries) if !is_known(&entries, value) => {
                warn!(key = kind.key(), value, "value is not in the active vocabulary");
            }
            Ok(_) => {}
            Err(e) => warn!(key = kind.key(), error = %e, "vocabulary unavailable"),
        }
    }
}

/// Records created between the local start of `from` and the local end of
/// `to`. `None` when neither bound is given.
fn records_between<P: KvPort>(
    store: &RecordStore<P>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Option<Vec<Record>> {
    if from.is_none() && to.is_none() {
        return None;
    }
    let start = from
        .and_then(|d| day_bounds(&Local, d))
        .map_or(DateTime::<Utc>::MIN_UTC, |(s, _)| s);
    let end = to
        .and_then(|d| day_bounds(&Local, d))
        .map_or(DateTime::<Utc>::MAX_UTC, |(_, e)| e);
    Some(store.records_in_range(start, end))
}

/// Short human description of the criteria a filter sets.
pub fn describe_filter(filter: &RecordFilter) -> String {
    let mut parts = Vec::new();
    if let Some(pair) = filter.currency_pair.as_deref() {
        parts.push(format!("pair={pair}"));
    }
    if let Some(timeframe) = filter.timeframe.as_deref() {
        parts.push(format!("timeframe={timeframe}"));
    }
    if let Some(pattern) = filter.pattern.as_deref() {
        parts.push(format!("pattern={pattern}"));
    }
    if let Some(direction) = filter.direction {
        parts.push(format!("direction={direction}"));
    }
    if let Some(confidence) = filter.min_confidence {
        parts.push(format!("confidence>={confidence}"));
    }
    if let Some(executed) = filter.trade_executed {
        parts.push(format!("executed={executed}"));
    }
    if parts.is_empty() {
        "(no criteria)".to_string()
    } else {
        parts.join(" ")
    }
}

fn write_record_list<W: Write>(out: &mut W, records: &[Record], json: bool) -> Result<(), JournalError> {
    if json {
        let text = serde_json::to_string_pretty(records)
            .map_err(|e| JournalError::Io(io::Error::other(e)))?;
        writeln!(out, "{text}")?;
        return Ok(());
    }

    for r in records {
        let status = match (r.trade_executed, r.trade_result) {
            (false, _) => "-".to_string(),
            (true, None) => "open".to_string(),
            (true, Some(result)) => result.to_string(),
        };
        writeln!(
            out,
            "{}  {}  {:<8} {:<4} {:<26} {:<5} {}  {}",
            r.id,
            r.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            r.currency_pair,
            r.timeframe,
            r.pattern,
            r.direction,
            r.confidence,
            status
        )?;
    }
    writeln!(out, "{} record(s)", records.len())?;
    Ok(())
}

fn write_record_detail<W: Write>(out: &mut W, r: &Record) -> Result<(), JournalError> {
    writeln!(out, "ID:          {}", r.id)?;
    writeln!(out, "Created:     {}", r.created_at.with_timezone(&Local).to_rfc3339())?;
    writeln!(out, "Updated:     {}", r.updated_at.with_timezone(&Local).to_rfc3339())?;
    writeln!(out, "Pair:        {}", r.currency_pair)?;
    writeln!(out, "Timeframe:   {}", r.timeframe)?;
    writeln!(out, "Pattern:     {}", r.pattern)?;
    writeln!(out, "Direction:   {}", r.direction)?;
    writeln!(out, "Confidence:  {}", r.confidence)?;
    writeln!(out, "Executed:    {}", if r.trade_executed { "yes" } else { "no" })?;
    if let Some(result) = r.trade_result {
        writeln!(out, "Result:      {result}")?;
    }
    if !r.memo.is_empty() {
        writeln!(out, "Memo:        {}", r.memo)?;
    }
    if !r.chart_url.is_empty() {
        writeln!(out, "Chart:       {}", r.chart_url)?;
    }
    Ok(())
}
