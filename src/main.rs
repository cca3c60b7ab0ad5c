use clap::Parser;
use coursepay::application::engine::{EngineDeps, PaymentEngine};
use coursepay::infrastructure::collaborators::{LogNotifier, RecordingEnrollment};
use coursepay::infrastructure::in_memory::{
    InMemoryCatalogStore, InMemoryHistoryStore, InMemoryMethodStore, InMemoryPromoStore,
    InMemoryRefundStore, InMemoryTransactionStore,
};
use coursepay::interfaces::csv::ReportWriter;
use coursepay::interfaces::jsonl::EventReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input events file (JSON lines, one operation per line)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn in_memory_deps() -> EngineDeps {
    EngineDeps {
        promos: Arc::new(InMemoryPromoStore::new()),
        catalog: Arc::new(InMemoryCatalogStore::new()),
        transactions: Arc::new(InMemoryTransactionStore::new()),
        history: Arc::new(InMemoryHistoryStore::new()),
        refunds: Arc::new(InMemoryRefundStore::new()),
        methods: Arc::new(InMemoryMethodStore::new()),
        enrollment: Arc::new(RecordingEnrollment::new()),
        notifier: Arc::new(LogNotifier::new()),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn persistent_deps(path: &std::path::Path) -> Result<EngineDeps> {
    use coursepay::infrastructure::rocksdb::RocksDbStore;

    let store = RocksDbStore::open(path).into_diagnostic()?;
    Ok(EngineDeps {
        promos: Arc::new(store.clone()),
        catalog: Arc::new(store.clone()),
        transactions: Arc::new(store.clone()),
        history: Arc::new(store.clone()),
        refunds: Arc::new(store.clone()),
        methods: Arc::new(store),
        enrollment: Arc::new(RecordingEnrollment::new()),
        notifier: Arc::new(LogNotifier::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn persistent_deps(_path: &std::path::Path) -> Result<EngineDeps> {
    eprintln!(
        "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    Ok(in_memory_deps())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let deps = match &cli.db_path {
        Some(path) => persistent_deps(path)?,
        None => in_memory_deps(),
    };
    let engine = PaymentEngine::new(deps);

    // Apply events; each failure is scoped to its event and the stream
    // continues.
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = engine.apply(event).await {
                    eprintln!("Error applying event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    // Output final transaction state
    let transactions = engine.report().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_report(&transactions).into_diagnostic()?;

    Ok(())
}
