//! Customer table loading using Polars

use crate::error::LoadError;
use once_cell::sync::OnceCell;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Customers whose last purchase is older than this many days count as churned.
///
/// The churn model is trained against the same rule elsewhere; the artifact may
/// record the value it used, see [`crate::model::ChurnModel::threshold_days`].
pub const CHURN_RECENCY_THRESHOLD_DAYS: f64 = 180.0;

pub const CUSTOMER_ID: &str = "CustomerID";
pub const RECENCY: &str = "Recency";
pub const FREQUENCY: &str = "Frequency";
pub const MONETARY: &str = "Monetary";
pub const CLUSTER: &str = "Cluster";

/// Binary churn outcome, shared by the derived table column and the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChurnLabel {
    NotChurned,
    Churned,
}

impl ChurnLabel {
    /// Derive the label from days since last purchase
    pub fn from_recency(recency: f64) -> Self {
        if recency > CHURN_RECENCY_THRESHOLD_DAYS {
            ChurnLabel::Churned
        } else {
            ChurnLabel::NotChurned
        }
    }

    /// Map a classifier output onto a label
    pub fn from_class(class: usize) -> Option<Self> {
        match class {
            0 => Some(ChurnLabel::NotChurned),
            1 => Some(ChurnLabel::Churned),
            _ => None,
        }
    }

    pub fn as_flag(self) -> u8 {
        match self {
            ChurnLabel::NotChurned => 0,
            ChurnLabel::Churned => 1,
        }
    }

    /// Axis / legend caption
    pub fn caption(self) -> &'static str {
        match self {
            ChurnLabel::NotChurned => "Not Churned",
            ChurnLabel::Churned => "Churned",
        }
    }

    /// Human-readable prediction outcome
    pub fn outcome(self) -> &'static str {
        match self {
            ChurnLabel::NotChurned => "🟢 Not Likely to Churn",
            ChurnLabel::Churned => "🔴 At Risk of Churning",
        }
    }
}

/// One customer row with the derived churn label. Empty CSV cells stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub customer_id: Option<String>,
    pub recency: Option<f64>,
    pub frequency: Option<f64>,
    pub monetary: Option<f64>,
    pub cluster: Option<i64>,
    churn: ChurnLabel,
}

impl CustomerRecord {
    /// A record without a recency is never labelled churned
    pub fn new(
        customer_id: Option<String>,
        recency: impl Into<Option<f64>>,
        frequency: impl Into<Option<f64>>,
        monetary: impl Into<Option<f64>>,
        cluster: Option<i64>,
    ) -> Self {
        let recency = recency.into();
        Self {
            customer_id,
            recency,
            frequency: frequency.into(),
            monetary: monetary.into(),
            cluster,
            churn: recency.map_or(ChurnLabel::NotChurned, ChurnLabel::from_recency),
        }
    }

    pub fn churn(&self) -> ChurnLabel {
        self.churn
    }
}

/// Read-only customer table shared by every section renderer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomerTable {
    records: Vec<CustomerRecord>,
}

impl CustomerTable {
    pub fn from_records(records: Vec<CustomerRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CustomerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Non-empty values of one RFM metric in row order
    pub fn column(&self, metric: Metric) -> Vec<f64> {
        self.records.iter().filter_map(|r| metric.of(r)).collect()
    }
}

/// The three RFM metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Recency, Metric::Frequency, Metric::Monetary];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Recency => RECENCY,
            Metric::Frequency => FREQUENCY,
            Metric::Monetary => MONETARY,
        }
    }

    pub fn of(self, record: &CustomerRecord) -> Option<f64> {
        match self {
            Metric::Recency => record.recency,
            Metric::Frequency => record.frequency,
            Metric::Monetary => record.monetary,
        }
    }
}

/// Load the clustered customer CSV and attach the derived churn label
///
/// # Arguments
/// * `file_path` - Path to a CSV with CustomerID, Recency, Frequency, Monetary and Cluster columns
///
/// # Returns
/// * `CustomerTable` with one record per CSV row, in file order
pub fn load_customer_table(file_path: impl AsRef<Path>) -> Result<CustomerTable, LoadError> {
    let path = file_path.as_ref();
    if !path.is_file() {
        return Err(LoadError::Missing {
            what: "customer table",
            path: path.to_path_buf(),
        });
    }

    let table_error = |source| LoadError::Table {
        path: path.to_path_buf(),
        source,
    };

    let df = read_frame(path).map_err(table_error)?;
    debug!("Parsed {} rows from {}", df.height(), path.display());

    let records = records_from_frame(&df).map_err(table_error)?;
    Ok(CustomerTable::from_records(records))
}

/// Scan the CSV lazily and normalise column types. The whole file is used for
/// type inference so a late fractional value does not break an integer guess.
fn read_frame(path: &Path) -> PolarsResult<DataFrame> {
    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .finish()?
        .select([
            col(CUSTOMER_ID).cast(DataType::String),
            col(RECENCY).cast(DataType::Float64),
            col(FREQUENCY).cast(DataType::Float64),
            col(MONETARY).cast(DataType::Float64),
            col(CLUSTER).cast(DataType::Int64),
        ])
        .collect()
}

/// Convert the typed frame into records, one per row
fn records_from_frame(df: &DataFrame) -> PolarsResult<Vec<CustomerRecord>> {
    let ids = df.column(CUSTOMER_ID)?.str()?;
    let recency = df.column(RECENCY)?.f64()?;
    let frequency = df.column(FREQUENCY)?.f64()?;
    let monetary = df.column(MONETARY)?.f64()?;
    let clusters = df.column(CLUSTER)?.i64()?;

    let records = ids
        .into_iter()
        .zip(recency.into_iter())
        .zip(frequency.into_iter())
        .zip(monetary.into_iter())
        .zip(clusters.into_iter())
        .map(|((((id, r), f), m), cluster)| {
            CustomerRecord::new(id.map(str::to_owned), r, f, m, cluster)
        })
        .collect();

    Ok(records)
}

/// Process-scoped memo of the customer table
///
/// The first successful [`TableCache::load`] reads the file; every later call
/// hands out the same allocation.
#[derive(Debug)]
pub struct TableCache {
    path: PathBuf,
    table: OnceCell<Arc<CustomerTable>>,
}

impl TableCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Arc<CustomerTable>, LoadError> {
        self.table
            .get_or_try_init(|| {
                let table = load_customer_table(&self.path)?;
                info!(
                    "Loaded {} customers from {}",
                    table.len(),
                    self.path.display()
                );
                Ok(Arc::new(table))
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CustomerID,Recency,Frequency,Monetary,Cluster").unwrap();
        writeln!(file, "12346,325,1,77183.6,3").unwrap();
        writeln!(file, "12347,2,7,4310.0,1").unwrap();
        writeln!(file, "12348,75,4,1797.24,0").unwrap();
        writeln!(file, "12349,18,1,1757.55,0").unwrap();
        writeln!(file, "12350,310,1,334.4,2").unwrap();
        writeln!(file, "12352,181,8,2506.04,").unwrap();
        file
    }

    #[test]
    fn test_load_customer_table() {
        let test_file = create_test_csv();
        let table = load_customer_table(test_file.path()).unwrap();

        assert_eq!(table.len(), 6);
        let first = &table.records()[0];
        assert_eq!(first.customer_id.as_deref(), Some("12346"));
        assert_eq!(first.recency, Some(325.0));
        assert_eq!(first.frequency, Some(1.0));
        assert!((first.monetary.unwrap() - 77183.6).abs() < 1e-9);
        assert_eq!(first.cluster, Some(3));
        assert_eq!(table.records()[5].cluster, None);
    }

    #[test]
    fn test_churn_follows_recency_threshold() {
        let test_file = create_test_csv();
        let table = load_customer_table(test_file.path()).unwrap();

        for record in table.records() {
            let expected = if record.recency.unwrap() > 180.0 { 1 } else { 0 };
            assert_eq!(record.churn().as_flag(), expected, "{:?}", record);
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(ChurnLabel::from_recency(180.0), ChurnLabel::NotChurned);
        assert_eq!(ChurnLabel::from_recency(181.0), ChurnLabel::Churned);
        assert_eq!(ChurnLabel::from_recency(0.0), ChurnLabel::NotChurned);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_customer_table(dir.path().join("absent.csv"));
        assert!(matches!(result, Err(LoadError::Missing { .. })));
    }

    #[test]
    fn test_missing_required_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CustomerID,Recency,Frequency,Monetary").unwrap();
        writeln!(file, "1,10,1,5.0").unwrap();

        let result = load_customer_table(file.path());
        assert!(matches!(result, Err(LoadError::Table { .. })));
    }

    #[test]
    fn test_empty_metric_cells_are_kept() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CustomerID,Recency,Frequency,Monetary,Cluster").unwrap();
        writeln!(file, "1,10,1,5.0,0").unwrap();
        writeln!(file, "2,200,1,,1").unwrap();
        writeln!(file, "3,,4,12.5,1").unwrap();

        let table = load_customer_table(file.path()).unwrap();
        assert_eq!(table.len(), 3);

        let records = table.records();
        assert_eq!(records[1].monetary, None);
        assert_eq!(records[1].churn(), ChurnLabel::Churned);
        assert_eq!(records[2].recency, None);
        assert_eq!(records[2].churn(), ChurnLabel::NotChurned);

        assert_eq!(table.column(Metric::Monetary), vec![5.0, 12.5]);
        assert_eq!(table.column(Metric::Recency), vec![10.0, 200.0]);
    }

    #[test]
    fn test_late_fractional_value_after_integer_rows() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "CustomerID,Recency,Frequency,Monetary,Cluster").unwrap();
        for id in 0..150 {
            writeln!(file, "{},{},2,{},0", 10_000 + id, id % 300, 100 + id).unwrap();
        }
        writeln!(file, "20000,12,3,250.75,1").unwrap();

        let table = load_customer_table(file.path()).unwrap();
        assert_eq!(table.len(), 151);

        let last = &table.records()[150];
        assert_eq!(last.monetary, Some(250.75));
        assert_eq!(last.cluster, Some(1));
        assert_eq!(table.records()[0].monetary, Some(100.0));
    }

    #[test]
    fn test_cache_returns_same_table() {
        let test_file = create_test_csv();
        let cache = TableCache::new(test_file.path());

        let first = cache.load().unwrap();
        let second = cache.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_does_not_reread_source() {
        let test_file = create_test_csv();
        let path = test_file.path().to_path_buf();
        let cache = TableCache::new(&path);

        let first = cache.load().unwrap();
        drop(test_file);
        assert!(!path.exists());

        let second = cache.load().unwrap();
        assert_eq!(second.len(), first.len());
    }

    #[test]
    fn test_column_extraction() {
        let table = CustomerTable::from_records(vec![
            CustomerRecord::new(Some("a".into()), 10.0, 1.0, 5.0, Some(0)),
            CustomerRecord::new(Some("b".into()), 200.0, 2.0, 6.0, Some(1)),
        ]);
        assert_eq!(table.column(Metric::Recency), vec![10.0, 200.0]);
        assert_eq!(table.column(Metric::Monetary), vec![5.0, 6.0]);
    }
}
