//! Shared wiring for report service tests: in-memory stores and a local
//! disk in a temporary directory.

use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

use assetdesk_cache::CacheManager;
use assetdesk_core::config::{CacheConfig, ExportConfig, ReportsConfig, WorkerConfig};
use assetdesk_core::types::{SortDirection, UserId};
use assetdesk_database::memory::{
    MemoryJobStore, MemoryReportFileStore, MemoryReportStore, MemoryRowSource,
};
use assetdesk_database::ReportStore;
use assetdesk_entity::report::{
    CreateReport, ExportFormat, Frequency, ReportDefinition, ReportKind, Row,
};
use assetdesk_storage::StorageManager;
use assetdesk_storage::providers::LocalStorageProvider;

use super::export::ReportExporter;
use super::generator::ReportGenerator;
use super::resolver::ReportDataResolver;
use crate::jobs::JobSubmitter;

pub struct Fixture {
    pub dir: TempDir,
    pub reports: Arc<MemoryReportStore>,
    pub files: Arc<MemoryReportFileStore>,
    pub jobs: Arc<MemoryJobStore>,
    pub rows: Arc<MemoryRowSource>,
    pub storage: Arc<StorageManager>,
    pub cache: Arc<CacheManager>,
    pub config: ReportsConfig,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(StorageManager::new("local"));
        let local = LocalStorageProvider::new(dir.path().join("disk")).await.unwrap();
        storage.register("local", Arc::new(local)).await;

        let rows = Arc::new(MemoryRowSource::new());
        rows.extend(ReportKind::Asset, (1..=5).map(asset)).await;

        Self {
            dir,
            reports: Arc::new(MemoryReportStore::new()),
            files: Arc::new(MemoryReportFileStore::new()),
            jobs: Arc::new(MemoryJobStore::new()),
            rows,
            storage,
            cache: Arc::new(CacheManager::new(&CacheConfig::default())),
            config: ReportsConfig::default(),
        }
    }

    pub fn disk_path(&self, key: &str) -> std::path::PathBuf {
        self.dir.path().join("disk").join(key)
    }

    pub fn resolver(&self) -> ReportDataResolver {
        ReportDataResolver::new(self.rows.clone())
    }

    pub fn exporter(&self) -> ReportExporter {
        ReportExporter::new(ExportConfig::default()).with_temp_dir(self.dir.path())
    }

    pub fn generator(&self) -> ReportGenerator {
        ReportGenerator::new(
            self.reports.clone(),
            self.files.clone(),
            self.resolver(),
            self.exporter(),
            self.storage.clone(),
            self.config.clone(),
        )
    }

    pub fn submitter(&self) -> JobSubmitter {
        JobSubmitter::new(self.jobs.clone(), &WorkerConfig::default())
    }

    pub async fn insert_report(&self, report: ReportDefinition) -> ReportDefinition {
        self.reports.create(&report).await.unwrap()
    }
}

pub fn asset(id: i64) -> Row {
    match json!({
        "id": id,
        "asset_tag": format!("AT-{id:04}"),
        "name": format!("Asset {id}"),
        "category": "Laptop",
        "status": "deployed",
        "purchase_date": "2024-01-15",
        "created_at": format!("2024-01-{:02}T08:00:00Z", id),
    }) {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub fn create_input() -> CreateReport {
    CreateReport {
        name: "Deployed assets".to_string(),
        description: None,
        kind: ReportKind::Asset,
        format: ExportFormat::Csv,
        columns: vec!["asset_tag".to_string(), "name".to_string()],
        filters: Vec::new(),
        sort_field: Some("id".to_string()),
        sort_direction: SortDirection::Asc,
        is_scheduled: false,
        frequency: None,
        schedule_day: None,
        schedule_time: None,
        is_public: false,
    }
}

pub fn report(owner: UserId) -> ReportDefinition {
    create_input().into_definition(owner, Utc::now())
}

pub fn daily_report(owner: UserId, time: NaiveTime) -> ReportDefinition {
    let mut input = create_input();
    input.is_scheduled = true;
    input.frequency = Some(Frequency::Daily);
    input.schedule_time = Some(time);
    input.into_definition(owner, Utc::now())
}
