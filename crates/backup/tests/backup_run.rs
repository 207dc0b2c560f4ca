//! Integration tests for database and spreadsheet backups against a real
//! database and a local sink.

use std::io::Cursor;

use chrono::Utc;
use cruisemall_backup::export::BACKUP_TABLES;
use cruisemall_backup::{DatabaseBackup, LocalDirSink, SheetWatermarks, SpreadsheetBackup};
use sqlx::PgPool;

async fn seed(pool: &PgPool) {
    sqlx::query(
        "INSERT INTO cruise_products
            (code, title, cruise_line, ship_name, departure_port, departure_date, nights, price)
         VALUES ('JP-1', 'Japan Islands', 'Princess', 'Diamond Princess', 'Busan', '2027-04-01', 5, 1500000)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO affiliate_leads (customer_name, phone, normalized_phone, source)
         VALUES ('Choi', '010-7777-8888', '01077778888', 'MANUAL')",
    )
    .execute(pool)
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn database_backup_exports_every_table(pool: PgPool) {
    seed(&pool).await;
    let dir = tempfile::tempdir().unwrap();
    let sink = LocalDirSink::new(dir.path());

    let now = Utc::now();
    let report = DatabaseBackup::run(&pool, &sink, now).await.unwrap();

    assert_eq!(report.tables_ok as usize, BACKUP_TABLES.len());
    assert_eq!(report.tables_failed, 0);
    assert!(report.rows >= 2);

    let folder = DatabaseBackup::folder_name(now);
    let archive = std::fs::read(dir.path().join(&folder).join(format!("{folder}.zip"))).unwrap();
    let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    assert_eq!(zip.len(), BACKUP_TABLES.len());
    assert!(zip.file_names().any(|n| n == "affiliate_leads.csv"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn spreadsheet_backup_appends_only_new_rows(pool: PgPool) {
    seed(&pool).await;
    let dir = tempfile::tempdir().unwrap();
    let sink = LocalDirSink::new(dir.path());

    let first = SpreadsheetBackup::run(&pool, &sink, &SheetWatermarks::new()).await.unwrap();
    assert_eq!(first.tables_ok, 2);
    assert_eq!(first.rows, 1);

    let now = Utc::now();
    let watermarks = SheetWatermarks::from([("leads", now), ("orders", now)]);
    let second = SpreadsheetBackup::run(&pool, &sink, &watermarks).await.unwrap();
    assert_eq!(second.rows, 0);

    let leads = std::fs::read_to_string(dir.path().join("sheets/leads.csv")).unwrap();
    assert_eq!(leads.lines().count(), 2);
    assert!(leads.contains("01077778888"));
    assert!(!dir.path().join("sheets/orders.csv").exists());
}
