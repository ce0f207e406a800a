//! Integration tests for scripted sessions
//!
//! Scripts are the headless stand-in for the screen's event handlers, so
//! these tests exercise the full overlay, loading and refresh flow through
//! the same JSON steps the CLI accepts.

use sacraments_screen::cli::{DEMO_SCRIPT, Session, parse_script};
use sacraments_screen::config::Config;
use sacraments_screen::sacraments::{MemoryStore, Sacrament, SacramentOverlay};
use sacraments_screen::screen::{ControllerSettings, OverlayKey};
use serde_json::json;
use std::fs;

fn sample_session(settings: ControllerSettings) -> Session {
    Session::new(settings, MemoryStore::with_sample_data())
}

/// A rejected edit keeps the edit overlay open with its record; a retry closes it
#[tokio::test]
async fn test_failed_edit_keeps_form_open_until_retry() {
    let mut session = sample_session(ControllerSettings::default());
    let steps = parse_script(
        r#"[
            { "op": "mount", "category": "MARRIAGE" },
            { "op": "open_edit", "category": "MARRIAGE", "id": "marriage-5" },
            { "op": "fault", "category": "MARRIAGE",
              "fault": { "kind": "next_mutation", "message": "register locked" } },
            { "op": "mutate", "category": "MARRIAGE", "workflow": "EDIT",
              "id": "marriage-5", "date": "2022-09-10" }
        ]"#,
    )
    .unwrap();

    let reports = session.run(steps).await.unwrap();
    let failed = &reports[3].outcome;
    assert_eq!(failed["ok"], json!(false));
    assert!(failed["error"].as_str().unwrap().contains("register locked"));
    assert!(session.controller().modals().is_open(SacramentOverlay::EDIT));
    assert_eq!(session.view(Sacrament::Marriage).unwrap().fetch_count(), 1);

    let retry = parse_script(
        r#"[{ "op": "mutate", "category": "MARRIAGE", "workflow": "EDIT",
              "id": "marriage-5", "date": "2022-09-10" }]"#,
    )
    .unwrap();
    let reports = session.run(retry).await.unwrap();

    assert_eq!(reports[0].outcome["ok"], json!(true));
    assert!(!session.controller().modals().is_open(SacramentOverlay::EDIT));
    assert!(session.controller().modals().selected_record().is_none());
    let view = session.view(Sacrament::Marriage).unwrap();
    assert_eq!(view.fetch_count(), 2);
    assert_eq!(view.rows()[0].date, "2022-09-10");
}

/// With refresh_all_after_mutation every mounted list refetches
#[tokio::test]
async fn test_refresh_all_after_mutation_setting() {
    let mut session = sample_session(ControllerSettings {
        refresh_all_after_mutation: true,
        slow_operation_warn: None,
    });
    let steps = parse_script(
        r#"[
            { "op": "mount", "category": "BAPTISM" },
            { "op": "mount", "category": "CONFIRMATION" },
            { "op": "mutate", "category": "BAPTISM", "workflow": "CREATE",
              "person": "Elena Marsh", "date": "2024-11-03" }
        ]"#,
    )
    .unwrap();

    let reports = session.run(steps).await.unwrap();

    assert_eq!(reports[2].outcome["rows"], json!(3));
    assert_eq!(session.view(Sacrament::Baptism).unwrap().fetch_count(), 2);
    assert_eq!(session.view(Sacrament::Confirmation).unwrap().fetch_count(), 2);
}

/// A failing list fetch is reported per category and the others still refresh
#[tokio::test]
async fn test_refresh_all_reports_failed_category() {
    let mut session = sample_session(ControllerSettings::default());
    let steps = parse_script(
        r#"[
            { "op": "mount", "category": "BAPTISM" },
            { "op": "mount", "category": "FUNERAL" },
            { "op": "fault", "category": "FUNERAL",
              "fault": { "kind": "fetches", "message": "query timed out" } },
            { "op": "refresh_all" }
        ]"#,
    )
    .unwrap();

    let reports = session.run(steps).await.unwrap();
    let report = &reports[3].outcome;

    assert_eq!(report["failed"], json!(["FUNERAL"]));
    assert_eq!(report["refreshed"], json!(["BAPTISM"]));
    let funerals = session.view(Sacrament::Funeral).unwrap();
    assert!(funerals.last_error().unwrap().contains("query timed out"));
    assert_eq!(session.view(Sacrament::Baptism).unwrap().fetch_count(), 2);
}

/// Reset closes overlays and clears loading but keeps list registrations
#[tokio::test]
async fn test_reset_keeps_refresh_registrations() {
    let mut session = sample_session(ControllerSettings::default());
    let steps = parse_script(
        r#"[
            { "op": "mount", "category": "BAPTISM" },
            { "op": "open_detail", "category": "BAPTISM", "id": "baptism-1" },
            { "op": "set_loading", "scope": "GLOBAL", "busy": true, "label": "Loading parish" },
            { "op": "reset" },
            { "op": "refresh", "category": "BAPTISM" },
            { "op": "snapshot" }
        ]"#,
    )
    .unwrap();

    let reports = session.run(steps).await.unwrap();

    assert_eq!(reports[4].outcome["outcome"], json!("refreshed"));
    let snapshot = &reports[5].outcome;
    assert_eq!(snapshot["open_overlays"], json!([]));
    assert_eq!(snapshot["busy"], json!([]));
    assert_eq!(snapshot["selected_record"], json!(null));
    assert_eq!(snapshot["registered"], json!(["BAPTISM"]));
}

/// Unmounting a list stops refreshes from reaching it
#[tokio::test]
async fn test_unmounted_category_is_skipped() {
    let mut session = sample_session(ControllerSettings::default());
    let steps = parse_script(
        r#"[
            { "op": "mount", "category": "FUNERAL" },
            { "op": "unmount", "category": "FUNERAL" },
            { "op": "unmount", "category": "FUNERAL" },
            { "op": "refresh", "category": "FUNERAL" }
        ]"#,
    )
    .unwrap();

    let reports = session.run(steps).await.unwrap();

    assert_eq!(reports[1].outcome["was_mounted"], json!(true));
    assert_eq!(reports[2].outcome["was_mounted"], json!(false));
    assert_eq!(reports[3].outcome["outcome"], json!("skipped"));
    assert!(session.view(Sacrament::Funeral).is_none());
}

/// A reference to a record that does not exist aborts the run with context
#[tokio::test]
async fn test_unknown_record_aborts_run() {
    let mut session = sample_session(ControllerSettings::default());
    let steps = parse_script(
        r#"[
            { "op": "open", "overlay": "ANALYTICS" },
            { "op": "open_certificate", "category": "ORDINATION", "id": "ordination-99" }
        ]"#,
    )
    .unwrap();

    let err = session.run(steps).await.unwrap_err();
    let message = format!("{err:#}");

    assert!(message.contains("Step 2 (open_certificate) failed"));
    assert!(message.contains("No ORDINATION record 'ordination-99'"));
}

/// The built-in demo ends with every overlay closed and nothing busy
#[tokio::test]
async fn test_demo_script_final_snapshot() {
    let mut session = sample_session(ControllerSettings::default());
    let reports = session.run(parse_script(DEMO_SCRIPT).unwrap()).await.unwrap();

    let last = &reports.last().unwrap().outcome;
    assert_eq!(last["open_overlays"], json!([]));
    assert_eq!(last["busy"], json!([]));
    assert_eq!(last["registered"], json!(["BAPTISM", "MARRIAGE"]));

    let query = reports.iter().find(|report| report.op == "query").unwrap();
    assert_eq!(query.outcome["operation_loading"], json!(true));
}

/// A script file combined with a config file on disk drives the session settings
#[tokio::test]
async fn test_script_and_config_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        "[settings]\nrefresh_all_after_mutation = true\nslow_operation_warn_ms = 0\n",
    )
    .unwrap();
    let script_path = dir.path().join("script.json");
    fs::write(
        &script_path,
        r#"[
            { "op": "mount", "category": "CONFIRMATION" },
            { "op": "mutate", "category": "BAPTISM", "workflow": "EXPORT" }
        ]"#,
    )
    .unwrap();

    let config = Config::load_from(&config_path).unwrap();
    let settings = config.settings.controller_settings();
    assert!(settings.refresh_all_after_mutation);
    assert_eq!(settings.slow_operation_warn, None);

    let mut session = sample_session(settings);
    let steps = parse_script(&fs::read_to_string(&script_path).unwrap()).unwrap();
    let reports = session.run(steps).await.unwrap();

    assert_eq!(reports[1].outcome["result"], json!({ "exported_rows": 2 }));
    assert_eq!(session.view(Sacrament::Confirmation).unwrap().fetch_count(), 2);
}
