//! Integration tests for the history client against a local database.

use recall_store::{HistoryClient, StoreConfig, StoreError};
use recall_types::{Mode, Partition, SaveOptions, SearchOptions};
use tempfile::TempDir;

async fn client_with(mode: Mode) -> (TempDir, HistoryClient) {
    let tmp = TempDir::new().unwrap();
    let config = StoreConfig {
        url: ":memory:".into(),
        data_dir: Some(tmp.path().to_path_buf()),
        mode,
        ..Default::default()
    };
    let client = HistoryClient::connect(config).await.unwrap();
    (tmp, client)
}

#[tokio::test]
async fn save_then_read_global() {
    let (_tmp, client) = client_with(Mode::Global).await;
    client
        .save_command("echo hi", Some("hi"), SaveOptions::default())
        .await
        .unwrap();

    let rows = client.get_history(1, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].command, "echo hi");
    assert_eq!(rows[0].response.as_deref(), Some("hi"));
}

#[tokio::test]
async fn save_then_read_machine() {
    let (_tmp, client) = client_with(Mode::Machine).await;
    client
        .save_command("uname -a", Some("Linux"), SaveOptions::default())
        .await
        .unwrap();

    let rows = client.get_history(1, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].command, "uname -a");
    assert_eq!(rows[0].machine_id.as_deref(), Some(client.machine_id()));
}

#[tokio::test]
async fn global_scenario_no_user() {
    let (_tmp, client) = client_with(Mode::Global).await;
    client
        .save_command("ls -la", Some("file1\nfile2"), SaveOptions::default())
        .await
        .unwrap();

    let rows = client.get_history(10, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].command, "ls -la");
    assert_eq!(rows[0].machine_id.as_deref(), Some(client.machine_id()));
    assert_eq!(rows[0].user_id, None);
}

#[tokio::test]
async fn user_mode_requires_resolved_user() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.set_mode(Mode::User);

    let err = client
        .save_command("whoami", None, SaveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ModeRequiresUser));

    let err = client.get_history(10, 0).await.unwrap_err();
    assert!(matches!(err, StoreError::ModeRequiresUser));
}

#[tokio::test]
async fn user_mode_round_trip() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.create_user("alice", Some("Alice"), None).await.unwrap();
    let user = client.set_user(Some("alice")).await.unwrap().unwrap();
    assert_eq!(client.mode(), Mode::User);

    client
        .save_command("git log", Some("commits"), SaveOptions::default())
        .await
        .unwrap();

    let rows = client.get_history(1, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id.as_deref(), Some(user.id.as_str()));
}

#[tokio::test]
async fn unknown_user_preserves_mode() {
    let (_tmp, mut client) = client_with(Mode::Machine).await;

    let err = client.set_user(Some("ghost")).await.unwrap_err();
    match err {
        StoreError::UserNotFound(name) => assert_eq!(name, "ghost"),
        other => panic!("expected UserNotFound, got {:?}", other),
    }
    assert_eq!(client.mode(), Mode::Machine);
    assert_eq!(client.user_id(), None);
}

#[tokio::test]
async fn inactive_user_is_not_found() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.create_user("alice", None, None).await.unwrap();
    assert!(client.deactivate_user("alice").await.unwrap());

    let err = client.set_user(Some("alice")).await.unwrap_err();
    match err {
        StoreError::UserNotFound(name) => assert_eq!(name, "alice"),
        other => panic!("expected UserNotFound, got {:?}", other),
    }
    assert_eq!(client.mode(), Mode::Global);
}

#[tokio::test]
async fn clearing_user_resets_to_global() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.create_user("bob", None, None).await.unwrap();
    client.set_user(Some("bob")).await.unwrap();
    assert_eq!(client.mode(), Mode::User);

    client.set_user(None).await.unwrap();
    assert_eq!(client.mode(), Mode::Global);
    assert_eq!(client.user_id(), None);
}

#[tokio::test]
async fn invalid_mode_name_leaves_mode_unchanged() {
    let (_tmp, mut client) = client_with(Mode::Machine).await;

    let err = client.set_mode_name("bogus").unwrap_err();
    assert!(matches!(err, StoreError::InvalidMode(_)));
    assert!(err.to_string().contains("bogus"));
    assert_eq!(client.mode(), Mode::Machine);

    client.set_mode_name("hybrid").unwrap();
    assert_eq!(client.mode(), Mode::Hybrid);
}

#[tokio::test]
async fn hybrid_fan_out_writes_all_three_partitions() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.create_user("bob", None, None).await.unwrap();
    client.set_user(Some("bob")).await.unwrap();
    client.set_mode(Mode::Hybrid);

    let receipt = client
        .save_command("git status", Some("clean"), SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(receipt.written.len(), 3);
    assert!(receipt.id_for(Partition::Global).is_some());
    assert!(receipt.id_for(Partition::User).is_some());
    assert!(receipt.id_for(Partition::Machine).is_some());

    // One row per partition, all sharing the process session id.
    for mode in [Mode::Global, Mode::User, Mode::Machine] {
        client.set_mode(mode);
        let rows = client.get_history(10, 0).await.unwrap();
        assert_eq!(rows.len(), 1, "partition for {:?}", mode);
        assert_eq!(rows[0].command, "git status");
        assert_eq!(rows[0].session_id.as_deref(), Some(client.session_id()));
    }
}

#[tokio::test]
async fn hybrid_without_user_skips_user_partition() {
    let (_tmp, client) = client_with(Mode::Hybrid).await;
    let receipt = client
        .save_command("top", None, SaveOptions::default())
        .await
        .unwrap();
    assert_eq!(receipt.written.len(), 2);
    assert!(receipt.id_for(Partition::User).is_none());

    let rows = client.get_history(10, 0).await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn total_commands_increments_once_per_save() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.create_user("bob", None, None).await.unwrap();
    client.set_user(Some("bob")).await.unwrap();
    client.set_mode(Mode::Hybrid);

    // Three partitions per save, but the counter moves once per call.
    client
        .save_command("make", None, SaveOptions::default())
        .await
        .unwrap();
    client
        .save_command("make test", None, SaveOptions::default())
        .await
        .unwrap();

    let machine = client.machine_info().await.unwrap();
    assert_eq!(machine.total_commands, 2);
}

#[tokio::test]
async fn session_command_count_tracks_saves() {
    let (_tmp, client) = client_with(Mode::Global).await;
    client
        .save_command("a", None, SaveOptions::default())
        .await
        .unwrap();
    client
        .save_command("b", None, SaveOptions::default())
        .await
        .unwrap();

    let session = client.session_info().await.unwrap();
    assert_eq!(session.command_count, 2);
    assert_eq!(session.id, client.session_id());
    assert_eq!(session.machine_id.as_deref(), Some(client.machine_id()));
    assert_eq!(session.ended_at, None);
}

#[tokio::test]
async fn hybrid_merge_orders_by_timestamp_desc() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.create_user("carol", None, None).await.unwrap();

    client
        .save_command("global cmd", None, SaveOptions::default())
        .await
        .unwrap();
    client.set_mode(Mode::Machine);
    client
        .save_command("machine cmd", None, SaveOptions::default())
        .await
        .unwrap();
    client.set_user(Some("carol")).await.unwrap();
    client
        .save_command("user cmd", None, SaveOptions::default())
        .await
        .unwrap();

    // Force distinct timestamps so the merge order is unambiguous.
    let conn = client.connection();
    let base = chrono::Utc::now().timestamp();
    conn.execute(
        "UPDATE history_global SET timestamp = ?",
        libsql::params![base - 30],
    )
    .await
    .unwrap();
    conn.execute(
        "UPDATE history_machine SET timestamp = ?",
        libsql::params![base - 10],
    )
    .await
    .unwrap();
    conn.execute(
        "UPDATE history_user SET timestamp = ?",
        libsql::params![base - 20],
    )
    .await
    .unwrap();

    client.set_mode(Mode::Hybrid);
    let rows = client.get_history(10, 0).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].command, "machine cmd");
    assert_eq!(rows[1].command, "user cmd");
    assert_eq!(rows[2].command, "global cmd");
    assert!(rows.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    assert_eq!(rows[0].source, Some(Partition::Machine));
    assert_eq!(rows[1].source, Some(Partition::User));
    assert_eq!(rows[2].source, Some(Partition::Global));
}

#[tokio::test]
async fn cache_keeps_a_running_average() {
    let (_tmp, client) = client_with(Mode::Global).await;
    client
        .update_command_cache("make build", Some("ok"), 100)
        .await
        .unwrap();
    client
        .update_command_cache("make build", Some("still ok"), 200)
        .await
        .unwrap();

    let entry = client.get_cached_command("make build").await.unwrap().unwrap();
    assert_eq!(entry.execution_count, 2);
    assert_eq!(entry.avg_execution_time_ms, 150.0);
    assert_eq!(entry.output.as_deref(), Some("still ok"));
    assert_eq!(entry.command, "make build");
}

#[tokio::test]
async fn cache_miss_outside_freshness_window() {
    let tmp = TempDir::new().unwrap();
    let config = StoreConfig {
        url: ":memory:".into(),
        data_dir: Some(tmp.path().to_path_buf()),
        cache_ttl_secs: 0,
        ..Default::default()
    };
    let client = HistoryClient::connect(config).await.unwrap();

    client
        .update_command_cache("date", Some("now"), 5)
        .await
        .unwrap();
    // The row exists but a zero-width window treats it as stale.
    assert!(client.get_cached_command("date").await.unwrap().is_none());
}

#[tokio::test]
async fn save_populates_cache_unless_suppressed() {
    let (_tmp, client) = client_with(Mode::Global).await;
    client
        .save_command(
            "cargo check",
            Some("ok"),
            SaveOptions {
                execution_time_ms: Some(40),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let entry = client.get_cached_command("cargo check").await.unwrap().unwrap();
    assert_eq!(entry.avg_execution_time_ms, 40.0);

    client
        .save_command(
            "cargo fmt",
            Some("ok"),
            SaveOptions {
                skip_cache: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(client.get_cached_command("cargo fmt").await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_command_is_a_cache_miss() {
    let (_tmp, client) = client_with(Mode::Global).await;
    assert!(client.get_cached_command("never ran").await.unwrap().is_none());
}

#[tokio::test]
async fn search_is_case_insensitive_substring() {
    let (_tmp, client) = client_with(Mode::Global).await;
    for (cmd, resp) in [
        ("git status", Some("clean")),
        ("git push", Some("done")),
        ("ls", Some("git_notes.txt")),
    ] {
        client
            .save_command(cmd, resp, SaveOptions::default())
            .await
            .unwrap();
    }

    let rows = client
        .search_history(
            "GIT",
            SearchOptions {
                limit: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    // Matches command text and response text alike.
    assert_eq!(rows.len(), 3);

    let rows = client
        .search_history(
            "push",
            SearchOptions {
                limit: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].command, "git push");
}

#[tokio::test]
async fn search_scope_override_does_not_touch_mode() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client
        .save_command("global only", None, SaveOptions::default())
        .await
        .unwrap();
    client.set_mode(Mode::Machine);
    client
        .save_command("machine only", None, SaveOptions::default())
        .await
        .unwrap();
    client.set_mode(Mode::Global);

    let rows = client
        .search_history(
            "only",
            SearchOptions {
                mode: Some(Mode::Machine),
                limit: Some(10),
            },
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].command, "machine only");
    assert_eq!(client.mode(), Mode::Global);
}

#[tokio::test]
async fn stats_snapshot_over_window() {
    let (_tmp, mut client) = client_with(Mode::Global).await;
    client.create_user("dave", None, None).await.unwrap();

    client
        .save_command("ls", None, SaveOptions::default())
        .await
        .unwrap();
    client
        .save_command("ls", None, SaveOptions::default())
        .await
        .unwrap();
    client
        .save_command("pwd", None, SaveOptions::default())
        .await
        .unwrap();

    let stats = client.get_stats(1).await.unwrap();
    assert_eq!(stats.global_commands, 3);
    assert_eq!(stats.user_commands, None);
    assert_eq!(stats.active_machines, 1);
    assert_eq!(stats.top_commands[0].command, "ls");
    assert_eq!(stats.top_commands[0].count, 2);

    client.set_user(Some("dave")).await.unwrap();
    client
        .save_command("whoami", None, SaveOptions::default())
        .await
        .unwrap();
    let stats = client.get_stats(1).await.unwrap();
    assert_eq!(stats.user_commands, Some(1));
    assert_eq!(stats.active_users, 1);
    assert_eq!(stats.window_days, 1);
}

#[tokio::test]
async fn complete_command_fills_response() {
    let (_tmp, client) = client_with(Mode::Global).await;
    let receipt = client
        .save_command("sleep 10", None, SaveOptions::default())
        .await
        .unwrap();
    let id = receipt.id_for(Partition::Global).unwrap();

    assert!(client
        .complete_command(Partition::Global, id, "done")
        .await
        .unwrap());

    let rows = client.get_history(1, 0).await.unwrap();
    assert_eq!(rows[0].response.as_deref(), Some("done"));
}

#[tokio::test]
async fn session_id_override_is_attached() {
    let (_tmp, client) = client_with(Mode::Global).await;
    let receipt = client
        .save_command(
            "imported",
            None,
            SaveOptions {
                session_id: Some("session-0-migrated".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(receipt.session_id, "session-0-migrated");

    let rows = client.get_history(1, 0).await.unwrap();
    assert_eq!(rows[0].session_id.as_deref(), Some("session-0-migrated"));
}

#[tokio::test]
async fn tags_round_trip_as_json() {
    let (_tmp, client) = client_with(Mode::Global).await;
    client
        .save_command(
            "deploy",
            Some("ok"),
            SaveOptions {
                tags: vec!["ci".into(), "prod".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let rows = client.get_history(1, 0).await.unwrap();
    assert_eq!(
        rows[0].tags.as_deref(),
        Some(["ci".to_string(), "prod".to_string()].as_slice())
    );
}

#[tokio::test]
async fn bootstrap_is_idempotent_across_restarts() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("history.db");
    let config = StoreConfig {
        url: db_path.to_string_lossy().into_owned(),
        data_dir: Some(tmp.path().to_path_buf()),
        ..Default::default()
    };

    let client = HistoryClient::connect(config.clone()).await.unwrap();
    let machine_id = client.machine_id().to_string();
    let session_id = client.session_id().to_string();
    client
        .save_command("first run", None, SaveOptions::default())
        .await
        .unwrap();
    client.close().await.unwrap();

    // Second start: schema already exists, same machine id, new session,
    // previous data visible, previous session closed exactly once.
    let client = HistoryClient::connect(config).await.unwrap();
    assert_eq!(client.machine_id(), machine_id);
    assert_ne!(client.session_id(), session_id);

    let rows = client.get_history(10, 0).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].command, "first run");

    let conn = client.connection();
    let mut rows = conn
        .query(
            "SELECT ended_at FROM sessions WHERE id = ?",
            libsql::params![session_id],
        )
        .await
        .unwrap();
    let row = rows.next().await.unwrap().unwrap();
    assert!(matches!(
        row.get_value(0).unwrap(),
        libsql::Value::Integer(_)
    ));
}
