// tests/process_tests.rs

#![cfg(unix)]

use cash::{
    ChannelState, InterpreterRegistry, ProcessError, Session, SpawnOptions, StdioMode,
    core::text::quote,
};
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::time::timeout;

fn sh_session() -> Session {
    let registry = InterpreterRegistry::discover();
    Session::new(registry.sh()).expect("sh should be available on unix")
}

#[tokio::test]
async fn test_echo_settles_with_output() {
    let finished = sh_session().exec("echo hi").unwrap().await.unwrap();
    assert_eq!(finished.stdout, "hi\n");
    assert_eq!(finished.stdall, "hi\n");
    assert_eq!(finished.stderr, "");
    assert_eq!(finished.code, 0);
    assert_eq!(finished.interpreter, "sh");
}

#[tokio::test]
async fn test_non_zero_exit_fails_unless_ignored() {
    let err = sh_session().exec("exit 3").unwrap().await.unwrap_err();
    assert!(matches!(err, ProcessError::NonZeroExit(3)));

    let finished = sh_session()
        .with_ignore_exit_code(true)
        .exec("echo partial; exit 3")
        .unwrap()
        .await
        .unwrap();
    assert_eq!(finished.code, 3);
    assert_eq!(finished.stdout, "partial\n");
}

#[tokio::test]
async fn test_channels_await_policy_too() {
    let process = sh_session().exec("echo out; exit 4").unwrap();
    let stdout = process.stdout().unwrap().clone();
    assert!(matches!(stdout.await, Err(ProcessError::NonZeroExit(4))));
    assert_eq!(process.stdout().unwrap().snapshot(), "out\n");
}

#[tokio::test]
async fn test_stdout_and_stderr_are_separated_and_merged() {
    let finished = sh_session().exec("echo A; echo B 1>&2").unwrap().await.unwrap();
    assert_eq!(finished.stdout, "A\n");
    assert_eq!(finished.stderr, "B\n");
    assert!(finished.stdall == "A\nB\n" || finished.stdall == "B\nA\n");
}

#[tokio::test]
async fn test_stdin_round_trip() {
    let process = sh_session().exec("cat").unwrap();
    process.write("hello ").await.unwrap();
    process.write("world").await.unwrap();
    process.close_stdin().await.unwrap();

    let finished = timeout(Duration::from_secs(10), process).await.unwrap().unwrap();
    assert_eq!(finished.stdout, "hello world");
}

#[tokio::test]
async fn test_write_without_stdin_fails() {
    let session = sh_session().with_spawn_options(SpawnOptions {
        stdin: StdioMode::Null,
        ..SpawnOptions::default()
    });
    let process = session.exec("true").unwrap();
    assert!(process.stdin().is_none());
    assert!(matches!(process.write("x").await, Err(ProcessError::NoInputStream)));
    process.await.unwrap();
}

#[tokio::test]
async fn test_unpiped_streams_have_no_channels() {
    let session = sh_session().with_spawn_options(SpawnOptions {
        stdout: StdioMode::Null,
        stderr: StdioMode::Null,
        ..SpawnOptions::default()
    });
    let process = session.exec("echo hidden").unwrap();
    assert!(process.stdout().is_none());
    assert!(process.stderr().is_none());
    assert!(process.stdall().is_none());
    let finished = process.await.unwrap();
    assert_eq!(finished.stdout, "");
}

#[tokio::test]
async fn test_stdall_exists_with_a_single_pipe() {
    let session = sh_session().with_spawn_options(SpawnOptions {
        stderr: StdioMode::Null,
        ..SpawnOptions::default()
    });
    let process = session.exec("echo only; echo dropped 1>&2").unwrap();
    assert!(process.stderr().is_none());
    let stdall = process.stdall().unwrap().clone();
    assert_eq!(stdall.await.unwrap(), "only\n");
}

#[tokio::test]
async fn test_streaming_sees_chunks_after_subscribing() {
    let process = sh_session().exec("read line; echo \"got $line\"").unwrap();
    let mut stream = process.stdout().unwrap().subscribe();

    process.write("ping\n").await.unwrap();
    let chunks: Vec<String> = timeout(Duration::from_secs(10), (&mut stream).collect::<Vec<_>>())
        .await
        .unwrap()
        .into_iter()
        .map(|chunk| chunk.unwrap())
        .collect();
    assert_eq!(chunks.concat(), "got ping\n");
    assert_eq!(process.stdout().unwrap().state(), ChannelState::Closed);
    process.await.unwrap();
}

#[tokio::test]
async fn test_exec_parts_inserts_values_verbatim() {
    let name = quote("two words");
    let finished = sh_session()
        .exec_parts(&["printf '%s|' ", " end"], &[&name])
        .unwrap()
        .await
        .unwrap();
    assert_eq!(finished.stdout, "two words|end|");
}

#[tokio::test]
async fn test_killed_process_reports_code_zero() {
    let finished = sh_session().exec("kill -9 $$").unwrap().await.unwrap();
    assert_eq!(finished.code, 0);
}

#[tokio::test]
async fn test_environment_and_cwd_are_applied() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut options = SpawnOptions {
        cwd: Some(dir.path().to_path_buf()),
        ..SpawnOptions::default()
    };
    options.env.insert("CASH_GREETING".into(), "hola".into());

    let finished = sh_session()
        .with_spawn_options(options)
        .exec("echo \"$CASH_GREETING\"; pwd")
        .unwrap()
        .await
        .unwrap();
    let mut lines = finished.stdout.lines();
    assert_eq!(lines.next(), Some("hola"));
    let pwd = std::path::PathBuf::from(lines.next().unwrap());
    assert_eq!(
        pwd.canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
}

#[tokio::test]
async fn test_background_descendant_does_not_delay_settlement() {
    let started = Instant::now();
    let process = sh_session().exec("sleep 5 & echo hi").unwrap();
    let stdout = process.stdout().unwrap().clone();

    let finished = timeout(Duration::from_secs(3), process)
        .await
        .expect("the process settles when sh exits")
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(finished.stdout, "hi\n");
    // The sleeping child still holds the pipe.
    assert_ne!(stdout.state(), ChannelState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stdall_snapshot_matches_stdall_channel() {
    let script = "i=0; while [ $i -lt 300 ]; do echo out$i; echo err$i 1>&2; i=$((i+1)); done";
    let process = sh_session().exec(script).unwrap();
    let stdall = process.stdall().unwrap().clone();

    let finished = process.await.unwrap();
    let merged = stdall.await.unwrap();
    assert_eq!(finished.stdall, merged);
    assert_eq!(finished.stdout.lines().count(), 300);
    assert_eq!(finished.stderr.lines().count(), 300);
}
