//! The shared wait budget and the assertion retry loop

mod support;

use std::time::Duration;
use tokio::time::Instant;

use support::{run, Element, ScriptedDriver};
use uiscript_engine::ScriptError;

fn status(pending: &[&str], text: &str) -> ScriptedDriver {
    ScriptedDriver::new().with_element("#status", Element::new("DIV", text).with_pending(pending))
}

#[tokio::test]
async fn check_succeeds_after_two_failures_within_budget() {
    let script = r##"
        wait 5
        select "#status"
        check "done"
    "##;
    let start = Instant::now();
    let (interpreter, result) = run(script, status(&["loading", "loading"], "done")).await;
    result.unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(interpreter.driver().text_reads, 3);
}

#[tokio::test]
async fn exhausted_budget_reports_failure_once() {
    let script = r##"
        wait 1
        select "#status"
        check "done"
        echo "unreachable"
    "##;
    let start = Instant::now();
    let (interpreter, result) = run(script, status(&[], "loading")).await;
    let elapsed = start.elapsed();

    let failure = result.unwrap_err();
    assert!(matches!(failure.error, ScriptError::Assertion(_)));
    assert_eq!(failure.token.as_deref(), Some("check"));
    assert_eq!(failure.diagnostic().matches("expected \"done\"").count(), 1);
    assert!(elapsed >= Duration::from_secs(1), "gave up after {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(3), "overran budget: {:?}", elapsed);
    assert!(interpreter.transcript().is_empty());
}

#[tokio::test]
async fn budget_is_a_deadline_not_a_per_statement_timeout() {
    // The sleep spends the whole budget, so the check gets one attempt
    let script = r##"
        wait 0.3
        sleep 0.4
        select "#status"
        check "done"
    "##;
    let (interpreter, result) = run(script, status(&["loading"], "done")).await;
    assert!(result.is_err());
    assert_eq!(interpreter.driver().text_reads, 1);
}

#[tokio::test]
async fn zero_budget_fails_on_first_attempt() {
    let script = r##"
        wait 0
        select "#status"
        check "done"
    "##;
    let (interpreter, result) = run(script, status(&["loading"], "done")).await;
    assert!(result.is_err());
    assert_eq!(interpreter.driver().text_reads, 1);
}

#[tokio::test]
async fn push_and_pop_restore_the_deadline() {
    let script = r##"
        wait 0
        push wait
        wait 5
        pop wait
        select "#status"
        check "done"
    "##;
    let (_, result) = run(script, status(&["loading"], "done")).await;
    assert!(matches!(result.unwrap_err().error, ScriptError::Assertion(_)));

    let script = r##"
        wait 5
        push wait
        wait 0
        pop wait
        select "#status"
        check "done"
    "##;
    let (_, result) = run(script, status(&["loading"], "done")).await;
    result.unwrap();
}

#[tokio::test]
async fn pop_without_push_is_syntax_error() {
    let (_, result) = run("pop wait", ScriptedDriver::new()).await;
    let failure = result.unwrap_err();
    assert!(failure.is_syntax());
    assert_eq!(failure.token.as_deref(), Some("pop"));
}

#[tokio::test]
async fn missing_element_retries_until_budget() {
    let start = Instant::now();
    let (_, result) = run("wait 0.2 select \"#nowhere\"", ScriptedDriver::new()).await;
    let failure = result.unwrap_err();
    assert!(failure.is_retryable());
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn negated_locate_passes_when_absent() {
    let script = r##"
        wait 5
        not select "#nowhere"
        echo "gone"
    "##;
    let start = Instant::now();
    let (interpreter, result) = run(script, ScriptedDriver::new()).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["gone"]);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn negated_check_fails_when_text_matches() {
    let script = r##"
        wait 0
        select "#status"
        not check "done"
    "##;
    let (_, result) = run(script, status(&[], "done")).await;
    let failure = result.unwrap_err();
    assert!(failure.to_string().contains("expected not check \"done\""));
}

#[tokio::test]
async fn geometry_assertions_use_rounded_rect() {
    let driver = ScriptedDriver::new().with_element(
        "#box",
        Element::new("DIV", "").with_rect(10.4, 19.6, 100.0, 50.2),
    );
    let script = r##"
        wait 0
        select "#box"
        at 10,20
        at *,15:25
        size 100,*
        size 90:110,50
        tag "div"
        displayed
        enabled
        not selected
    "##;
    let (_, result) = run(script, driver).await;
    result.unwrap();
}

#[tokio::test]
async fn wait_for_navigation_retries_ready_state() {
    let mut driver = ScriptedDriver::new();
    driver.ready_states = ["loading", "interactive"].iter().map(|s| s.to_string()).collect();
    let (interpreter, result) = run("wait 5 wait-for \"navigation\"", driver).await;
    result.unwrap();
    assert!(interpreter.driver().ready_states.is_empty());

    let mut driver = ScriptedDriver::new();
    driver.ready_states = std::iter::repeat("loading".to_string()).take(100).collect();
    let (_, result) = run("wait 0 wait-for \"navigation\"", driver).await;
    assert!(matches!(result.unwrap_err().error, ScriptError::Timeout(_)));
}

#[tokio::test]
async fn huge_wait_clamps_instead_of_overflowing() {
    let (interpreter, result) =
        run("wait 10000000000000000000\necho \"after\"", ScriptedDriver::new()).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["after"]);
}

#[tokio::test]
async fn huge_default_wait_clamps_instead_of_overflowing() {
    let (interpreter, result) =
        run("default wait 10000000000000000000\necho \"after\"", ScriptedDriver::new()).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["after"]);
}

#[tokio::test]
async fn huge_sleep_clamps_instead_of_panicking() {
    let pending = tokio::time::timeout(
        Duration::from_millis(200),
        run("sleep 100000000000000000000\necho \"after\"", ScriptedDriver::new()),
    )
    .await;
    // Still sleeping when the timeout fires
    assert!(pending.is_err());
}

#[tokio::test]
async fn not_click_consumes_the_negation() {
    let driver = ScriptedDriver::new().with_element("#a", Element::new("DIV", "x"));
    let script = r##"
        wait 0
        not click
        select "#a"
        check "x"
    "##;
    let (interpreter, result) = run(script, driver).await;
    result.unwrap();
    assert!(!interpreter.driver().called("click"));
}
