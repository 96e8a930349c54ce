//! `if` / `then` / `endif` with assertions as predicates

mod support;

use std::time::Duration;
use tokio::time::Instant;

use support::{run, Element, ScriptedDriver};

fn checkbox(selected: bool) -> ScriptedDriver {
    ScriptedDriver::new().with_element("#box", Element::new("INPUT", "on").selected(selected))
}

#[tokio::test]
async fn false_predicate_skips_branch() {
    let script = r##"
        select "#box"
        if selected then echo "yes" endif
        echo "done"
    "##;
    let (interpreter, result) = run(script, checkbox(false)).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["done"]);
}

#[tokio::test]
async fn true_predicate_runs_branch() {
    let script = r##"
        select "#box"
        if selected then echo "yes" endif
    "##;
    let (interpreter, result) = run(script, checkbox(true)).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["yes"]);
}

#[tokio::test]
async fn predicates_get_a_single_attempt() {
    let script = r##"
        wait 30
        select "#box"
        if check "off" then echo "off" endif
    "##;
    let start = Instant::now();
    let (interpreter, result) = run(script, checkbox(true)).await;
    result.unwrap();
    assert!(interpreter.transcript().is_empty());
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn multiple_predicates_and_together() {
    let script = r##"
        select "#box"
        if displayed selected then echo "both" endif
        if displayed not selected then echo "displayed only" endif
    "##;
    let (interpreter, result) = run(script, checkbox(false)).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["displayed only"]);
}

#[tokio::test]
async fn missing_element_is_a_false_predicate() {
    let script = r##"
        if select "#cookie-banner" then click endif
        echo "continued"
    "##;
    let (interpreter, result) = run(script, ScriptedDriver::new()).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["continued"]);
    assert!(!interpreter.driver().called("click"));
}

#[tokio::test]
async fn skipped_branch_suppresses_side_effects() {
    let script = r##"
        select "#box"
        if selected then
            click
            send "x"
            alias late { echo "late" }
            fail "never"
        endif
    "##;
    let (interpreter, result) = run(script, checkbox(false)).await;
    result.unwrap();
    assert!(interpreter.driver().calls.is_empty());
    assert!(!interpreter.aliases().contains("late"));
}

#[tokio::test]
async fn conditionals_nest() {
    let script = r##"
        select "#box"
        if displayed then
            echo "outer"
            if selected then echo "inner" endif
            echo "after inner"
        endif
        if selected then
            if displayed then echo "hidden" endif
        endif
    "##;
    let (interpreter, result) = run(script, checkbox(false)).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["outer", "after inner"]);
}

#[tokio::test]
async fn alias_as_predicate() {
    let script = r##"
        alias ready { select "#box" selected }
        if ready then echo "ready" endif
        echo "end"
    "##;
    let (interpreter, result) = run(script, checkbox(false)).await;
    result.unwrap();
    assert_eq!(interpreter.transcript(), ["end"]);
}

#[tokio::test]
async fn misplaced_control_keywords_are_syntax_errors() {
    for script in ["then", "endif", "if displayed endif", "if displayed then echo \"x\""] {
        let (_, result) = run(script, checkbox(true)).await;
        let failure = result.unwrap_err();
        assert!(failure.is_syntax(), "{}: {}", script, failure);
    }
}

#[tokio::test]
async fn syntax_errors_are_not_captured_as_predicates() {
    let (_, result) = run("if sleep \"x\" then endif", ScriptedDriver::new()).await;
    assert!(result.unwrap_err().is_syntax());
}
