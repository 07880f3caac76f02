//! End-to-end scenarios run through the actual `privvy` binary, driving a
//! script file to completion the way a user invoking the CLI would.

use std::io::Write;
use std::process::{Command, Output};

fn run_script(source: &str) -> Output {
    let mut file = tempfile::Builder::new().suffix(".privvy").tempfile().expect("create temp script");
    file.write_all(source.as_bytes()).expect("write temp script");
    Command::new(env!("CARGO_BIN_EXE_privvy")).arg(file.path()).output().expect("run privvy binary")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout).lines().map(str::to_string).collect()
}

#[test]
fn closure_counter_increments_across_calls() {
    let output = run_script(
        r#"
        fun makeCounter() { let n = 0; fun inc() { n = n + 1; return n } return inc }
        let c = makeCounter(); print(c()); print(c()); print(c())
        "#,
    );
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["1", "2", "3"]);
}

#[test]
fn single_inheritance_dispatches_through_this() {
    let output = run_script(
        r#"
        class A { fun name() { return "A" } }
        class B extends A { fun name() { return "B/" + this.name2() } fun name2() { return "x" } }
        print((new B()).name())
        "#,
    );
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["B/x"]);
}

#[test]
fn or_is_value_preserving_across_falsy_and_truthy_operands() {
    let output = run_script(r#"print(0 or "fallback"); print("kept" or "ignored"); print(null or false)"#);
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["fallback", "kept", "false"]);
}

#[test]
fn for_loop_scoping_leaks_no_binding_past_the_loop() {
    let output = run_script("for (let i = 0; i < 3; i = i + 1) { print(i) }\nprint(i)");
    assert_eq!(stdout_lines(&output), vec!["0", "1", "2"]);
    assert!(!output.status.success(), "referencing 'i' after the loop must fail");
}

#[test]
fn array_and_map_mutation_is_visible_through_later_reads() {
    let output = run_script(
        r#"
        let a = [1,2,3]; a[1] = 99; print(a[0]); print(a[1]); print(len(a))
        let d = dict(["k", 10]); print(d["k"])
        "#,
    );
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["1", "99", "3", "10"]);
}

#[test]
fn division_by_zero_fails_the_process_with_a_runtime_error() {
    let output = run_script("print(1/0)");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("division by zero"), "stderr was: {stderr}");
}

#[test]
fn sqlite_backed_model_round_trips_a_record() {
    let output = run_script(
        r#"
        let db = Database(":memory:")
        let User = Model("users", dict(["id", "INTEGER PRIMARY KEY", "name", "TEXT"]))
        User.migrate(db)
        let id = User.create(db, dict(["name", "Ada"]))
        let row = User.find(db, id)
        print(row["name"])
        db.close()
        "#,
    );
    assert!(output.status.success(), "stderr was: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_lines(&output), vec!["Ada"]);
}

#[test]
fn sqlite_backed_model_count_reaches_zero_after_delete() {
    let output = run_script(
        r#"
        let db = Database(":memory:")
        let User = Model("users", dict(["id", "INTEGER PRIMARY KEY", "name", "TEXT"]))
        User.migrate(db)
        let id = User.create(db, dict(["name", "Ada"]))
        User.delete(db, id)
        print(User.count(db))
        "#,
    );
    assert!(output.status.success(), "stderr was: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_lines(&output), vec!["0"]);
}
