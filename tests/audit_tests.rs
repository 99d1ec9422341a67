//! Integration tests for the hash-chained audit log.

use std::fs;
use std::thread::sleep;
use std::time::Duration;

use envx::audit::{self, AuditLog, EntryFields, Op};
use tempfile::TempDir;

fn scoped(name: &str) -> EntryFields {
    EntryFields {
        scope: Some(vec![name.to_string()]),
        ..EntryFields::default()
    }
}

fn read_lines(log: &AuditLog) -> Vec<String> {
    fs::read_to_string(log.path())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn write_lines(log: &AuditLog, lines: &[String]) {
    fs::write(log.path(), format!("{}\n", lines.join("\n"))).unwrap();
}

fn log_with(n: usize) -> (TempDir, AuditLog) {
    let dir = TempDir::new().unwrap();
    let log = AuditLog::new(dir.path());
    for i in 0..n {
        log.append(Op::Set, scoped(&format!("KEY_{i}"))).unwrap();
    }
    (dir, log)
}

#[test]
fn untouched_chain_verifies() {
    let (_dir, log) = log_with(10);
    let report = log.verify().unwrap();
    assert_eq!(report.total_entries, 10);
    assert!(report.is_intact());
}

#[test]
fn edited_line_breaks_the_next_link() {
    let (_dir, log) = log_with(5);
    let mut lines = read_lines(&log);

    // Edit line 3; line 4 no longer matches it.
    lines[2] = lines[2].replace("KEY_2", "KEY_X");
    write_lines(&log, &lines);

    let report = log.verify().unwrap();
    assert_eq!(report.total_entries, 5);
    assert_eq!(report.breaks, vec![4]);
}

#[test]
fn deleted_line_breaks_the_chain() {
    let (_dir, log) = log_with(5);
    let mut lines = read_lines(&log);
    lines.remove(2);
    write_lines(&log, &lines);

    let report = log.verify().unwrap();
    assert_eq!(report.total_entries, 4);
    assert_eq!(report.breaks, vec![3]);
}

#[test]
fn reordered_lines_break_the_chain() {
    let (_dir, log) = log_with(4);
    let mut lines = read_lines(&log);
    lines.swap(1, 2);
    write_lines(&log, &lines);

    let report = log.verify().unwrap();
    assert!(!report.is_intact());
    assert!(report.breaks.contains(&2));
}

#[test]
fn appending_after_tampering_does_not_heal_it() {
    let (_dir, log) = log_with(3);
    let mut lines = read_lines(&log);
    lines[0] = lines[0].replace("KEY_0", "KEY_Z");
    write_lines(&log, &lines);

    log.append(Op::Get, EntryFields::default()).unwrap();

    let report = log.verify().unwrap();
    assert_eq!(report.total_entries, 4);
    assert_eq!(report.breaks, vec![2]);
}

#[test]
fn show_returns_the_most_recent_entries_in_order() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        audit::append(dir.path(), Op::Set, scoped(&format!("K{i}"))).unwrap();
        sleep(Duration::from_millis(2));
    }

    let last = audit::show(dir.path(), 3).unwrap();
    assert_eq!(last.len(), 3);
    let scopes: Vec<String> = last
        .iter()
        .map(|e| e.scope.as_ref().unwrap()[0].clone())
        .collect();
    assert_eq!(scopes, vec!["K2", "K3", "K4"]);
    assert!(last.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let report = audit::verify(dir.path()).unwrap();
    assert_eq!(report.total_entries, 5);
    assert!(report.breaks.is_empty());
}

#[test]
fn show_zero_returns_everything() {
    let (_dir, log) = log_with(7);
    assert_eq!(log.show(0).unwrap().len(), 7);
    assert_eq!(log.show(100).unwrap().len(), 7);
}

#[test]
fn entries_roundtrip_their_fields() {
    let dir = TempDir::new().unwrap();
    let fields = EntryFields {
        scope: Some(vec!["A".into(), "B".into()]),
        session_id: Some("6f1c2d8e-0000-4000-8000-000000000000".into()),
        command: Some("npm".into()),
        exit_code: Some(0),
        ..EntryFields::default()
    };
    let written = audit::append(dir.path(), Op::EnvelopeRun, fields).unwrap();

    let read = audit::show(dir.path(), 1).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].op, Op::EnvelopeRun);
    assert_eq!(read[0].exit_code, Some(0));
    assert_eq!(read[0].session_id, written.session_id);
}

#[test]
fn append_after_unterminated_last_line_keeps_every_entry() {
    let (_dir, log) = log_with(2);

    // Lose the final newline, as an editor save or a cut-short write might.
    let contents = fs::read_to_string(log.path()).unwrap();
    fs::write(log.path(), contents.trim_end_matches('\n')).unwrap();
    assert!(log.verify().unwrap().is_intact());

    log.append(Op::Get, EntryFields::default()).unwrap();

    let report = log.verify().unwrap();
    assert_eq!(report.total_entries, 3);
    assert!(report.is_intact(), "breaks: {:?}", report.breaks);
    assert_eq!(log.show(0).unwrap().len(), 3);
    assert!(fs::read_to_string(log.path()).unwrap().ends_with('\n'));
}
