//! Statistics parsing for compiler and solver diagnostic text.
//!
//! Rules are regular expressions over free-form lines and are tied to the
//! toolchain version that printed them. A field whose rule does not match is
//! left out of the record; nothing is zero-filled.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

/// One parsed statistic.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Count(u64),
    Number(f64),
    Duration(Duration),
    Text(String),
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Count(n) => serializer.serialize_u64(*n),
            StatValue::Number(x) => serializer.serialize_f64(*x),
            // Fractional seconds.
            StatValue::Duration(d) => serializer.serialize_f64(d.as_secs_f64()),
            StatValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl std::fmt::Display for StatValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatValue::Count(n) => write!(f, "{}", n),
            StatValue::Number(x) => write!(f, "{}", x),
            StatValue::Duration(d) => write!(f, "{:?}", d),
            StatValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Compiler-stage and solver-stage statistics of one solve.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub compiler: BTreeMap<String, StatValue>,
    pub solver: BTreeMap<String, StatValue>,
}

impl Statistics {
    pub fn is_empty(&self) -> bool {
        self.compiler.is_empty() && self.solver.is_empty()
    }

    /// `section.field: value` lines for plain-text display.
    pub fn render_lines(&self) -> Vec<String> {
        let compiler = self
            .compiler
            .iter()
            .map(|(k, v)| format!("compiler.{}: {}", k, v));
        let solver = self
            .solver
            .iter()
            .map(|(k, v)| format!("solver.{}: {}", k, v));
        compiler.chain(solver).collect()
    }
}

/// Solver-side rule set, keyed by solver identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsBackend {
    /// Per-line timing and search counters at the end of the commentary.
    Gecode,
    /// One `MIP Status:` summary line.
    Mip,
    /// No rules for this backend.
    Unsupported(String),
}

/// Statistics plus the commentary left for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsReport {
    pub statistics: Statistics,
    /// Commentary lines no rule consumed, in original order.
    pub leftover: Vec<String>,
    /// Diagnostic notice, e.g. for an unsupported backend.
    pub notice: Option<String>,
}

#[derive(Clone, Copy)]
enum FieldKind {
    Count,
    Millis,
}

static PATHS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Paths:\s*(\d+)").expect("valid pattern"));
static VARIABLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Variables:\s*(.*)$").expect("valid pattern"));
static CONSTRAINTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Constraints:\s*(.*)$").expect("valid pattern"));
static TYPED_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+(bool|int|float|set)\b").expect("valid pattern"));
static PROBLEM_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"This is a (\w+) problem").expect("valid pattern"));
static LEADING_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*%*\s*").expect("valid pattern"));

static GECODE_RULES: Lazy<Vec<(Regex, &'static str, FieldKind)>> = Lazy::new(|| {
    let rule = |pattern: &str, field: &'static str, kind: FieldKind| {
        (Regex::new(pattern).expect("valid pattern"), field, kind)
    };
    vec![
        rule(r"^runtime:\s*\S+\s*\(([0-9.]+) ms\)", "runtime", FieldKind::Millis),
        rule(r"^solvetime:\s*\S+\s*\(([0-9.]+) ms\)", "solvetime", FieldKind::Millis),
        rule(r"^solutions:\s*(\d+)", "solutions", FieldKind::Count),
        rule(r"^variables:\s*(\d+)", "variables", FieldKind::Count),
        rule(r"^propagators:\s*(\d+)", "propagators", FieldKind::Count),
        rule(r"^propagations:\s*(\d+)", "propagations", FieldKind::Count),
        rule(r"^nodes:\s*(\d+)", "nodes", FieldKind::Count),
        rule(r"^failures:\s*(\d+)", "failures", FieldKind::Count),
        rule(r"^restarts:\s*(\d+)", "restarts", FieldKind::Count),
        rule(r"^peak depth:\s*(\d+)", "peak depth", FieldKind::Count),
    ]
});

const NUMBER: &str = r"([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)";

static MIP_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"MIP Status:\s*([^,]+)").expect("valid pattern"));
static MIP_OBJECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"Objective:\s*{}", NUMBER)).expect("valid pattern"));
static MIP_BOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"Best possible:\s*{}", NUMBER)).expect("valid pattern"));
static MIP_CPU: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CPU time:\s*([0-9.]+)").expect("valid pattern"));
static MIP_NODES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Nodes:\s*(\d+)").expect("valid pattern"));

fn strip_marker(line: &str) -> &str {
    match LEADING_COMMENT.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

fn millis(raw: &str) -> Option<Duration> {
    let ms: f64 = raw.parse().ok()?;
    (ms.is_finite() && ms >= 0.0).then(|| Duration::from_nanos((ms * 1e6).round() as u64))
}

fn seconds(raw: &str) -> Option<Duration> {
    let s: f64 = raw.parse().ok()?;
    (s.is_finite() && s >= 0.0).then(|| Duration::from_nanos((s * 1e9).round() as u64))
}

fn typed_counts(list: &str, suffix: &str, out: &mut BTreeMap<String, StatValue>) {
    for caps in TYPED_COUNT.captures_iter(list) {
        if let Ok(n) = caps[1].parse() {
            out.insert(format!("{} {}", &caps[2], suffix), StatValue::Count(n));
        }
    }
}

/// Parse flattening statistics from the compiler's error stream.
pub fn parse_compiler_stats<'a, I>(lines: I) -> BTreeMap<String, StatValue>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stats = BTreeMap::new();
    for line in lines {
        let line = strip_marker(line).trim_end();
        if let Some(caps) = PATHS.captures(line) {
            if let Ok(n) = caps[1].parse() {
                stats.insert("paths".to_string(), StatValue::Count(n));
            }
        } else if let Some(caps) = VARIABLES.captures(line) {
            typed_counts(&caps[1], "variables", &mut stats);
        } else if let Some(caps) = CONSTRAINTS.captures(line) {
            typed_counts(&caps[1], "constraints", &mut stats);
        } else if let Some(caps) = PROBLEM_CLASS.captures(line) {
            stats.insert(
                "problem class".to_string(),
                StatValue::Text(caps[1].to_string()),
            );
        }
    }
    stats
}

fn apply_gecode_rule(line: &str, stats: &mut BTreeMap<String, StatValue>) -> bool {
    for (pattern, field, kind) in GECODE_RULES.iter() {
        if let Some(caps) = pattern.captures(line) {
            let value = match kind {
                FieldKind::Count => caps[1].parse().ok().map(StatValue::Count),
                FieldKind::Millis => millis(&caps[1]).map(StatValue::Duration),
            };
            if let Some(value) = value {
                stats.insert(field.to_string(), value);
                return true;
            }
        }
    }
    false
}

/// Consume the statistics block at the end of Gecode's commentary.
///
/// Lines are walked from the last one backwards while they match a rule;
/// everything before the first non-matching line is returned unchanged.
fn parse_gecode(commentary: &[String]) -> (BTreeMap<String, StatValue>, Vec<String>) {
    let mut stats = BTreeMap::new();
    let mut leftover = Vec::new();
    let mut in_block = true;

    for line in commentary.iter().rev() {
        if in_block {
            let trimmed = line.trim();
            if trimmed.is_empty() || apply_gecode_rule(trimmed, &mut stats) {
                continue;
            }
            in_block = false;
        }
        leftover.push(line.clone());
    }
    leftover.reverse();
    (stats, leftover)
}

fn parse_mip_summary(line: &str) -> BTreeMap<String, StatValue> {
    let mut stats = BTreeMap::new();
    if let Some(caps) = MIP_STATUS.captures(line) {
        stats.insert(
            "status".to_string(),
            StatValue::Text(caps[1].trim().to_string()),
        );
    }
    if let Some(x) = MIP_OBJECTIVE
        .captures(line)
        .and_then(|c| c[1].parse::<f64>().ok())
    {
        stats.insert("objective".to_string(), StatValue::Number(x));
    }
    if let Some(x) = MIP_BOUND.captures(line).and_then(|c| c[1].parse::<f64>().ok()) {
        stats.insert("bound".to_string(), StatValue::Number(x));
    }
    if let Some(d) = MIP_CPU.captures(line).and_then(|c| seconds(&c[1])) {
        stats.insert("cpu time".to_string(), StatValue::Duration(d));
    }
    if let Some(n) = MIP_NODES.captures(line).and_then(|c| c[1].parse().ok()) {
        stats.insert("nodes".to_string(), StatValue::Count(n));
    }
    stats
}

fn parse_mip(commentary: &[String], solver_stderr: &str) -> (BTreeMap<String, StatValue>, Vec<String>) {
    if let Some(idx) = commentary.iter().position(|l| l.contains("MIP Status:")) {
        let stats = parse_mip_summary(&commentary[idx]);
        let mut leftover = commentary.to_vec();
        leftover.remove(idx);
        return (stats, leftover);
    }

    let stats = solver_stderr
        .lines()
        .find(|l| l.contains("MIP Status:"))
        .map(|l| parse_mip_summary(strip_marker(l)))
        .unwrap_or_default();
    (stats, commentary.to_vec())
}

/// Run the compiler rules and the backend's solver rules.
///
/// An unsupported backend yields an empty record and a notice, never an
/// error.
pub fn parse_statistics(
    backend: &StatsBackend,
    compiler_stderr: &str,
    commentary: &[String],
    solver_stderr: &str,
) -> StatsReport {
    let (solver, leftover) = match backend {
        StatsBackend::Gecode => parse_gecode(commentary),
        StatsBackend::Mip => parse_mip(commentary, solver_stderr),
        StatsBackend::Unsupported(name) => {
            return StatsReport {
                statistics: Statistics::default(),
                leftover: commentary.to_vec(),
                notice: Some(format!(
                    "Statistics parsing is not supported for solver {}",
                    name
                )),
            };
        }
    };

    StatsReport {
        statistics: Statistics {
            compiler: parse_compiler_stats(compiler_stderr.lines()),
            solver,
        },
        leftover,
        notice: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn variables_line_omits_absent_types() {
        let stats = parse_compiler_stats(["Variables: 3 bool, 5 int"]);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["bool variables"], StatValue::Count(3));
        assert_eq!(stats["int variables"], StatValue::Count(5));
        assert!(!stats.contains_key("float variables"));
        assert!(!stats.contains_key("set variables"));
    }

    #[test]
    fn compiler_block_is_fully_parsed() {
        let stderr = "Paths: 12\nVariables: 4 int, 1 set\nConstraints: 2 bool, 7 int\nThis is a minimization problem.\n";
        let stats = parse_compiler_stats(stderr.lines());
        assert_eq!(stats["paths"], StatValue::Count(12));
        assert_eq!(stats["set variables"], StatValue::Count(1));
        assert_eq!(stats["int constraints"], StatValue::Count(7));
        assert_eq!(
            stats["problem class"],
            StatValue::Text("minimization".into())
        );
    }

    #[test]
    fn compiler_lines_may_carry_comment_markers() {
        let stats = parse_compiler_stats(["%%% Paths: 3"]);
        assert_eq!(stats["paths"], StatValue::Count(3));
    }

    #[test]
    fn gecode_tail_is_consumed_and_leftover_keeps_order() {
        let commentary = lines(
            "first note\nsecond note\nruntime:       0.012 (12.500 ms)\nsolvetime:     0.001 (1.000 ms)\nsolutions:     1\nnodes:         3\nfailures:      0\nrestarts:      0\npeak depth:    2\n",
        );
        let report = parse_statistics(&StatsBackend::Gecode, "", &commentary, "");

        assert_eq!(report.leftover, vec!["first note", "second note"]);
        let solver = &report.statistics.solver;
        assert_eq!(
            solver["runtime"],
            StatValue::Duration(Duration::from_micros(12_500))
        );
        assert_eq!(solver["nodes"], StatValue::Count(3));
        assert_eq!(solver["peak depth"], StatValue::Count(2));
        assert!(!solver.contains_key("propagators"));
        assert!(report.notice.is_none());
    }

    #[test]
    fn gecode_stops_at_first_non_matching_line() {
        let commentary = lines("nodes: 99\nuser comment\nnodes: 5");
        let (stats, leftover) = parse_gecode(&commentary);
        assert_eq!(stats["nodes"], StatValue::Count(5));
        assert_eq!(leftover, vec!["nodes: 99", "user comment"]);
    }

    #[test]
    fn mip_summary_line_fields() {
        let commentary = lines(
            "MIP Status: Optimal, Objective: 42.5, Best possible: 42.5, CPU time: 0.25 sec, Nodes: 17\nafterwards",
        );
        let report = parse_statistics(&StatsBackend::Mip, "", &commentary, "");
        let solver = &report.statistics.solver;
        assert_eq!(solver["status"], StatValue::Text("Optimal".into()));
        assert_eq!(solver["objective"], StatValue::Number(42.5));
        assert_eq!(solver["bound"], StatValue::Number(42.5));
        assert_eq!(
            solver["cpu time"],
            StatValue::Duration(Duration::from_millis(250))
        );
        assert_eq!(solver["nodes"], StatValue::Count(17));
        assert_eq!(report.leftover, vec!["afterwards"]);
    }

    #[test]
    fn mip_summary_falls_back_to_solver_stderr() {
        let report = parse_statistics(
            &StatsBackend::Mip,
            "",
            &[],
            "% MIP Status: Infeasible, Nodes: 0\n",
        );
        let solver = &report.statistics.solver;
        assert_eq!(solver["status"], StatValue::Text("Infeasible".into()));
        assert_eq!(solver["nodes"], StatValue::Count(0));
        assert!(!solver.contains_key("objective"));
    }

    #[test]
    fn unsupported_backend_is_empty_with_notice() {
        let commentary = lines("nodes: 3");
        let report = parse_statistics(
            &StatsBackend::Unsupported("chuffed".into()),
            "Paths: 1",
            &commentary,
            "",
        );
        assert!(report.statistics.is_empty());
        assert_eq!(report.leftover, commentary);
        assert_eq!(
            report.notice.as_deref(),
            Some("Statistics parsing is not supported for solver chuffed")
        );
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let mut stats = Statistics::default();
        stats.solver.insert(
            "runtime".into(),
            StatValue::Duration(Duration::from_millis(1500)),
        );
        stats
            .compiler
            .insert("paths".into(), StatValue::Count(2));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["solver"]["runtime"], serde_json::json!(1.5));
        assert_eq!(json["compiler"]["paths"], serde_json::json!(2));
    }
}
