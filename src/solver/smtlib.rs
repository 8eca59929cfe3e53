use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use super::bv::{ptr_id, BvTerm, Problem, SortBv, Term};
use super::process::run_with_budget;
use super::sexpr::{parse_all, SExpr};
use super::{Model, Multiplicity, SolveBudget, SolveError, SolveOutcome, StateSolver};

/// Renders a problem as an SMT-LIB 2 `QF_BV` script. Shared sub-terms become
/// `define-fun`s so the script stays linear in the size of the term DAG.
pub struct ScriptWriter {
    out: String,
    names: HashMap<usize, String>,
}

impl ScriptWriter {
    pub fn new() -> Self { Self { out: String::new(), names: HashMap::new() } }

    pub fn render(problem: &Problem, blocked: Option<&Model>) -> String {
        let mut w = Self::new();
        w.line("(set-logic QF_BV)");
        for (name, sort) in &problem.vars {
            w.line(&format!("(declare-const {} {})", name, sort_str(*sort)));
        }
        for c in &problem.assertions {
            let l = w.term(&c.lhs);
            let r = w.term(&c.rhs);
            w.line(&format!("(assert (= {l} {r}))"));
        }
        if let Some(m) = blocked {
            let eqs: Vec<String> = problem.vars.iter()
                .filter_map(|(name, sort)| m.value(name).map(|v| format!("(= {} {})", name, value_str(v, *sort))))
                .collect();
            if !eqs.is_empty() {
                w.line(&format!("(assert (not (and {})))", eqs.join(" ")));
            }
        }
        w.line("(check-sat)");
        if blocked.is_none() && !problem.vars.is_empty() {
            let names: Vec<&str> = problem.vars.iter().map(|(n, _)| n.as_str()).collect();
            w.line(&format!("(get-value ({}))", names.join(" ")));
        }
        w.line("(exit)");
        w.out
    }

    fn line(&mut self, s: &str) {
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn term(&mut self, t: &Term) -> String {
        match &**t {
            BvTerm::Const { name, .. } => return name.clone(),
            BvTerm::Value { bits, sort } => return value_str(*bits, *sort),
            _ => {}
        }
        let key = ptr_id(t);
        if let Some(n) = self.names.get(&key) { return n.clone(); }
        let body = match &**t {
            BvTerm::Xor(a, b) => {
                let a = self.term(a);
                let b = self.term(b);
                format!("(bvxor {a} {b})")
            }
            BvTerm::Shl { a, amount } => format!("(bvshl {} {})", self.term(a), value_str(*amount as u64, t.sort())),
            BvTerm::Lshr { a, amount } => format!("(bvlshr {} {})", self.term(a), value_str(*amount as u64, t.sort())),
            BvTerm::Const { .. } | BvTerm::Value { .. } => unreachable!(),
        };
        let name = format!("_t{}", self.names.len());
        let _ = writeln!(self.out, "(define-fun {} () {} {})", name, sort_str(t.sort()), body);
        self.names.insert(key, name.clone());
        name
    }
}

impl Default for ScriptWriter {
    fn default() -> Self { Self::new() }
}

fn sort_str(sort: SortBv) -> String { format!("(_ BitVec {})", sort.width) }

fn value_str(v: u64, sort: SortBv) -> String {
    let v = v & sort.mask();
    if sort.width % 4 == 0 {
        format!("#x{:0width$x}", v, width = (sort.width / 4) as usize)
    } else {
        format!("#b{:0width$b}", v, width = sort.width as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Sat(BTreeMap<String, u64>),
    Unsat,
    Unknown(String),
}

/// Reads the output of `check-sat` (and `get-value`, if present).
pub fn parse_response(output: &str) -> Result<Response> {
    let exprs = parse_all(output).context("malformed solver output")?;
    let Some(first) = exprs.first() else { bail!("solver produced no check-sat answer") };
    if let Some(msg) = error_message(first) { bail!("solver reported error: {}", msg) }
    let Some(status) = first.as_atom() else { bail!("expected check-sat answer, got {:?}", first) };
    match status {
        // `get-value` after unsat/unknown makes solvers print an error; it is expected.
        "unsat" => Ok(Response::Unsat),
        "unknown" | "timeout" => Ok(Response::Unknown(status.to_string())),
        "sat" => {
            if let Some(msg) = exprs.iter().skip(1).find_map(error_message) { bail!("solver reported error: {}", msg) }
            let mut values = BTreeMap::new();
            if let Some(SExpr::List(pairs)) = exprs.get(1) {
                for p in pairs {
                    let SExpr::List(kv) = p else { bail!("expected (name value) pair") };
                    if kv.len() != 2 { bail!("expected (name value) pair") }
                    let Some(name) = kv[0].as_atom() else { bail!("expected symbol in get-value") };
                    values.insert(name.trim_matches('|').to_string(), parse_bv_value(&kv[1])?);
                }
            }
            Ok(Response::Sat(values))
        }
        other => bail!("unexpected solver answer {}", other),
    }
}

fn error_message(e: &SExpr) -> Option<String> {
    let SExpr::List(items) = e else { return None };
    if items.first().and_then(SExpr::as_atom) != Some("error") { return None }
    Some(items.get(1).and_then(SExpr::as_atom).unwrap_or("").trim_matches('"').to_string())
}

fn parse_bv_value(e: &SExpr) -> Result<u64> {
    match e {
        SExpr::Atom(s) if s.starts_with("#b") => u64::from_str_radix(&s[2..], 2).context("binary literal"),
        SExpr::Atom(s) if s.starts_with("#x") => u64::from_str_radix(&s[2..], 16).context("hex literal"),
        SExpr::List(items) if items.len() == 3 && items[0].as_atom() == Some("_") => {
            let Some(sym) = items[1].as_atom() else { bail!("malformed indexed literal") };
            let Some(digits) = sym.strip_prefix("bv") else { bail!("unsupported literal {}", sym) };
            digits.parse::<u64>().context("bv value")
        }
        _ => bail!("unsupported bv literal {:?}", e),
    }
}

/// Runs an external SMT-LIB 2 solver (for example `z3 -in`) as a child
/// process, one process per query.
#[derive(Debug, Clone)]
pub struct SmtLibSolver {
    pub command: String,
    pub args: Vec<String>,
    pub check_uniqueness: bool,
}

impl SmtLibSolver {
    pub fn new<S: Into<String>>(command: S, args: Vec<String>) -> Self {
        Self { command: command.into(), args, check_uniqueness: true }
    }

    pub fn z3() -> Self { Self::new("z3", vec!["-in".to_string(), "-smt2".to_string()]) }

    fn query(&self, script: &str, budget: &SolveBudget) -> Result<Response, SolveError> {
        let out = run_with_budget(&self.command, &self.args, script, budget)?;
        // Solvers print `(error ...)` and still exit 0 in some modes; parse first.
        match parse_response(&out.stdout) {
            Ok(r) => Ok(r),
            Err(e) if out.status.success() => Err(SolveError::Backend(format!("{e:#}"))),
            Err(e) => Err(SolveError::Backend(format!("{} exited with {}: {e:#}; stderr: {}", self.command, out.status, out.stderr.trim()))),
        }
    }
}

impl StateSolver for SmtLibSolver {
    fn name(&self) -> &str { &self.command }

    fn check(&self, problem: &Problem, budget: &SolveBudget) -> Result<SolveOutcome, SolveError> {
        let deadline = budget.deadline();
        let script = ScriptWriter::render(problem, None);
        debug!(solver = %self.command, bytes = script.len(), "rendered smt-lib script");
        let values = match self.query(&script, budget)? {
            Response::Unsat => return Ok(SolveOutcome::Unsat),
            Response::Unknown(why) => {
                info!(solver = %self.command, why = %why, "solver gave up");
                return Err(SolveError::Timeout);
            }
            Response::Sat(values) => values,
        };
        for (name, _) in &problem.vars {
            if !values.contains_key(name) {
                return Err(SolveError::Backend(format!("model is missing {name}")));
            }
        }
        let mut model = Model { values, multiplicity: Multiplicity::Unchecked };
        if !self.check_uniqueness {
            return Ok(SolveOutcome::Sat(model));
        }

        let remaining = deadline.map(|d| d.saturating_duration_since(std::time::Instant::now()));
        let script = ScriptWriter::render(problem, Some(&model));
        model.multiplicity = match self.query(&script, &budget.with_timeout(remaining)) {
            Ok(Response::Unsat) => Multiplicity::Unique,
            Ok(Response::Sat(_)) => Multiplicity::Multiple { free_bits: None },
            Ok(Response::Unknown(_)) | Err(SolveError::Timeout) => Multiplicity::Unchecked,
            Err(e) => return Err(e),
        };
        Ok(SolveOutcome::Sat(model))
    }
}

#[cfg(test)]
mod tests {
    use super::super::bv::Constraint;
    use super::*;

    fn problem() -> Problem {
        let mut p = Problem::new();
        let x = p.declare("x", SortBv::W64);
        let y = BvTerm::shl(&x, 3);
        let z = BvTerm::xor(&y, &BvTerm::lshr(&y, 5));
        p.assert(Constraint::eq(z, BvTerm::value(0x10, SortBv::W64)));
        p
    }

    #[test]
    fn renders_shared_terms_once() {
        let s = ScriptWriter::render(&problem(), None);
        assert!(s.starts_with("(set-logic QF_BV)\n(declare-const x (_ BitVec 64))\n"));
        assert!(s.contains("(define-fun _t0 () (_ BitVec 64) (bvshl x #x0000000000000003))"));
        assert_eq!(s.matches("bvshl").count(), 1);
        assert!(s.contains("(assert (= _t2 #x0000000000000010))"));
        assert!(s.contains("(check-sat)\n(get-value (x))\n"));
    }

    #[test]
    fn renders_blocking_clause() {
        let model = Model { values: BTreeMap::from([("x".to_string(), 2)]), multiplicity: Multiplicity::Unchecked };
        let s = ScriptWriter::render(&problem(), Some(&model));
        assert!(s.contains("(assert (not (and (= x #x0000000000000002))))"));
        assert!(!s.contains("get-value"));
    }

    #[test]
    fn parses_model_in_all_literal_forms() {
        let r = parse_response("sat\n((a #x00000000000000ff) (b #b101) (c (_ bv42 64)))\n").unwrap();
        let Response::Sat(v) = r else { panic!("expected sat") };
        assert_eq!(v["a"], 0xff);
        assert_eq!(v["b"], 5);
        assert_eq!(v["c"], 42);
    }

    #[test]
    fn parses_unsat_unknown_and_errors() {
        assert_eq!(parse_response("unsat\n").unwrap(), Response::Unsat);
        assert_eq!(parse_response("unsat\n(error \"line 9 column 10: model is not available\")\n").unwrap(), Response::Unsat);
        assert_eq!(parse_response("unknown\n").unwrap(), Response::Unknown("unknown".into()));
        assert!(parse_response("(error \"line 1 column 2: unknown constant\")\n").is_err());
        assert!(parse_response("").is_err());
    }
}
