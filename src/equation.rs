//! Equation parser.
//!
//! Reads the `# generated equations` block of a reduction report (the
//! textual output of the structural reducer) and emits an ordered stream
//! of typed [`Equation`]s. Order of emission is preserved — the TFG
//! builder is order-sensitive for ancestry bookkeeping.

use regex::Regex;

use crate::error::{KongError, Result};

/// The two arc families an equation can introduce in the Token Flow Graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationKind {
    /// `R |- a = ...` or `I |- a <= ...`: redundant arcs from each RHS
    /// token to the LHS token.
    Redundant,
    /// `A |- a = p + q`: agglomerated arcs from the LHS token to each RHS
    /// token.
    Agglomeration,
}

/// A single reduction equation, already split into its LHS/RHS tokens.
///
/// Tokens are either place/variable identifiers or (RHS-only) integer
/// literals; the TFG builder resolves each token's role (place of N,
/// place of R, additional variable, constant root) when it materialises
/// nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    pub kind: EquationKind,
    pub lhs: String,
    pub rhs: Vec<String>,
    /// Set when the source line used `<=` rather than `=`, regardless of
    /// the `KIND` tag (mirrors the reducer's own output, which can emit
    /// `R`-tagged lines with an inequation body).
    pub interval: bool,
}

/// The shape classification from `spec.md` §9: a tagged sum used for
/// display (`--show-equations`) and tests, independent of the arc-wiring
/// rule the TFG builder applies (which only cares about `kind`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquationShape {
    /// `a = k` (k a non-negative integer literal).
    Constant { lhs: String, k: u64 },
    /// `a = b` (a single non-literal RHS token).
    Duplicated { lhs: String, rhs: String },
    /// `p = q + r` where the LHS is itself a place identifier.
    Shortcut { lhs: String, rhs: (String, String) },
    /// `a = p + q` (agglomeration).
    Agglomeration { lhs: String, rhs: (String, String) },
}

impl Equation {
    /// Classify this equation's RHS shape for display/introspection.
    ///
    /// Panics only if an agglomeration equation was parsed with a RHS
    /// arity other than two, which the parser never produces.
    pub fn shape(&self) -> EquationShape {
        match self.kind {
            EquationKind::Agglomeration => {
                assert_eq!(self.rhs.len(), 2, "agglomeration RHS must have arity 2");
                EquationShape::Agglomeration {
                    lhs: self.lhs.clone(),
                    rhs: (self.rhs[0].clone(), self.rhs[1].clone()),
                }
            }
            EquationKind::Redundant => {
                if self.rhs.len() == 1 {
                    if let Ok(k) = self.rhs[0].parse::<u64>() {
                        EquationShape::Constant {
                            lhs: self.lhs.clone(),
                            k,
                        }
                    } else {
                        EquationShape::Duplicated {
                            lhs: self.lhs.clone(),
                            rhs: self.rhs[0].clone(),
                        }
                    }
                } else {
                    EquationShape::Shortcut {
                        lhs: self.lhs.clone(),
                        rhs: (self.rhs[0].clone(), self.rhs[1].clone()),
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for Equation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.kind {
            EquationKind::Redundant if self.interval => "I",
            EquationKind::Redundant => "R",
            EquationKind::Agglomeration => "A",
        };
        let op = if self.interval { "<=" } else { "=" };
        write!(f, "{} |- {} {} {}", tag, self.lhs, op, self.rhs.join(" + "))
    }
}

/// Parse the equation block of a reduction report.
///
/// `text` is the full contents of the reduced `.net` file. Lines are
/// expected between a `# generated equations` header and a blank line. A
/// leading `# net ...` comment line is a no-op.
pub fn parse_equations(text: &str) -> Result<Vec<Equation>> {
    let header = Regex::new(r"(?s)# generated equations\n(.*?)\n\n").expect("valid regex");
    let Some(captures) = header.captures(text) else {
        return Ok(Vec::new());
    };
    let block = captures.get(1).expect("group 1 always present").as_str();

    let mut equations = Vec::new();
    for (line_no, raw_line) in block.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.trim_start_matches("# ").starts_with("net") {
            continue;
        }
        equations.push(parse_equation_line(line, line_no + 1)?);
    }
    Ok(equations)
}

fn parse_equation_line(line: &str, line_no: usize) -> Result<Equation> {
    let malformed = || KongError::MalformedEquation {
        line: line_no,
        text: line.to_string(),
    };

    let interval = line.contains("<=");

    let normalized = line
        .replace(" |- ", " ")
        .replace(" <= ", " ")
        .replace(" = ", " ")
        .replace(" + ", " ")
        .replace('{', "")
        .replace('}', "");

    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(malformed());
    }

    let kind = match tokens[0] {
        "R" | "I" => EquationKind::Redundant,
        "A" => EquationKind::Agglomeration,
        _ => return Err(malformed()),
    };

    let lhs = tokens[1].to_string();
    let rhs: Vec<String> = tokens[2..].iter().map(|t| (*t).to_string()).collect();
    if rhs.is_empty() {
        return Err(malformed());
    }
    if kind == EquationKind::Agglomeration && rhs.len() != 2 {
        return Err(malformed());
    }

    Ok(Equation {
        kind,
        lhs,
        rhs,
        interval,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!("# generated equations\n{}\n\n", body)
    }

    #[test]
    fn parses_constant_equation() {
        let eqs = parse_equations(&wrap("R |- a = 2")).unwrap();
        assert_eq!(eqs.len(), 1);
        assert_eq!(
            eqs[0].shape(),
            EquationShape::Constant {
                lhs: "a".to_string(),
                k: 2
            }
        );
    }

    #[test]
    fn parses_dead_constant_equation() {
        let eqs = parse_equations(&wrap("R |- a = 0")).unwrap();
        assert_eq!(
            eqs[0].shape(),
            EquationShape::Constant {
                lhs: "a".to_string(),
                k: 0
            }
        );
    }

    #[test]
    fn parses_duplication() {
        let eqs = parse_equations(&wrap("R |- p = q")).unwrap();
        assert_eq!(
            eqs[0].shape(),
            EquationShape::Duplicated {
                lhs: "p".to_string(),
                rhs: "q".to_string()
            }
        );
    }

    #[test]
    fn parses_shortcut() {
        let eqs = parse_equations(&wrap("R |- p = q + r")).unwrap();
        assert_eq!(
            eqs[0].shape(),
            EquationShape::Shortcut {
                lhs: "p".to_string(),
                rhs: ("q".to_string(), "r".to_string())
            }
        );
    }

    #[test]
    fn parses_agglomeration() {
        let eqs = parse_equations(&wrap("A |- a = p + q")).unwrap();
        assert_eq!(
            eqs[0].shape(),
            EquationShape::Agglomeration {
                lhs: "a".to_string(),
                rhs: ("p".to_string(), "q".to_string())
            }
        );
    }

    #[test]
    fn parses_interval_equation() {
        let eqs = parse_equations(&wrap("I |- a <= b + c")).unwrap();
        assert!(eqs[0].interval);
        assert_eq!(eqs[0].kind, EquationKind::Redundant);
    }

    #[test]
    fn strips_braces() {
        let eqs = parse_equations(&wrap("R |- {p.1} = {q.2}")).unwrap();
        assert_eq!(eqs[0].lhs, "p.1");
        assert_eq!(eqs[0].rhs, vec!["q.2".to_string()]);
    }

    #[test]
    fn tolerates_leading_net_comment() {
        let eqs = parse_equations(&wrap("# net foo\nR |- p = q")).unwrap();
        assert_eq!(eqs.len(), 1);
    }

    #[test]
    fn empty_input_yields_no_equations() {
        let eqs = parse_equations("no equations here").unwrap();
        assert!(eqs.is_empty());
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = parse_equations(&wrap("X |- p = q")).unwrap_err();
        assert!(matches!(err, KongError::MalformedEquation { .. }));
    }

    #[test]
    fn preserves_order() {
        let eqs = parse_equations(&wrap("R |- a = 1\nR |- b = a")).unwrap();
        assert_eq!(eqs[0].lhs, "a");
        assert_eq!(eqs[1].lhs, "b");
    }
}
