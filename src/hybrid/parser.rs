//! Declarative argument parser for `FT.HYBRID` (§4.9).
//!
//! Arguments are registered with specifications (name, type, required,
//! range, allowed values, default) the way the teacher's `cli.rs` derives
//! a `clap::Parser` from struct fields — here the "struct" is the
//! `HybridPlan` below and the "derive" is hand-rolled because the token
//! stream is a Redis-style command, not a shell command line. The parser
//! consumes tokens left to right, dispatching on the recognized keyword at
//! each position, and emits structured errors for missing/invalid/duplicate
//! arguments.

use std::collections::HashMap;

use crate::query::filter::Expr;
use crate::query::sort::SortDirection;

use super::fusion::FusionMethod;

/// Declared shape of one recognized optional argument, used only for
/// error messages and documentation — the dispatch itself is a match on
/// the keyword string (§4.9 table).
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub takes_value: bool,
}

pub const ARG_SPECS: &[ArgSpec] = &[
    ArgSpec { name: "LIMIT", takes_value: true },
    ArgSpec { name: "SORTBY", takes_value: true },
    ArgSpec { name: "WITHCURSOR", takes_value: false },
    ArgSpec { name: "PARAMS", takes_value: true },
    ArgSpec { name: "TIMEOUT", takes_value: true },
    ArgSpec { name: "FORMAT", takes_value: true },
    ArgSpec { name: "GROUPBY", takes_value: true },
    ArgSpec { name: "APPLY", takes_value: true },
    ArgSpec { name: "LOAD", takes_value: true },
    ArgSpec { name: "FILTER", takes_value: true },
    ArgSpec { name: "WITHSCORES", takes_value: false },
    ArgSpec { name: "EXPLAINSCORE", takes_value: false },
    ArgSpec { name: "COMBINE", takes_value: true },
];

#[derive(Debug, Clone, PartialEq)]
pub enum HybridParseError {
    UnknownArgument(String),
    MissingValue(&'static str),
    Duplicate(&'static str),
    InvalidValue { arg: &'static str, reason: String },
    LimitOutOfRange { offset: i64, limit: i64, max: i64 },
    OffsetOverflow,
}

impl std::fmt::Display for HybridParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HybridParseError::UnknownArgument(s) => write!(f, "unknown argument `{s}`"),
            HybridParseError::MissingValue(name) => write!(f, "{name}: missing value"),
            HybridParseError::Duplicate(name) => write!(f, "{name}: specified more than once"),
            HybridParseError::InvalidValue { arg, reason } => write!(f, "{arg}: {reason}"),
            HybridParseError::LimitOutOfRange { offset, limit, max } => write!(
                f,
                "LIMIT {offset} {limit} exceeds the maximum of {max} results"
            ),
            HybridParseError::OffsetOverflow => write!(f, "LIMIT offset overflows"),
        }
    }
}

impl std::error::Error for HybridParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFormat {
    String,
    Expand,
}

#[derive(Debug, Clone)]
pub struct ReduceArg {
    pub function: String,
    pub args: Vec<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroupByArg {
    pub properties: Vec<String>,
    pub reducers: Vec<ReduceArg>,
}

#[derive(Debug, Clone)]
pub struct ApplyArg {
    pub expr_source: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub enum LoadArg {
    Fields(Vec<String>),
    All,
}

/// Fully parsed `FT.HYBRID` arguments (§4.9). `Expr` parsing itself is out
/// of scope here (the expression grammar lives in `query::filter`); APPLY
/// and FILTER keep the raw source string for a later compile pass, the way
/// a real aggregation-expression compiler is a separate stage.
#[derive(Debug, Clone, Default)]
pub struct HybridPlan {
    pub offset: i64,
    pub limit: i64,
    pub count_only: bool,
    pub sortby: Vec<(String, SortDirection)>,
    pub with_cursor: bool,
    pub cursor_count: Option<u64>,
    pub cursor_max_idle_ms: Option<u64>,
    pub params: HashMap<String, String>,
    pub timeout_ms: Option<u64>,
    pub format: Option<NumericFormat>,
    pub groupby: Vec<GroupByArg>,
    pub apply: Vec<ApplyArg>,
    pub load: Option<LoadArg>,
    pub filter: Vec<String>,
    pub with_scores: bool,
    pub explain_score: bool,
    pub num_ssstring: bool,
    pub index_prefixes: bool,
    pub combine: FusionMethod,
}

const DEFAULT_MAX_RESULTS: i64 = 1_000_000;
const DEFAULT_MAX_CURSOR_IDLE_MS: u64 = 300_000;

struct Cursor<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<&'a str> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn next_value(&mut self, arg: &'static str) -> Result<&'a str, HybridParseError> {
        self.next().ok_or(HybridParseError::MissingValue(arg))
    }

    fn next_int(&mut self, arg: &'static str) -> Result<i64, HybridParseError> {
        self.next_value(arg)?
            .parse::<i64>()
            .map_err(|e| HybridParseError::InvalidValue { arg, reason: e.to_string() })
    }

    fn next_uint(&mut self, arg: &'static str) -> Result<u64, HybridParseError> {
        self.next_value(arg)?
            .parse::<u64>()
            .map_err(|e| HybridParseError::InvalidValue { arg, reason: e.to_string() })
    }
}

/// Parse the optional-argument tail of `FT.HYBRID` into a [`HybridPlan`].
/// `max_results` bounds LIMIT (§8 boundary behaviors); `max_cursor_idle_ms`
/// is the global clamp for `WITHCURSOR MAXIDLE`.
pub fn parse_hybrid_args(
    tokens: &[String],
    max_results: i64,
    max_cursor_idle_ms: u64,
) -> Result<HybridPlan, HybridParseError> {
    let mut plan = HybridPlan {
        combine: FusionMethod::default(),
        ..Default::default()
    };
    let mut seen_limit = false;
    let mut seen_params = false;
    let mut seen_cursor = false;
    let mut seen_timeout = false;
    let mut seen_format = false;
    let mut seen_load = false;
    let mut seen_combine = false;

    let mut c = Cursor { tokens, pos: 0 };
    while let Some(tok) = c.next() {
        match tok.to_ascii_uppercase().as_str() {
            "LIMIT" => {
                if seen_limit {
                    return Err(HybridParseError::Duplicate("LIMIT"));
                }
                seen_limit = true;
                let offset = c.next_int("LIMIT")?;
                let limit = c.next_int("LIMIT")?;
                if offset < 0 {
                    return Err(HybridParseError::OffsetOverflow);
                }
                if offset > i64::MAX - limit.max(0) {
                    return Err(HybridParseError::OffsetOverflow);
                }
                if limit < 0 || limit > max_results {
                    return Err(HybridParseError::LimitOutOfRange {
                        offset,
                        limit,
                        max: max_results,
                    });
                }
                plan.offset = offset;
                plan.limit = limit;
                plan.count_only = limit == 0;
            }
            "SORTBY" => {
                let count = c.next_int("SORTBY")?;
                if count < 0 {
                    return Err(HybridParseError::InvalidValue {
                        arg: "SORTBY",
                        reason: "negative field count".into(),
                    });
                }
                let mut remaining = count as usize;
                while remaining > 0 {
                    let field = c.next_value("SORTBY")?.to_string();
                    remaining -= 1;
                    let dir = match c.peek() {
                        Some("ASC") => {
                            c.next();
                            SortDirection::Asc
                        }
                        Some("DESC") => {
                            c.next();
                            SortDirection::Desc
                        }
                        _ => SortDirection::Asc,
                    };
                    plan.sortby.push((field, dir));
                }
            }
            "WITHCURSOR" => {
                if seen_cursor {
                    return Err(HybridParseError::Duplicate("WITHCURSOR"));
                }
                seen_cursor = true;
                plan.with_cursor = true;
                loop {
                    match c.peek().map(str::to_ascii_uppercase) {
                        Some(ref s) if s == "COUNT" => {
                            c.next();
                            plan.cursor_count = Some(c.next_uint("COUNT")?);
                        }
                        Some(ref s) if s == "MAXIDLE" => {
                            c.next();
                            let ms = c.next_uint("MAXIDLE")?;
                            plan.cursor_max_idle_ms = Some(ms.min(max_cursor_idle_ms));
                        }
                        _ => break,
                    }
                }
            }
            "PARAMS" => {
                if seen_params {
                    return Err(HybridParseError::Duplicate("PARAMS"));
                }
                seen_params = true;
                let count = c.next_int("PARAMS")?;
                if count < 0 || count % 2 != 0 {
                    return Err(HybridParseError::InvalidValue {
                        arg: "PARAMS",
                        reason: "count must be an even, non-negative number".into(),
                    });
                }
                let pairs = count as usize / 2;
                for _ in 0..pairs {
                    let k = c.next_value("PARAMS")?.to_string();
                    let v = c.next_value("PARAMS")?.to_string();
                    plan.params.insert(k, v);
                }
            }
            "TIMEOUT" => {
                if seen_timeout {
                    return Err(HybridParseError::Duplicate("TIMEOUT"));
                }
                seen_timeout = true;
                plan.timeout_ms = Some(c.next_uint("TIMEOUT")?);
            }
            "FORMAT" => {
                if seen_format {
                    return Err(HybridParseError::Duplicate("FORMAT"));
                }
                seen_format = true;
                let v = c.next_value("FORMAT")?;
                plan.format = Some(match v.to_ascii_uppercase().as_str() {
                    "STRING" => NumericFormat::String,
                    "EXPAND" => NumericFormat::Expand,
                    other => {
                        return Err(HybridParseError::InvalidValue {
                            arg: "FORMAT",
                            reason: format!("unknown format `{other}`"),
                        })
                    }
                });
            }
            "GROUPBY" => {
                let count = c.next_int("GROUPBY")?;
                if count < 0 {
                    return Err(HybridParseError::InvalidValue {
                        arg: "GROUPBY",
                        reason: "negative property count".into(),
                    });
                }
                let mut properties = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    properties.push(c.next_value("GROUPBY")?.to_string());
                }
                let mut reducers = Vec::new();
                while c.peek().map(str::to_ascii_uppercase).as_deref() == Some("REDUCE") {
                    c.next();
                    let function = c.next_value("REDUCE")?.to_string();
                    let nargs = c.next_int("REDUCE")?;
                    if nargs < 0 {
                        return Err(HybridParseError::InvalidValue {
                            arg: "REDUCE",
                            reason: "negative argument count".into(),
                        });
                    }
                    let mut args = Vec::with_capacity(nargs as usize);
                    for _ in 0..nargs {
                        args.push(c.next_value("REDUCE")?.to_string());
                    }
                    let alias = match c.peek().map(str::to_ascii_uppercase) {
                        Some(ref s) if s == "AS" => {
                            c.next();
                            Some(c.next_value("AS")?.to_string())
                        }
                        _ => None,
                    };
                    reducers.push(ReduceArg { function, args, alias });
                }
                plan.groupby.push(GroupByArg { properties, reducers });
            }
            "APPLY" => {
                let expr_source = c.next_value("APPLY")?.to_string();
                let alias = match c.peek().map(str::to_ascii_uppercase) {
                    Some(ref s) if s == "AS" => {
                        c.next();
                        Some(c.next_value("AS")?.to_string())
                    }
                    _ => None,
                };
                plan.apply.push(ApplyArg { expr_source, alias });
            }
            "LOAD" => {
                if seen_load {
                    return Err(HybridParseError::Duplicate("LOAD"));
                }
                seen_load = true;
                match c.peek() {
                    Some("*") => {
                        c.next();
                        plan.load = Some(LoadArg::All);
                    }
                    _ => {
                        let count = c.next_int("LOAD")?;
                        if count < 0 {
                            return Err(HybridParseError::InvalidValue {
                                arg: "LOAD",
                                reason: "negative field count".into(),
                            });
                        }
                        let mut fields = Vec::with_capacity(count as usize);
                        for _ in 0..count {
                            fields.push(c.next_value("LOAD")?.to_string());
                        }
                        plan.load = Some(LoadArg::Fields(fields));
                    }
                }
            }
            "FILTER" => {
                plan.filter.push(c.next_value("FILTER")?.to_string());
            }
            "WITHSCORES" => plan.with_scores = true,
            "EXPLAINSCORE" => plan.explain_score = true,
            "_NUM_SSTRING" => plan.num_ssstring = true,
            "_INDEX_PREFIXES" => plan.index_prefixes = true,
            "COMBINE" => {
                if seen_combine {
                    return Err(HybridParseError::Duplicate("COMBINE"));
                }
                seen_combine = true;
                let method = c.next_value("COMBINE")?;
                plan.combine = match method.to_ascii_uppercase().as_str() {
                    "RRF" => {
                        let mut k = super::fusion::HYBRID_DEFAULT_RRF_CONSTANT;
                        let mut window = super::fusion::HYBRID_DEFAULT_WINDOW;
                        loop {
                            match c.peek().map(str::to_ascii_uppercase) {
                                Some(ref s) if s == "CONSTANT" => {
                                    c.next();
                                    k = c.next_uint("CONSTANT")?;
                                }
                                Some(ref s) if s == "WINDOW" => {
                                    c.next();
                                    window = c.next_uint("WINDOW")? as usize;
                                }
                                _ => break,
                            }
                        }
                        FusionMethod::Rrf { k, window }
                    }
                    "LINEAR" => {
                        let mut alpha = None;
                        let mut beta = None;
                        loop {
                            match c.peek().map(str::to_ascii_uppercase) {
                                Some(ref s) if s == "ALPHA" => {
                                    c.next();
                                    alpha = Some(
                                        c.next_value("ALPHA")?
                                            .parse::<f64>()
                                            .map_err(|e| HybridParseError::InvalidValue {
                                                arg: "ALPHA",
                                                reason: e.to_string(),
                                            })?,
                                    );
                                }
                                Some(ref s) if s == "BETA" => {
                                    c.next();
                                    beta = Some(
                                        c.next_value("BETA")?
                                            .parse::<f64>()
                                            .map_err(|e| HybridParseError::InvalidValue {
                                                arg: "BETA",
                                                reason: e.to_string(),
                                            })?,
                                    );
                                }
                                _ => break,
                            }
                        }
                        FusionMethod::Linear {
                            alpha: alpha.unwrap_or(1.0),
                            beta: beta.unwrap_or(1.0),
                        }
                    }
                    other => {
                        return Err(HybridParseError::InvalidValue {
                            arg: "COMBINE",
                            reason: format!("unknown fusion method `{other}`"),
                        })
                    }
                };
            }
            other => return Err(HybridParseError::UnknownArgument(other.to_string())),
        }
    }

    if plan.limit == 0 && !seen_limit {
        plan.limit = 10;
    }
    Ok(plan)
}

/// Compile a raw APPLY/FILTER source string into an [`Expr`]. The real
/// aggregation-expression grammar is out of scope (spec §1 Non-goals);
/// this recognizes only bare field references (`@field`) and numeric
/// literals, which is enough to exercise the map/filter processors with
/// plans produced by this parser.
pub fn compile_expr_stub(source: &str, table: &mut crate::rlookup::RLookupTable) -> Expr {
    let trimmed = source.trim();
    if let Some(field) = trimmed.strip_prefix('@') {
        Expr::Field(table.get_key(field))
    } else if let Ok(n) = trimmed.parse::<f64>() {
        Expr::Const(serde_json::Value::from(n))
    } else {
        Expr::Const(serde_json::Value::String(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn limit_zero_zero_is_count_only() {
        let plan = parse_hybrid_args(&toks("LIMIT 0 0"), DEFAULT_MAX_RESULTS, DEFAULT_MAX_CURSOR_IDLE_MS).unwrap();
        assert!(plan.count_only);
    }

    #[test]
    fn limit_exceeding_max_results_is_rejected() {
        let err = parse_hybrid_args(&toks("LIMIT 0 2000000"), DEFAULT_MAX_RESULTS, DEFAULT_MAX_CURSOR_IDLE_MS)
            .unwrap_err();
        assert!(matches!(err, HybridParseError::LimitOutOfRange { .. }));
    }

    #[test]
    fn duplicate_params_is_rejected() {
        let err = parse_hybrid_args(&toks("PARAMS 2 a b PARAMS 2 c d"), DEFAULT_MAX_RESULTS, DEFAULT_MAX_CURSOR_IDLE_MS)
            .unwrap_err();
        assert_eq!(err, HybridParseError::Duplicate("PARAMS"));
    }

    #[test]
    fn sortby_defaults_to_ascending() {
        let plan = parse_hybrid_args(&toks("SORTBY 2 @score DESC @title"), DEFAULT_MAX_RESULTS, DEFAULT_MAX_CURSOR_IDLE_MS)
            .unwrap();
        assert_eq!(plan.sortby, vec![
            ("@score".to_string(), SortDirection::Desc),
            ("@title".to_string(), SortDirection::Asc),
        ]);
    }

    #[test]
    fn withcursor_maxidle_is_clamped_to_global_max() {
        let plan = parse_hybrid_args(&toks("WITHCURSOR MAXIDLE 999999999"), DEFAULT_MAX_RESULTS, 60_000).unwrap();
        assert_eq!(plan.cursor_max_idle_ms, Some(60_000));
    }

    #[test]
    fn combine_rrf_defaults() {
        let plan = parse_hybrid_args(&toks("COMBINE RRF"), DEFAULT_MAX_RESULTS, DEFAULT_MAX_CURSOR_IDLE_MS).unwrap();
        match plan.combine {
            FusionMethod::Rrf { k, window } => {
                assert_eq!(k, super::super::fusion::HYBRID_DEFAULT_RRF_CONSTANT);
                assert_eq!(window, super::super::fusion::HYBRID_DEFAULT_WINDOW);
            }
            _ => panic!("expected RRF"),
        }
    }

    #[test]
    fn combine_linear_with_alpha_beta() {
        let plan = parse_hybrid_args(&toks("COMBINE LINEAR ALPHA 0.5 BETA 0.5"), DEFAULT_MAX_RESULTS, DEFAULT_MAX_CURSOR_IDLE_MS)
            .unwrap();
        assert!(matches!(plan.combine, FusionMethod::Linear { alpha, beta } if alpha == 0.5 && beta == 0.5));
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = parse_hybrid_args(&toks("BOGUS"), DEFAULT_MAX_RESULTS, DEFAULT_MAX_CURSOR_IDLE_MS).unwrap_err();
        assert_eq!(err, HybridParseError::UnknownArgument("BOGUS".into()));
    }

    #[test]
    fn groupby_with_reduce_and_alias() {
        let plan = parse_hybrid_args(
            &toks("GROUPBY 1 @brand REDUCE COUNT 0 AS total"),
            DEFAULT_MAX_RESULTS,
            DEFAULT_MAX_CURSOR_IDLE_MS,
        )
        .unwrap();
        assert_eq!(plan.groupby.len(), 1);
        let g = &plan.groupby[0];
        assert_eq!(g.properties, vec!["@brand"]);
        assert_eq!(g.reducers[0].function, "COUNT");
        assert_eq!(g.reducers[0].alias.as_deref(), Some("total"));
    }
}
