//! Tree-walking interpreter for compiled XPath 1.0 expressions.
//!
//! Evaluation is generic over [`DomNode`] and synchronous; there is no
//! internal concurrency. Node-set intermediates are kept in document order
//! and de-duplicated, so positions, unions and result sequences all follow
//! document order.

use core::cmp::Ordering;

use crate::context::NamespaceRegistry;
use crate::error::Error;
use crate::model::{DomNode, NodeKind};
use crate::object::ObjectValue;
use crate::parser::{ArithOp, Axis, CompOp, Expr, NodeTest, Step};

/// Internal value produced while walking an expression. Converted to
/// [`ObjectValue`] at the evaluation boundary.
enum Value<N> {
    Nodes(Vec<N>),
    Boolean(bool),
    Number(f64),
    Text(String),
}

struct Env<'a, N: DomNode> {
    document: &'a N,
    namespaces: &'a NamespaceRegistry,
}

/// Context item plus the proximity position/size predicates see.
struct Focus<'a, N: DomNode> {
    item: &'a N,
    position: usize,
    size: usize,
}

/// Run a compiled program against (context node, effective document,
/// namespace bindings). A match-nothing path is a success with an empty
/// node-set.
pub(crate) fn evaluate<N: DomNode>(
    program: &Expr,
    context_node: Option<&N>,
    document: &N,
    namespaces: &NamespaceRegistry,
) -> Result<ObjectValue<N>, Error> {
    let env = Env {
        document,
        namespaces,
    };
    let item = context_node.cloned().unwrap_or_else(|| document.clone());
    let focus = Focus {
        item: &item,
        position: 1,
        size: 1,
    };
    Ok(match eval_expr(program, &focus, &env)? {
        Value::Nodes(nodes) => ObjectValue::NodeSet(nodes.into_iter().collect()),
        Value::Boolean(b) => ObjectValue::Boolean(b),
        Value::Number(n) => ObjectValue::Number(n),
        Value::Text(s) => ObjectValue::String(s),
    })
}

fn eval_expr<N: DomNode>(
    expr: &Expr,
    focus: &Focus<'_, N>,
    env: &Env<'_, N>,
) -> Result<Value<N>, Error> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Literal(s) => Ok(Value::Text(s.clone())),
        Expr::Or(l, r) => {
            if ebv(&eval_expr(l, focus, env)?) {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(ebv(&eval_expr(r, focus, env)?)))
        }
        Expr::And(l, r) => {
            if !ebv(&eval_expr(l, focus, env)?) {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(ebv(&eval_expr(r, focus, env)?)))
        }
        Expr::Compare(op, l, r) => {
            let lv = eval_expr(l, focus, env)?;
            let rv = eval_expr(r, focus, env)?;
            Ok(Value::Boolean(compare_values(*op, &lv, &rv)))
        }
        Expr::Arith(op, l, r) => {
            let a = to_number(&eval_expr(l, focus, env)?);
            let b = to_number(&eval_expr(r, focus, env)?);
            let n = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Mod => a % b,
            };
            Ok(Value::Number(n))
        }
        Expr::Neg(inner) => Ok(Value::Number(-to_number(&eval_expr(inner, focus, env)?))),
        Expr::Union(l, r) => {
            let lv = eval_expr(l, focus, env)?;
            let rv = eval_expr(r, focus, env)?;
            let (Value::Nodes(mut a), Value::Nodes(b)) = (lv, rv) else {
                return Err(Error::evaluation("union requires node-set operands"));
            };
            a.extend(b);
            Ok(Value::Nodes(sort_document_order(a)?))
        }
        Expr::Path { absolute, steps } => {
            let start = if *absolute {
                vec![env.document.clone()]
            } else {
                vec![focus.item.clone()]
            };
            Ok(Value::Nodes(apply_steps(start, steps, env)?))
        }
        Expr::Filter {
            primary,
            predicates,
            steps,
        } => {
            let Value::Nodes(mut nodes) = eval_expr(primary, focus, env)? else {
                return Err(Error::evaluation(
                    "predicates and path steps require a node-set",
                ));
            };
            for pred in predicates {
                nodes = filter_by_predicate(nodes, pred, env)?;
            }
            Ok(Value::Nodes(apply_steps(nodes, steps, env)?))
        }
        Expr::Call { name, args } => call_function(name, args, focus, env),
    }
}

// ---------------------------------------------------------------------------
// Paths and axes

fn apply_steps<N: DomNode>(
    start: Vec<N>,
    steps: &[Step],
    env: &Env<'_, N>,
) -> Result<Vec<N>, Error> {
    let mut current = start;
    for step in steps {
        let mut out = Vec::new();
        for node in &current {
            let mut candidates = axis_nodes(node, step.axis);
            let mut matched = Vec::with_capacity(candidates.len());
            for c in candidates.drain(..) {
                if node_test_matches(&c, step.axis, &step.test, env)? {
                    matched.push(c);
                }
            }
            // Predicates see positions in axis order (reverse axes count
            // backwards from the context node).
            for pred in &step.predicates {
                matched = filter_by_predicate(matched, pred, env)?;
            }
            out.extend(matched);
        }
        current = sort_document_order(out)?;
    }
    Ok(current)
}

fn filter_by_predicate<N: DomNode>(
    nodes: Vec<N>,
    pred: &Expr,
    env: &Env<'_, N>,
) -> Result<Vec<N>, Error> {
    let size = nodes.len();
    let mut kept = Vec::new();
    for (i, n) in nodes.iter().enumerate() {
        let focus = Focus {
            item: n,
            position: i + 1,
            size,
        };
        let v = eval_expr(pred, &focus, env)?;
        let holds = match v {
            // A numeric predicate selects by proximity position.
            Value::Number(num) => (i + 1) as f64 == num,
            other => ebv(&other),
        };
        if holds {
            kept.push(n.clone());
        }
    }
    Ok(kept)
}

fn descendants<N: DomNode>(node: &N, out: &mut Vec<N>) {
    for c in node.children() {
        out.push(c.clone());
        descendants(&c, out);
    }
}

fn ancestors<N: DomNode>(node: &N) -> Vec<N> {
    let mut out = Vec::new();
    let mut current = node.clone();
    while let Some(p) = current.parent() {
        out.push(p.clone());
        current = p;
    }
    out
}

fn siblings_after<N: DomNode>(node: &N) -> Vec<N> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    let siblings = parent.children();
    match siblings.iter().position(|s| s == node) {
        Some(idx) => siblings[idx + 1..].to_vec(),
        None => Vec::new(),
    }
}

fn siblings_before<N: DomNode>(node: &N) -> Vec<N> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    let siblings = parent.children();
    match siblings.iter().position(|s| s == node) {
        Some(idx) => {
            let mut before = siblings[..idx].to_vec();
            before.reverse();
            before
        }
        None => Vec::new(),
    }
}

/// Nodes an axis yields, in axis order: forward axes in document order,
/// reverse axes in reverse document order so predicate positions count
/// backwards from the context node.
fn axis_nodes<N: DomNode>(node: &N, axis: Axis) -> Vec<N> {
    match axis {
        Axis::Child => node.children(),
        Axis::Descendant => {
            let mut out = Vec::new();
            descendants(node, &mut out);
            out
        }
        Axis::DescendantOrSelf => {
            let mut out = vec![node.clone()];
            descendants(node, &mut out);
            out
        }
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor => ancestors(node),
        Axis::AncestorOrSelf => {
            let mut out = vec![node.clone()];
            out.extend(ancestors(node));
            out
        }
        Axis::FollowingSibling => siblings_after(node),
        Axis::PrecedingSibling => siblings_before(node),
        Axis::Following => {
            let mut out = Vec::new();
            let mut anchors = vec![node.clone()];
            anchors.extend(ancestors(node));
            for anchor in anchors {
                for sibling in siblings_after(&anchor) {
                    out.push(sibling.clone());
                    descendants(&sibling, &mut out);
                }
            }
            out
        }
        Axis::Preceding => {
            // Reverse document order; ancestors are excluded because only
            // sibling subtrees are expanded.
            let mut out = Vec::new();
            let mut anchors = vec![node.clone()];
            anchors.extend(ancestors(node));
            for anchor in anchors {
                for sibling in siblings_before(&anchor) {
                    let mut subtree = vec![sibling.clone()];
                    descendants(&sibling, &mut subtree);
                    subtree.reverse();
                    out.extend(subtree);
                }
            }
            out
        }
        Axis::Attribute => node.attributes(),
        Axis::Namespace => node.namespaces(),
        Axis::SelfAxis => vec![node.clone()],
    }
}

fn node_test_matches<N: DomNode>(
    node: &N,
    axis: Axis,
    test: &NodeTest,
    env: &Env<'_, N>,
) -> Result<bool, Error> {
    let principal = match axis {
        Axis::Attribute => NodeKind::Attribute,
        Axis::Namespace => NodeKind::Namespace,
        _ => NodeKind::Element,
    };
    Ok(match test {
        NodeTest::Node => true,
        NodeTest::Text => node.kind() == NodeKind::Text,
        NodeTest::Comment => node.kind() == NodeKind::Comment,
        NodeTest::Pi(target) => {
            node.kind() == NodeKind::ProcessingInstruction
                && target.as_ref().is_none_or(|t| {
                    node.name().is_some_and(|q| q.local == *t)
                })
        }
        NodeTest::AnyName => node.kind() == principal,
        NodeTest::PrefixedAny(prefix) => {
            if node.kind() != principal {
                return Ok(false);
            }
            let uri = resolve_prefix(prefix, env)?;
            node.name()
                .is_some_and(|q| q.ns_uri.as_deref() == Some(uri.as_str()))
        }
        NodeTest::Name { prefix, local } => {
            if node.kind() != principal {
                return Ok(false);
            }
            let Some(name) = node.name() else {
                return Ok(false);
            };
            match prefix {
                Some(p) => {
                    let uri = resolve_prefix(p, env)?;
                    name.local == *local && name.ns_uri.as_deref() == Some(uri.as_str())
                }
                // An unprefixed name test selects the null namespace.
                None => name.local == *local && name.ns_uri.is_none(),
            }
        }
    })
}

fn resolve_prefix<N: DomNode>(prefix: &str, env: &Env<'_, N>) -> Result<String, Error> {
    env.namespaces
        .lookup(prefix)
        .map(str::to_string)
        .map_err(|_| Error::evaluation(format!("undefined namespace prefix `{prefix}`")))
}

/// Sort into document order and drop duplicate node handles.
fn sort_document_order<N: DomNode>(nodes: Vec<N>) -> Result<Vec<N>, Error> {
    let mut sorted: Vec<N> = Vec::with_capacity(nodes.len());
    for n in nodes {
        if sorted.contains(&n) {
            continue;
        }
        let mut lo = 0usize;
        let mut hi = sorted.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            match sorted[mid].compare_document_order(&n)? {
                Ordering::Less | Ordering::Equal => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }
        sorted.insert(lo, n);
    }
    Ok(sorted)
}

// ---------------------------------------------------------------------------
// Conversions and comparisons

fn ebv<N: DomNode>(value: &Value<N>) -> bool {
    match value {
        Value::Nodes(nodes) => !nodes.is_empty(),
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Text(s) => !s.is_empty(),
    }
}

fn to_number<N: DomNode>(value: &Value<N>) -> f64 {
    match value {
        Value::Nodes(_) => str_to_number(&to_string_value(value)),
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::Text(s) => str_to_number(s),
    }
}

fn to_string_value<N: DomNode>(value: &Value<N>) -> String {
    match value {
        Value::Nodes(nodes) => nodes.first().map(DomNode::string_value).unwrap_or_default(),
        Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Text(s) => s.clone(),
    }
}

/// XPath 1.0 Number production: optional minus, digits with at most one
/// decimal point. Anything else is NaN.
fn str_to_number(s: &str) -> f64 {
    let t = s.trim();
    let body = t.strip_prefix('-').unwrap_or(t);
    if body.is_empty()
        || body == "."
        || !body.chars().all(|c| c.is_ascii_digit() || c == '.')
        || body.chars().filter(|&c| c == '.').count() > 1
    {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

/// XPath 1.0 number-to-string: no decimal point for integral values,
/// `NaN` / `Infinity` spellings, negative zero collapses to `0`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn num_cmp(op: CompOp, a: f64, b: f64) -> bool {
    match op {
        CompOp::Eq => a == b,
        CompOp::Ne => a != b,
        CompOp::Lt => a < b,
        CompOp::Le => a <= b,
        CompOp::Gt => a > b,
        CompOp::Ge => a >= b,
    }
}

fn str_eq_cmp(op: CompOp, a: &str, b: &str) -> bool {
    match op {
        CompOp::Eq => a == b,
        CompOp::Ne => a != b,
        // Relational string comparisons convert to numbers per XPath 1.0.
        _ => num_cmp(op, str_to_number(a), str_to_number(b)),
    }
}

/// XPath 1.0 general comparison, including the existential node-set rules.
fn compare_values<N: DomNode>(op: CompOp, left: &Value<N>, right: &Value<N>) -> bool {
    match (left, right) {
        (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|x| {
            let xs = x.string_value();
            b.iter().any(|y| str_eq_cmp(op, &xs, &y.string_value()))
        }),
        (Value::Nodes(a), Value::Number(n)) => {
            a.iter().any(|x| num_cmp(op, str_to_number(&x.string_value()), *n))
        }
        (Value::Number(n), Value::Nodes(b)) => {
            b.iter().any(|y| num_cmp(op, *n, str_to_number(&y.string_value())))
        }
        (Value::Nodes(a), Value::Text(s)) => {
            a.iter().any(|x| str_eq_cmp(op, &x.string_value(), s))
        }
        (Value::Text(s), Value::Nodes(b)) => {
            b.iter().any(|y| str_eq_cmp(op, s, &y.string_value()))
        }
        (Value::Nodes(_), Value::Boolean(b)) => bool_cmp(op, ebv(left), *b),
        (Value::Boolean(a), Value::Nodes(_)) => bool_cmp(op, *a, ebv(right)),
        // Scalar vs scalar: booleans win, then numbers, then strings; the
        // relational operators always compare numerically.
        (l, r) => {
            if matches!(op, CompOp::Eq | CompOp::Ne) {
                if matches!(l, Value::Boolean(_)) || matches!(r, Value::Boolean(_)) {
                    bool_cmp(op, ebv(l), ebv(r))
                } else if matches!(l, Value::Number(_)) || matches!(r, Value::Number(_)) {
                    num_cmp(op, to_number(l), to_number(r))
                } else {
                    str_eq_cmp(op, &to_string_value(l), &to_string_value(r))
                }
            } else {
                num_cmp(op, to_number(l), to_number(r))
            }
        }
    }
}

fn bool_cmp(op: CompOp, a: bool, b: bool) -> bool {
    let as_num = |v: bool| if v { 1.0 } else { 0.0 };
    num_cmp(op, as_num(a), as_num(b))
}

// ---------------------------------------------------------------------------
// Core function library (XPath 1.0 subset)

fn arity(name: &str, args: &[Expr], min: usize, max: Option<usize>) -> Result<(), Error> {
    let ok = args.len() >= min && max.is_none_or(|m| args.len() <= m);
    if ok {
        Ok(())
    } else {
        Err(Error::evaluation(format!(
            "wrong number of arguments to {name}(): got {}",
            args.len()
        )))
    }
}

#[allow(clippy::too_many_lines)]
fn call_function<N: DomNode>(
    name: &str,
    args: &[Expr],
    focus: &Focus<'_, N>,
    env: &Env<'_, N>,
) -> Result<Value<N>, Error> {
    let eval_arg = |i: usize| eval_expr(&args[i], focus, env);
    let string_arg = |i: usize| eval_arg(i).map(|v| to_string_value(&v));
    let number_arg = |i: usize| eval_arg(i).map(|v| to_number(&v));
    let nodeset_arg = |i: usize| -> Result<Vec<N>, Error> {
        match eval_arg(i)? {
            Value::Nodes(nodes) => Ok(nodes),
            _ => Err(Error::evaluation(format!(
                "{name}() expects a node-set argument"
            ))),
        }
    };
    // Optional node-set argument defaulting to the context node; empty
    // node-sets yield None.
    let name_target = |i: usize| -> Result<Option<N>, Error> {
        if args.is_empty() {
            Ok(Some(focus.item.clone()))
        } else {
            Ok(nodeset_arg(i)?.into_iter().next())
        }
    };

    match name {
        "last" => {
            arity(name, args, 0, Some(0))?;
            Ok(Value::Number(focus.size as f64))
        }
        "position" => {
            arity(name, args, 0, Some(0))?;
            Ok(Value::Number(focus.position as f64))
        }
        "count" => {
            arity(name, args, 1, Some(1))?;
            Ok(Value::Number(nodeset_arg(0)?.len() as f64))
        }
        "name" => {
            arity(name, args, 0, Some(1))?;
            let s = name_target(0)?
                .and_then(|n| n.name())
                .map(|q| q.qualified())
                .unwrap_or_default();
            Ok(Value::Text(s))
        }
        "local-name" => {
            arity(name, args, 0, Some(1))?;
            let s = name_target(0)?
                .and_then(|n| n.name())
                .map(|q| q.local.to_string())
                .unwrap_or_default();
            Ok(Value::Text(s))
        }
        "namespace-uri" => {
            arity(name, args, 0, Some(1))?;
            let s = name_target(0)?
                .and_then(|n| n.name())
                .and_then(|q| q.ns_uri.map(|u| u.to_string()))
                .unwrap_or_default();
            Ok(Value::Text(s))
        }
        "string" => {
            arity(name, args, 0, Some(1))?;
            if args.is_empty() {
                Ok(Value::Text(focus.item.string_value()))
            } else {
                Ok(Value::Text(string_arg(0)?))
            }
        }
        "concat" => {
            arity(name, args, 2, None)?;
            let mut out = String::new();
            for i in 0..args.len() {
                out.push_str(&string_arg(i)?);
            }
            Ok(Value::Text(out))
        }
        "starts-with" => {
            arity(name, args, 2, Some(2))?;
            let (a, b) = (string_arg(0)?, string_arg(1)?);
            Ok(Value::Boolean(a.starts_with(&b)))
        }
        "contains" => {
            arity(name, args, 2, Some(2))?;
            let (a, b) = (string_arg(0)?, string_arg(1)?);
            Ok(Value::Boolean(a.contains(&b)))
        }
        "substring-before" => {
            arity(name, args, 2, Some(2))?;
            let (a, b) = (string_arg(0)?, string_arg(1)?);
            Ok(Value::Text(
                a.find(&b).map(|i| a[..i].to_string()).unwrap_or_default(),
            ))
        }
        "substring-after" => {
            arity(name, args, 2, Some(2))?;
            let (a, b) = (string_arg(0)?, string_arg(1)?);
            Ok(Value::Text(
                a.find(&b)
                    .map(|i| a[i + b.len()..].to_string())
                    .unwrap_or_default(),
            ))
        }
        "substring" => {
            arity(name, args, 2, Some(3))?;
            let s = string_arg(0)?;
            let start = round_half_up(number_arg(1)?);
            let end = if args.len() == 3 {
                start + round_half_up(number_arg(2)?)
            } else {
                f64::INFINITY
            };
            // 1-based character positions; NaN bounds select nothing.
            let out: String = s
                .chars()
                .enumerate()
                .filter(|(i, _)| {
                    let pos = (i + 1) as f64;
                    pos >= start && pos < end
                })
                .map(|(_, c)| c)
                .collect();
            Ok(Value::Text(out))
        }
        "string-length" => {
            arity(name, args, 0, Some(1))?;
            let s = if args.is_empty() {
                focus.item.string_value()
            } else {
                string_arg(0)?
            };
            Ok(Value::Number(s.chars().count() as f64))
        }
        "normalize-space" => {
            arity(name, args, 0, Some(1))?;
            let s = if args.is_empty() {
                focus.item.string_value()
            } else {
                string_arg(0)?
            };
            Ok(Value::Text(
                s.split_whitespace().collect::<Vec<_>>().join(" "),
            ))
        }
        "translate" => {
            arity(name, args, 3, Some(3))?;
            let src = string_arg(0)?;
            let from: Vec<char> = string_arg(1)?.chars().collect();
            let to: Vec<char> = string_arg(2)?.chars().collect();
            let out: String = src
                .chars()
                .filter_map(|c| match from.iter().position(|&f| f == c) {
                    Some(i) => to.get(i).copied(),
                    None => Some(c),
                })
                .collect();
            Ok(Value::Text(out))
        }
        "boolean" => {
            arity(name, args, 1, Some(1))?;
            Ok(Value::Boolean(ebv(&eval_arg(0)?)))
        }
        "not" => {
            arity(name, args, 1, Some(1))?;
            Ok(Value::Boolean(!ebv(&eval_arg(0)?)))
        }
        "true" => {
            arity(name, args, 0, Some(0))?;
            Ok(Value::Boolean(true))
        }
        "false" => {
            arity(name, args, 0, Some(0))?;
            Ok(Value::Boolean(false))
        }
        "number" => {
            arity(name, args, 0, Some(1))?;
            if args.is_empty() {
                Ok(Value::Number(str_to_number(&focus.item.string_value())))
            } else {
                Ok(Value::Number(number_arg(0)?))
            }
        }
        "sum" => {
            arity(name, args, 1, Some(1))?;
            let total = nodeset_arg(0)?
                .iter()
                .map(|n| str_to_number(&n.string_value()))
                .sum();
            Ok(Value::Number(total))
        }
        "floor" => {
            arity(name, args, 1, Some(1))?;
            Ok(Value::Number(number_arg(0)?.floor()))
        }
        "ceiling" => {
            arity(name, args, 1, Some(1))?;
            Ok(Value::Number(number_arg(0)?.ceil()))
        }
        "round" => {
            arity(name, args, 1, Some(1))?;
            Ok(Value::Number(round_half_up(number_arg(0)?)))
        }
        _ => Err(Error::evaluation(format!("unknown function {name}()"))),
    }
}

/// XPath round(): half-way cases go toward positive infinity.
fn round_half_up(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    (n + 0.5).floor()
}
