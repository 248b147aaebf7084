//! Recursive-descent parser for the rule expression grammar:
//!
//! ```text
//! expr    := term (boolop term)*
//! term    := unary (cmp unary)?
//! unary   := ('not')? primary
//! primary := literal | call | ident | '(' expr ')'   (with trailing arithop chains)
//! call    := ('1min'|'5min'|'dynamicity') '(' expr ')'
//! ```
//!
//! The textual window-modifier aliases are rewritten directly into
//! [`crate::rules::ast::WindowKind`] sentinels as they're parsed, which
//! is the "source rewriting" step; a bare identifier followed by `(` that
//! is not one of the three sentinels is a parse error (the grammar
//! nominally allows arbitrary `IDENT(...)` calls, but nothing in the
//! catalog is callable, so any such form fails safety validation anyway —
//! rejecting it at parse time gives a clearer error).

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, multispace0};
use nom::combinator::{map, opt, recognize, value};
use nom::multi::{fold_many0, many0_count};
use nom::number::complete::double;
use nom::sequence::{delimited, pair, preceded};
use nom::IResult;

use crate::rules::ast::{ArithOp, BoolOp, CmpOp, Expr, Literal, WindowKind};

pub fn parse_rule(input: &str) -> Result<Expr, String> {
    let rewritten = rewrite_window_sentinels(input);
    let (rest, expr) = ws(parse_expr)(&rewritten).map_err(|e| format!("parse error: {e}"))?;
    let (rest, _) = multispace0::<_, nom::error::Error<&str>>(rest).unwrap_or((rest, ""));
    if !rest.is_empty() {
        return Err(format!("unexpected trailing input: '{rest}'"));
    }
    Ok(expr)
}

/// Rewrites the bare `1min`/`5min`/`dynamicity` window-modifier tokens to
/// `_1min`/`_5min`/`_dynamicity` before parsing. `1min`/`5min` are not
/// valid identifiers under the grammar's `IDENT` rule (it forbids a
/// leading digit), so without this rewrite `parse_call`'s `identifier()`
/// can never read them and the window modifiers are unreachable. The
/// rewrite is word-boundary aware so it never touches a token that merely
/// starts with one of these names (e.g. a metric called `dynamicity_score`).
fn rewrite_window_sentinels(input: &str) -> String {
    const SENTINELS: [(&str, &str); 3] = [("1min", "_1min"), ("5min", "_5min"), ("dynamicity", "_dynamicity")];
    let mut out = String::with_capacity(input.len());
    let mut prev_ident_char = false;
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.peek().copied() {
        let rest = &input[i..];
        let mut rewritten = false;
        if !prev_ident_char {
            for (pat, replacement) in SENTINELS {
                if let Some(after) = rest.strip_prefix(pat) {
                    let next_continues_ident = after.chars().next().is_some_and(is_ident_char);
                    if !next_continues_ident {
                        out.push_str(replacement);
                        for _ in 0..pat.chars().count() {
                            chars.next();
                        }
                        prev_ident_char = true;
                        rewritten = true;
                        break;
                    }
                }
            }
        }
        if !rewritten {
            out.push(c);
            prev_ident_char = is_ident_char(c);
            chars.next();
        }
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(multispace0, inner)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn parse_expr(input: &str) -> IResult<&str, Expr> {
    let (input, first) = parse_term(input)?;
    fold_many0(
        pair(ws(boolop), parse_term),
        move || first.clone(),
        |acc, (op, rhs)| Expr::BoolOp(Box::new(acc), op, Box::new(rhs)),
    )(input)
}

fn boolop(input: &str) -> IResult<&str, BoolOp> {
    alt((
        value(BoolOp::And, tag("and")),
        value(BoolOp::Or, tag("or")),
    ))(input)
}

fn parse_term(input: &str) -> IResult<&str, Expr> {
    let (input, lhs) = parse_unary(input)?;
    let (input, chain) = opt(pair(ws(cmpop), ws(parse_unary)))(input)?;
    Ok(match chain {
        Some((op, rhs)) => (input, Expr::Compare(Box::new(lhs), op, Box::new(rhs))),
        None => (input, lhs),
    })
}

fn cmpop(input: &str) -> IResult<&str, CmpOp> {
    alt((
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Eq, tag("==")),
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))(input)
}

fn parse_unary(input: &str) -> IResult<&str, Expr> {
    let (input, not) = opt(ws(tag("not")))(input)?;
    let (input, inner) = ws(parse_arith)(input)?;
    Ok(match not {
        Some(_) => (input, Expr::Not(Box::new(inner))),
        None => (input, inner),
    })
}

fn parse_arith(input: &str) -> IResult<&str, Expr> {
    let (input, first) = ws(parse_primary)(input)?;
    fold_many0(
        pair(ws(arithop), ws(parse_primary)),
        move || first.clone(),
        |acc, (op, rhs)| Expr::Arith(Box::new(acc), op, Box::new(rhs)),
    )(input)
}

fn arithop(input: &str) -> IResult<&str, ArithOp> {
    alt((
        value(ArithOp::FloorDiv, tag("//")),
        value(ArithOp::Add, tag("+")),
        value(ArithOp::Sub, tag("-")),
        value(ArithOp::Mul, tag("*")),
        value(ArithOp::Div, tag("/")),
    ))(input)
}

fn parse_primary(input: &str) -> IResult<&str, Expr> {
    alt((parse_call, parse_paren, parse_literal, parse_ident))(input)
}

fn parse_paren(input: &str) -> IResult<&str, Expr> {
    delimited(ws(char('(')), parse_expr, ws(char(')')))(input)
}

fn parse_call(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, arg) = parse_expr(input)?;
    let (input, _) = ws(char(')'))(input)?;
    let kind = match name {
        "_1min" => WindowKind::OneMin,
        "_5min" => WindowKind::FiveMin,
        "_dynamicity" => WindowKind::Dynamicity,
        _ => {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )))
        }
    };
    Ok((input, Expr::WindowMod(kind, Box::new(arg))))
}

fn parse_ident(input: &str) -> IResult<&str, Expr> {
    map(identifier, |s: &str| Expr::Ident(s.to_string()))(input)
}

fn parse_literal(input: &str) -> IResult<&str, Expr> {
    alt((parse_bool_literal, parse_string_literal, parse_num_literal))(input)
}

fn parse_bool_literal(input: &str) -> IResult<&str, Expr> {
    alt((
        value(Expr::Literal(Literal::Bool(true)), tag("true")),
        value(Expr::Literal(Literal::Bool(false)), tag("false")),
    ))(input)
}

fn parse_string_literal(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(char('\''), nom::bytes::complete::is_not("'"), char('\'')),
        |s: &str| Expr::Literal(Literal::Str(s.to_string())),
    )(input)
}

fn parse_num_literal(input: &str) -> IResult<&str, Expr> {
    map(double, |v| Expr::Literal(Literal::Num(v)))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comparison() {
        let expr = parse_rule("idle_time < 10").unwrap();
        assert!(matches!(expr, Expr::Compare(_, CmpOp::Lt, _)));
    }

    #[test]
    fn parses_window_modifier_and_conjunction() {
        let expr = parse_rule("idle_time < 10 and 1min(idle_time) < 10").unwrap();
        match expr {
            Expr::BoolOp(lhs, BoolOp::And, rhs) => {
                assert!(matches!(*lhs, Expr::Compare(..)));
                match *rhs {
                    Expr::Compare(inner, CmpOp::Lt, _) => {
                        assert!(matches!(*inner, Expr::WindowMod(WindowKind::OneMin, _)));
                    }
                    other => panic!("unexpected rhs: {other:?}"),
                }
            }
            other => panic!("unexpected top-level: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_call_target() {
        assert!(parse_rule("bogus(idle_time) < 10").is_err());
    }

    #[test]
    fn parses_dynamicity_wrapped_rule() {
        let expr = parse_rule("dynamicity(rx_drop) > 0").unwrap();
        assert!(matches!(expr, Expr::Compare(_, CmpOp::Gt, _)));
    }

    #[test]
    fn parses_5min_window_modifier() {
        let expr = parse_rule("5min(idle_time) < 10").unwrap();
        match expr {
            Expr::Compare(inner, CmpOp::Lt, _) => {
                assert!(matches!(*inner, Expr::WindowMod(WindowKind::FiveMin, _)));
            }
            other => panic!("unexpected expr: {other:?}"),
        }
    }

    #[test]
    fn does_not_rewrite_identifiers_merely_prefixed_by_a_sentinel() {
        let expr = parse_rule("dynamicity_score > 0").unwrap();
        match expr {
            Expr::Compare(inner, CmpOp::Gt, _) => {
                assert!(matches!(*inner, Expr::Ident(name) if name == "dynamicity_score"));
            }
            other => panic!("unexpected expr: {other:?}"),
        }
    }
}
