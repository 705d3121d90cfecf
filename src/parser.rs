use crate::sentence::{SentenceError, SentenceId};
use crate::sort::{SortError, OBJECT};
use crate::Context;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum PSentence {
    Name(String),
    App(String, Vec<PSentence>),
    Not(Box<PSentence>),
    And(Vec<PSentence>),
    Or(Vec<PSentence>),
    Implies(Box<PSentence>, Box<PSentence>),
    Iff(Box<PSentence>, Box<PSentence>),
    ForAll(String, Option<String>, Box<PSentence>),
    Exists(String, Option<String>, Box<PSentence>),
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: expected {expected}")]
    Syntax {
        line: usize,
        column: usize,
        expected: String,
    },
    #[error("{0} is a bound variable, not a sentence")]
    VariableAsSentence(String),
    #[error("{0} cannot appear in term position")]
    SentenceAsTerm(String),
    #[error("{0} is not declared")]
    Undeclared(String),
    #[error("{0} is not a known sort")]
    UnknownSort(String),
    #[error(transparent)]
    Sentence(#[from] SentenceError),
    #[error(transparent)]
    Sort(#[from] SortError),
}

peg::parser! {
    grammar sentence_reader() for str {
        rule _() = quiet!{[' ' | '\t' | '\r' | '\n']*}
        rule __() = quiet!{[' ' | '\t' | '\r' | '\n']+}

        rule name() -> String
            = quiet!{n:$(['a'..='z' | 'A'..='Z' | '_']['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '\'']*) { n.into() }}
            / expected!("name")

        rule binder() -> (String, Option<String>)
            = v:name() s:(":" n:name() { n })? { (v, s) }

        rule expr() -> PSentence
            = "(" _ "not" __ p:expr() _ ")" { PSentence::Not(Box::new(p)) }
            / "(" _ "and" __ l:(expr() **<2,> __) _ ")" { PSentence::And(l) }
            / "(" _ "or" __ l:(expr() **<2,> __) _ ")" { PSentence::Or(l) }
            / "(" _ "implies" __ p:expr() __ q:expr() _ ")" {
                PSentence::Implies(Box::new(p), Box::new(q))
            }
            / "(" _ "iff" __ p:expr() __ q:expr() _ ")" {
                PSentence::Iff(Box::new(p), Box::new(q))
            }
            / "(" _ "forall" __ b:binder() __ p:expr() _ ")" {
                PSentence::ForAll(b.0, b.1, Box::new(p))
            }
            / "(" _ "exists" __ b:binder() __ p:expr() _ ")" {
                PSentence::Exists(b.0, b.1, Box::new(p))
            }
            / "(" _ n:name() l:(__ p:expr() { p })* _ ")" { PSentence::App(n, l) }
            / n:name() { PSentence::Name(n) }

        pub rule sentence() -> PSentence = _ s:expr() _ { s }
    }
}

/// Parses one sentence in the s-expression syntax and interns it.
///
/// Input is NFKC-normalized first. In strict mode every application head,
/// constant and binder sort must be declared beforehand; in loose mode they
/// are declared on first use with `Object`-sorted signatures. Identical
/// input always resolves to the identical interned id.
pub fn parse(s: &str, ctx: &mut Context, strict: bool) -> Result<SentenceId, ParseError> {
    let s: String = s.nfkc().collect();
    let psentence = sentence_reader::sentence(&s).map_err(|e| ParseError::Syntax {
        line: e.location.line,
        column: e.location.column,
        expected: e.expected.to_string(),
    })?;
    let mut scope = vec![];
    lower_sentence(&psentence, ctx, strict, &mut scope)
}

impl Context {
    /// Parses and interns `text` in loose mode; the same canonical text
    /// always yields the same id.
    pub fn intern(&mut self, text: &str) -> Result<SentenceId, ParseError> {
        parse(text, self, false)
    }
}

fn lower_sentence(
    psentence: &PSentence,
    ctx: &mut Context,
    strict: bool,
    scope: &mut Vec<(String, SentenceId)>,
) -> Result<SentenceId, ParseError> {
    use PSentence::*;
    match psentence {
        Name(n) => {
            if scope.iter().any(|(name, _)| name == n) {
                return Err(ParseError::VariableAsSentence(n.clone()));
            }
            Ok(ctx.atom(n))
        }
        App(n, args) => {
            if strict && !ctx.decls.contains(n) {
                return Err(ParseError::Undeclared(n.clone()));
            }
            let args = args
                .iter()
                .map(|a| lower_term(a, ctx, strict, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ctx.predicate(n, args)?)
        }
        Not(p) => {
            let p = lower_sentence(p, ctx, strict, scope)?;
            Ok(ctx.not(p)?)
        }
        And(l) => {
            let args = l
                .iter()
                .map(|p| lower_sentence(p, ctx, strict, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ctx.and(args)?)
        }
        Or(l) => {
            let args = l
                .iter()
                .map(|p| lower_sentence(p, ctx, strict, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ctx.or(args)?)
        }
        Implies(p, q) => {
            let p = lower_sentence(p, ctx, strict, scope)?;
            let q = lower_sentence(q, ctx, strict, scope)?;
            Ok(ctx.implies(p, q)?)
        }
        Iff(p, q) => {
            let p = lower_sentence(p, ctx, strict, scope)?;
            let q = lower_sentence(q, ctx, strict, scope)?;
            Ok(ctx.iff(p, q)?)
        }
        ForAll(v, sort_name, body) => {
            let var = lower_binder(v, sort_name.as_deref(), ctx, strict)?;
            scope.push((v.clone(), var));
            let body = lower_sentence(body, ctx, strict, scope);
            scope.pop();
            Ok(ctx.forall(var, body?)?)
        }
        Exists(v, sort_name, body) => {
            let var = lower_binder(v, sort_name.as_deref(), ctx, strict)?;
            scope.push((v.clone(), var));
            let body = lower_sentence(body, ctx, strict, scope);
            scope.pop();
            Ok(ctx.exists(var, body?)?)
        }
    }
}

fn lower_binder(
    name: &str,
    sort_name: Option<&str>,
    ctx: &mut Context,
    strict: bool,
) -> Result<SentenceId, ParseError> {
    let sort = match sort_name {
        Some(n) if strict => ctx
            .sorts
            .get(n)
            .ok_or_else(|| ParseError::UnknownSort(n.into()))?,
        Some(n) => ctx.sorts.get_or_create(n, None)?,
        None => OBJECT,
    };
    Ok(ctx.variable(name, sort))
}

fn lower_term(
    psentence: &PSentence,
    ctx: &mut Context,
    strict: bool,
    scope: &mut Vec<(String, SentenceId)>,
) -> Result<SentenceId, ParseError> {
    use PSentence::*;
    match psentence {
        Name(n) => {
            // innermost binder wins
            if let Some((_, var)) = scope.iter().rev().find(|(name, _)| name == n) {
                return Ok(*var);
            }
            match ctx.decls.get(n).cloned() {
                Some(decl) if decl.args.is_empty() => Ok(ctx.constant(n, decl.ret)),
                Some(decl) => Err(ParseError::Sentence(SentenceError::Arity {
                    name: n.clone(),
                    expected: decl.arity(),
                    found: 0,
                })),
                None if strict => Err(ParseError::Undeclared(n.clone())),
                None => {
                    ctx.decls.get_or_declare(n, OBJECT, vec![]);
                    Ok(ctx.constant(n, OBJECT))
                }
            }
        }
        App(n, args) => {
            if strict && !ctx.decls.contains(n) {
                return Err(ParseError::Undeclared(n.clone()));
            }
            let args = args
                .iter()
                .map(|a| lower_term(a, ctx, strict, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ctx.function(n, args)?)
        }
        Not(_) => Err(ParseError::SentenceAsTerm("not".into())),
        And(_) => Err(ParseError::SentenceAsTerm("and".into())),
        Or(_) => Err(ParseError::SentenceAsTerm("or".into())),
        Implies(..) => Err(ParseError::SentenceAsTerm("implies".into())),
        Iff(..) => Err(ParseError::SentenceAsTerm("iff".into())),
        ForAll(..) => Err(ParseError::SentenceAsTerm("forall".into())),
        Exists(..) => Err(ParseError::SentenceAsTerm("exists".into())),
    }
}
