use std::str::FromStr;

use itertools::Itertools;

use phosphorus_normalize::canonicalize_name;
use phosphorus_pep440::Operator;

use crate::Pep508Error;
use crate::marker::tokenizer::{TokenRule, Tokenizer};
use crate::marker::tree::{BooleanOperator, Marker, MarkerAtom, MarkerNode};
use crate::marker::variable::MarkerVariable;

/// An operand of the marker grammar, before it's known which side the variable is on.
enum Operand {
    Variable(MarkerVariable),
    Literal(String),
}

/// A parsed item before precedence grouping: a comparison or a parenthesized sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum FlatItem {
    Atom(MarkerAtom),
    Parenthesized(Box<FlatSequence>),
}

/// Items joined by boolean operators in the order they were written, `first (op item)*`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct FlatSequence {
    pub(crate) first: FlatItem,
    pub(crate) rest: Vec<(BooleanOperator, FlatItem)>,
}

/// Turns a flat sequence into a tree, giving `and` precedence over `or`.
///
/// If all operators are the same, the items become the children of a single group. Otherwise
/// every run of items joined by `and` is grouped (a run of one stays a bare item) and the runs
/// are joined by `or`. A single item, parenthesized or not, is returned as is.
pub(crate) fn regroup(sequence: FlatSequence) -> MarkerNode {
    let FlatSequence { first, rest } = sequence;
    if rest.is_empty() {
        return regroup_item(first);
    }

    if rest.iter().map(|(operator, _)| operator).all_equal() {
        let boolean = rest[0].0;
        let markers = std::iter::once(first)
            .chain(rest.into_iter().map(|(_, item)| item))
            .map(regroup_item)
            .collect();
        return MarkerNode::Group(match boolean {
            BooleanOperator::And => Marker::and(markers),
            BooleanOperator::Or => Marker::or(markers),
        });
    }

    // Mixed: `a and b or c` is `(a and b) or c`.
    let mut first_run = (first, Vec::new());
    let mut later_runs: Vec<(FlatItem, Vec<FlatItem>)> = Vec::new();
    for (operator, item) in rest {
        match operator {
            BooleanOperator::And => match later_runs.last_mut() {
                Some((_, run)) => run.push(item),
                None => first_run.1.push(item),
            },
            BooleanOperator::Or => later_runs.push((item, Vec::new())),
        }
    }
    regroup(FlatSequence {
        first: and_run(first_run),
        rest: later_runs
            .into_iter()
            .map(|run| (BooleanOperator::Or, and_run(run)))
            .collect(),
    })
}

fn regroup_item(item: FlatItem) -> MarkerNode {
    match item {
        FlatItem::Atom(atom) => MarkerNode::Atom(atom),
        FlatItem::Parenthesized(sequence) => regroup(*sequence),
    }
}

/// Items joined by `and`, as a parenthesized sequence unless there's only one.
fn and_run((first, rest): (FlatItem, Vec<FlatItem>)) -> FlatItem {
    if rest.is_empty() {
        return first;
    }
    FlatItem::Parenthesized(Box::new(FlatSequence {
        first,
        rest: rest
            .into_iter()
            .map(|item| (BooleanOperator::And, item))
            .collect(),
    }))
}

/// Parses a marker starting at byte `start` of `input` up to the end of the input.
///
/// Whitespace-only input is the empty marker.
///
/// ```text
/// marker := item ( wsp* ('and' | 'or') item )*
/// item   := wsp* '(' marker wsp* ')' | atom
/// atom   := wsp* operand wsp* operator wsp* operand
/// ```
pub(crate) fn parse_marker(input: &str, start: usize) -> Result<Marker, Pep508Error> {
    let mut tokenizer = Tokenizer::new(input, start);
    tokenizer.eat_whitespace();
    if tokenizer.peek_char().is_none() {
        return Ok(Marker::empty());
    }

    let sequence = parse_sequence(&mut tokenizer)?;
    tokenizer.eat_whitespace();
    if let Some(char) = tokenizer.peek_char() {
        return Err(tokenizer.error(
            format!("Unexpected '{char}', expected 'and', 'or' or end of input"),
            tokenizer.pos(),
            char.len_utf8(),
        ));
    }

    Ok(Marker::from(regroup(sequence)))
}

fn parse_sequence(tokenizer: &mut Tokenizer) -> Result<FlatSequence, Pep508Error> {
    let first = parse_item(tokenizer)?;
    let mut rest = Vec::new();
    loop {
        tokenizer.eat_whitespace();
        let Some(token) = tokenizer.consume(TokenRule::BooleanOperator) else {
            break;
        };
        let operator = if token.text == "and" {
            BooleanOperator::And
        } else {
            BooleanOperator::Or
        };
        rest.push((operator, parse_item(tokenizer)?));
    }
    Ok(FlatSequence { first, rest })
}

fn parse_item(tokenizer: &mut Tokenizer) -> Result<FlatItem, Pep508Error> {
    tokenizer.eat_whitespace();
    let Some(open) = tokenizer.consume(TokenRule::LeftParenthesis) else {
        return parse_atom(tokenizer).map(FlatItem::Atom);
    };
    let sequence = parse_sequence(tokenizer)?;
    tokenizer.eat_whitespace();
    if tokenizer.consume(TokenRule::RightParenthesis).is_none() {
        return Err(match tokenizer.peek_char() {
            Some(_) => tokenizer.unexpected("')', 'and' or 'or'"),
            None => tokenizer.error(
                "Missing closing parenthesis (expected ')', found end of input)",
                open.start,
                1,
            ),
        });
    }
    Ok(FlatItem::Parenthesized(Box::new(sequence)))
}

/// A comparison with the variable moved to the left.
fn parse_atom(tokenizer: &mut Tokenizer) -> Result<MarkerAtom, Pep508Error> {
    let start = tokenizer.pos();
    let left = parse_operand(tokenizer)?;
    tokenizer.eat_whitespace();
    let operator = parse_operator(tokenizer)?;
    tokenizer.eat_whitespace();
    let right = parse_operand(tokenizer)?;

    let (variable, value) = match (left, right) {
        (Operand::Variable(variable), Operand::Literal(value))
        | (Operand::Literal(value), Operand::Variable(variable)) => (variable, value),
        (Operand::Variable(_), Operand::Variable(_)) | (Operand::Literal(_), Operand::Literal(_)) => {
            return Err(tokenizer.error(
                "Expected a marker variable and a string",
                start,
                tokenizer.pos() - start,
            ));
        }
    };

    let value = if variable == MarkerVariable::Extra {
        canonicalize_name(&value)
    } else {
        value
    };
    Ok(MarkerAtom {
        variable,
        operator,
        value,
    })
}

fn parse_operand(tokenizer: &mut Tokenizer) -> Result<Operand, Pep508Error> {
    if let Some(token) = tokenizer.consume(TokenRule::QuotedString) {
        // Both quote characters are a single byte.
        let literal = &token.text[1..token.text.len() - 1];
        return Ok(Operand::Literal(literal.to_string()));
    }
    if let Some(token) = tokenizer.peek(TokenRule::Variable) {
        let variable = MarkerVariable::from_str(token.text)
            .map_err(|err| tokenizer.error(err.to_string(), token.start, token.text.len()))?;
        tokenizer.consume(TokenRule::Variable);
        return Ok(Operand::Variable(variable));
    }
    Err(tokenizer.unexpected("a marker variable or a quoted string"))
}

/// ```text
/// operator := '===' | '==' | '~=' | '!=' | '<=' | '>=' | '<' | '>' | 'in' | 'not' wsp+ 'in'
/// ```
fn parse_operator(tokenizer: &mut Tokenizer) -> Result<Operator, Pep508Error> {
    let token = [TokenRule::In, TokenRule::NotIn, TokenRule::Operator]
        .into_iter()
        .find_map(|rule| tokenizer.consume(rule));
    let Some(token) = token else {
        return Err(tokenizer.unexpected("a marker operator (such as '>=' or 'not in')"));
    };
    Operator::from_str(token.text)
        .map_err(|err| tokenizer.error(err.to_string(), token.start, token.text.len()))
}
