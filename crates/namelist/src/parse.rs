//! Namelist reader.
//!
//! Parsing happens in two passes: a tokenizer that understands quotes,
//! comments and parenthesised subscripts, then a statement pass that groups
//! tokens into `&group` blocks and `target = values` assignments. A key
//! followed by `=` always starts a new assignment, so several assignments may
//! share a line and a value list may continue over several lines.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use thiserror::Error;

use crate::{Group, Namelist, Result, Value};


/// Largest array subscript the reader accepts.
///
/// Collapsed vectors are stored densely from their lowest index, so this also
/// bounds the length of any sequence, the span of a range assignment and a
/// repeat count.
pub const MAX_INDEX: usize = 100_000;

/// Error produced while reading namelist text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
	/// 1-based line number where the problem was detected.
	pub line: usize,
	/// Human-readable description of the problem.
	pub message: String,
}

impl ParseError {
	fn new(line: usize, message: impl Into<String>) -> Self {
		Self {
			line,
			message: message.into(),
		}
	}
}

/// Parses namelist text into a [`Namelist`].
///
/// # Errors
///
/// Returns a [`ParseError`] for text outside of a group, unterminated groups
/// or strings, malformed subscripts and unrecognised value tokens.
pub fn parse(input: &str) -> Result<Namelist> {
	let tokens = tokenize(input)?;
	Parser { tokens, pos: 0 }.namelist()
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
	/// `&name` or `$name`.
	GroupStart(String),
	/// `/`, `&end` or `$end`.
	GroupEnd,
	/// Unquoted run of characters (key, number, logical, repeat count).
	Word(String),
	/// Quoted string with escapes resolved.
	Str(String),
	Equals,
	Comma,
}

#[derive(Debug, Clone)]
struct Token {
	tok: Tok,
	line: usize,
}

fn is_word_char(ch: char) -> bool {
	!(ch.is_whitespace() || matches!(ch, ',' | '=' | '/' | '!' | '\'' | '"'))
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
	let mut tokens = Vec::new();
	let mut chars = input.chars().peekable();
	let mut line = 1;

	while let Some(&ch) = chars.peek() {
		match ch {
			'\n' => {
				line += 1;
				chars.next();
			}
			c if c.is_whitespace() => {
				chars.next();
			}
			'!' => {
				while chars.peek().is_some_and(|&c| c != '\n') {
					chars.next();
				}
			}
			',' | ';' => {
				chars.next();
				tokens.push(Token { tok: Tok::Comma, line });
			}
			'=' => {
				chars.next();
				tokens.push(Token { tok: Tok::Equals, line });
			}
			'/' => {
				chars.next();
				tokens.push(Token {
					tok: Tok::GroupEnd,
					line,
				});
			}
			'\'' | '"' => {
				let quote = ch;
				let start_line = line;
				chars.next();
				let mut text = String::new();
				loop {
					match chars.next() {
						Some(c) if c == quote => {
							if chars.peek() == Some(&quote) {
								chars.next();
								text.push(quote);
							} else {
								break;
							}
						}
						Some(c) => {
							if c == '\n' {
								line += 1;
							}
							text.push(c);
						}
						None => return Err(ParseError::new(start_line, "unterminated string")),
					}
				}
				tokens.push(Token {
					tok: Tok::Str(text),
					line: start_line,
				});
			}
			'&' | '$' => {
				chars.next();
				let mut name = String::new();
				while let Some(&c) = chars.peek() {
					if !is_word_char(c) {
						break;
					}
					name.push(c);
					chars.next();
				}
				let name = name.to_ascii_lowercase();
				let tok = if name == "end" {
					Tok::GroupEnd
				} else if name.is_empty() {
					return Err(ParseError::new(line, "group marker without a name"));
				} else {
					Tok::GroupStart(name)
				};
				tokens.push(Token { tok, line });
			}
			_ => {
				let word = read_word(&mut chars, &mut line)?;
				tokens.push(Token {
					tok: Tok::Word(word),
					line,
				});
			}
		}
	}

	Ok(tokens)
}

/// Reads an unquoted word. A parenthesised subscript is part of the word even
/// when separated from the name by spaces or containing commas.
fn read_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, line: &mut usize) -> Result<String> {
	let mut word = String::new();
	loop {
		match chars.peek().copied() {
			Some('(') => {
				let start_line = *line;
				for c in chars.by_ref() {
					if c == '\n' {
						*line += 1;
					}
					if !c.is_whitespace() {
						word.push(c);
					}
					if c == ')' {
						break;
					}
				}
				if !word.ends_with(')') {
					return Err(ParseError::new(start_line, "unclosed subscript"));
				}
			}
			Some(c) if is_word_char(c) => {
				word.push(c);
				chars.next();
			}
			Some(' ' | '\t') if !word.contains('(') => {
				// `name (3)` keeps the subscript attached to the name.
				let mut lookahead = chars.clone();
				while lookahead.peek().is_some_and(|c| matches!(c, ' ' | '\t')) {
					lookahead.next();
				}
				if lookahead.peek() == Some(&'(') && is_identifier(&word) {
					*chars = lookahead;
				} else {
					break;
				}
			}
			_ => break,
		}
	}
	Ok(word)
}

fn is_identifier(word: &str) -> bool {
	let mut chars = word.chars();
	chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '%')
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
	Scalar(String),
	Index(String, usize),
	Range(String, usize, Option<usize>),
}

fn parse_target(word: &str, line: usize) -> Result<Target> {
	let lower = word.to_ascii_lowercase();
	let Some((name, rest)) = lower.split_once('(') else {
		if !is_identifier(&lower) {
			return Err(ParseError::new(line, format!("invalid key '{word}'")));
		}
		return Ok(Target::Scalar(lower));
	};
	let name = name.to_string();
	if !is_identifier(&name) {
		return Err(ParseError::new(line, format!("invalid key '{word}'")));
	}
	let inner = rest
		.strip_suffix(')')
		.ok_or_else(|| ParseError::new(line, format!("malformed subscript in '{word}'")))?;
	if inner.contains(',') {
		return Err(ParseError::new(
			line,
			format!("multi-dimensional subscript in '{word}' is not supported"),
		));
	}
	let bound = |text: &str| -> Result<usize> {
		let index = text
			.parse::<usize>()
			.map_err(|_| ParseError::new(line, format!("invalid index bound '{text}' in '{word}'")))?;
		if index > MAX_INDEX {
			return Err(ParseError::new(
				line,
				format!("index {index} in '{word}' exceeds the maximum of {MAX_INDEX}"),
			));
		}
		Ok(index)
	};
	match inner.split_once(':') {
		Some((lo, hi)) => {
			let lo = if lo.is_empty() { 1 } else { bound(lo)? };
			let hi = if hi.is_empty() { None } else { Some(bound(hi)?) };
			if hi.is_some_and(|hi| hi < lo) {
				return Err(ParseError::new(line, format!("empty index range in '{word}'")));
			}
			Ok(Target::Range(name, lo, hi))
		}
		None => Ok(Target::Index(name, bound(inner)?)),
	}
}

/// Parses an unquoted scalar token.
fn parse_scalar(word: &str) -> Option<Value> {
	let lower = word.to_ascii_lowercase();
	let logical = lower.strip_prefix('.').unwrap_or(&lower);
	match logical {
		"t" | "t." | "true" | "true." => return Some(Value::Bool(true)),
		"f" | "f." | "false" | "false." => return Some(Value::Bool(false)),
		_ => {}
	}

	let first = lower.chars().next()?;
	match lower.trim_start_matches(['+', '-']) {
		"nan" => return Some(Value::Float(f64::NAN)),
		"inf" | "infinity" => {
			let sign = if lower.starts_with('-') { -1.0 } else { 1.0 };
			return Some(Value::Float(sign * f64::INFINITY));
		}
		_ => {}
	}
	if !(first.is_ascii_digit() || matches!(first, '+' | '-' | '.')) {
		return None;
	}
	if !lower.chars().any(|c| c.is_ascii_digit()) {
		return None;
	}
	if let Ok(int) = lower.parse::<i64>() {
		return Some(Value::Int(int));
	}
	let real = lower.replace('d', "e");
	if real.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e')) {
		return real.parse::<f64>().ok().map(Value::Float);
	}
	None
}

/// Accumulated state of one key while its group is being read.
enum Pending {
	Value(Value),
	Indexed(BTreeMap<usize, Value>),
}

impl Pending {
	fn indexed(&mut self) -> &mut BTreeMap<usize, Value> {
		if let Pending::Value(value) = self {
			let map = match std::mem::replace(value, Value::Bool(false)) {
				Value::Sequence(items) => items
					.into_iter()
					.enumerate()
					.filter_map(|(pos, item)| item.map(|v| (pos + 1, v)))
					.collect(),
				scalar => BTreeMap::from([(1, scalar)]),
			};
			*self = Pending::Indexed(map);
		}
		match self {
			Pending::Indexed(map) => map,
			Pending::Value(_) => unreachable!("converted above"),
		}
	}
}

#[derive(Default)]
struct GroupBuilder {
	entries: IndexMap<String, Pending>,
}

impl GroupBuilder {
	fn assign(&mut self, target: Target, values: Vec<Option<Value>>, line: usize) -> Result<()> {
		match target {
			Target::Scalar(name) => {
				let value = match values.len() {
					0 => return Ok(()),
					1 => match values.into_iter().next().flatten() {
						Some(value) => value,
						None => return Ok(()),
					},
					_ => Value::Sequence(values),
				};
				self.entries.insert(name, Pending::Value(value));
				Ok(())
			}
			Target::Index(name, index) => self.assign_from(name, index, None, values, line),
			Target::Range(name, lo, hi) => {
				if let (Some(hi), [Some(value)]) = (hi, values.as_slice()) {
					let map = self.slot(name);
					for index in lo..=hi {
						map.insert(index, value.clone());
					}
					Ok(())
				} else {
					self.assign_from(name, lo, hi, values, line)
				}
			}
		}
	}

	fn slot(&mut self, name: String) -> &mut BTreeMap<usize, Value> {
		self.entries
			.entry(name)
			.or_insert_with(|| Pending::Indexed(BTreeMap::new()))
			.indexed()
	}

	/// Assigns `values` to consecutive indices from `start`; nulls leave their index untouched.
	fn assign_from(
		&mut self,
		name: String,
		start: usize,
		end: Option<usize>,
		values: Vec<Option<Value>>,
		line: usize,
	) -> Result<()> {
		let map = self.slot(name.clone());
		for (offset, value) in values.into_iter().enumerate() {
			let index = start.checked_add(offset).unwrap_or(usize::MAX);
			if end.is_some_and(|end| index > end) {
				break;
			}
			if index > MAX_INDEX {
				return Err(ParseError::new(
					line,
					format!("values for '{name}' run past index {MAX_INDEX}"),
				));
			}
			if let Some(value) = value {
				map.insert(index, value);
			}
		}
		Ok(())
	}

	fn finish(self) -> Group {
		let mut group = Group::new();
		for (name, pending) in self.entries {
			match pending {
				Pending::Value(value) => group.insert(name, value),
				Pending::Indexed(map) => {
					let (Some(&min), Some(&max)) = (map.keys().next(), map.keys().next_back()) else {
						continue;
					};
					let mut items = vec![None; max - min + 1];
					for (index, value) in map {
						items[index - min] = Some(value);
					}
					group.insert_sequence(name, min, items);
				}
			}
		}
		group
	}
}

struct Parser {
	tokens: Vec<Token>,
	pos: usize,
}

impl Parser {
	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.pos)
	}

	fn peek_at(&self, n: usize) -> Option<&Token> {
		self.tokens.get(self.pos + n)
	}

	fn next(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.pos).cloned();
		if token.is_some() {
			self.pos += 1;
		}
		token
	}

	fn last_line(&self) -> usize {
		self.tokens.last().map_or(1, |t| t.line)
	}

	/// Returns true if the upcoming tokens are `word =`, i.e. a new assignment.
	fn at_assignment(&self) -> bool {
		matches!(
			(self.peek().map(|t| &t.tok), self.peek_at(1).map(|t| &t.tok)),
			(Some(Tok::Word(_)), Some(Tok::Equals))
		)
	}

	fn namelist(mut self) -> Result<Namelist> {
		let mut namelist = Namelist::new();
		while let Some(token) = self.next() {
			match token.tok {
				Tok::GroupStart(name) => {
					let group = self.group(&name, token.line)?;
					namelist.insert_group(name, group);
				}
				_ => {
					return Err(ParseError::new(token.line, "assignment outside of a group"));
				}
			}
		}
		Ok(namelist)
	}

	fn group(&mut self, name: &str, start_line: usize) -> Result<Group> {
		let mut builder = GroupBuilder::default();
		loop {
			let Some(token) = self.next() else {
				return Err(ParseError::new(
					start_line.max(self.last_line()),
					format!("group '{name}' is not terminated"),
				));
			};
			match token.tok {
				Tok::GroupEnd => return Ok(builder.finish()),
				Tok::Comma => continue,
				Tok::Word(word) if matches!(self.peek().map(|t| &t.tok), Some(Tok::Equals)) => {
					self.next();
					let target = parse_target(&word, token.line)?;
					let values = self.values()?;
					builder.assign(target, values, token.line)?;
				}
				Tok::GroupStart(other) => {
					return Err(ParseError::new(
						token.line,
						format!("group '{other}' starts before '{name}' is terminated"),
					));
				}
				other => {
					return Err(ParseError::new(
						token.line,
						format!("expected an assignment, found {}", describe(&other)),
					));
				}
			}
		}
	}

	/// Reads the value list after `=`, up to the next assignment or group end.
	fn values(&mut self) -> Result<Vec<Option<Value>>> {
		let mut values = Vec::new();
		let mut expecting_value = true;
		loop {
			if self.at_assignment() {
				break;
			}
			let Some(token) = self.peek().cloned() else {
				break;
			};
			match token.tok {
				Tok::GroupEnd | Tok::GroupStart(_) => break,
				Tok::Comma => {
					self.next();
					if expecting_value {
						values.push(None);
					}
					expecting_value = true;
				}
				Tok::Str(text) => {
					self.next();
					values.push(Some(Value::String(text)));
					expecting_value = false;
				}
				Tok::Word(word) => {
					self.next();
					self.word_values(&word, token.line, &mut values)?;
					expecting_value = false;
				}
				Tok::Equals => {
					return Err(ParseError::new(token.line, "unexpected '='"));
				}
			}
		}
		// A trailing comma before the next key does not denote a null value.
		if expecting_value && values.last().is_some_and(Option::is_none) {
			values.pop();
		}
		Ok(values)
	}

	/// Expands one unquoted value token, handling `n*value` repeat counts.
	fn word_values(&mut self, word: &str, line: usize, values: &mut Vec<Option<Value>>) -> Result<()> {
		if let Some((count, rest)) = word.split_once('*') {
			let count = count
				.parse::<usize>()
				.map_err(|_| ParseError::new(line, format!("invalid repeat count in '{word}'")))?;
			if values.len().saturating_add(count) > MAX_INDEX {
				return Err(ParseError::new(
					line,
					format!("repeat count in '{word}' makes the list longer than {MAX_INDEX} values"),
				));
			}
			let item = if rest.is_empty() {
				match self.peek().map(|t| t.tok.clone()) {
					Some(Tok::Str(text)) => {
						self.next();
						Some(Value::String(text))
					}
					_ => None,
				}
			} else {
				Some(scalar_or_err(rest, line)?)
			};
			values.extend(std::iter::repeat_n(item, count));
			return Ok(());
		}
		values.push(Some(scalar_or_err(word, line)?));
		Ok(())
	}
}

fn scalar_or_err(word: &str, line: usize) -> Result<Value> {
	parse_scalar(word).ok_or_else(|| ParseError::new(line, format!("unrecognised value '{word}'")))
}

fn describe(tok: &Tok) -> String {
	match tok {
		Tok::GroupStart(name) => format!("'&{name}'"),
		Tok::GroupEnd => "'/'".to_string(),
		Tok::Word(word) => format!("'{word}'"),
		Tok::Str(text) => format!("string '{text}'"),
		Tok::Equals => "'='".to_string(),
		Tok::Comma => "','".to_string(),
	}
}
